use std::{
  collections::VecDeque,
  sync::{Arc, Weak},
};

use super::subject_core::SubjectCore;
use crate::{
  demand::Demand,
  outlet::{Drain, Outlet},
  subscriber::{Completion, Subscriber},
  subscription::{Cancellable, Subscription},
};

/// What a subject needs from one of its records.
pub(crate) trait Conduit<O, E>: Send + Sync {
  /// Delivers `value` if the record's subscriber has spare demand.
  fn offer(&self, value: O);

  fn finish(&self, completion: Completion<E>);
}

/// One subscriber of a subject: its own outlet, demand and id.
pub(crate) struct SubjectSubscription<O, E, S> {
  outlet: Outlet<RecordState<O, E>, S>,
  id: usize,
  core: Weak<SubjectCore<O, E>>,
}

pub(crate) struct RecordState<O, E> {
  pending: VecDeque<O>,
  /// Latest value kept for a subscriber without demand, when the subject
  /// retains one.
  parked: Option<O>,
  retain_latest: bool,
  completion: Option<Completion<E>>,
}

impl<O, E, S> SubjectSubscription<O, E, S>
where
  O: Send + 'static,
  E: Send + 'static,
  S: Subscriber<O, E> + 'static,
{
  pub(crate) fn new(
    id: usize, core: Weak<SubjectCore<O, E>>, retain_latest: bool, primer: Option<O>,
  ) -> Self {
    let state =
      RecordState { pending: VecDeque::new(), parked: primer, retain_latest, completion: None };
    SubjectSubscription { outlet: Outlet::new(state), id, core }
  }

  pub(crate) fn attach(self: &Arc<Self>, subscriber: S) {
    tracing::trace!(id = self.id, "subject subscriber attached");
    self.outlet.attach(subscriber, self.clone());
  }
}

impl<O, E, S> Conduit<O, E> for SubjectSubscription<O, E, S>
where
  O: Send + 'static,
  E: Send + 'static,
  S: Subscriber<O, E> + 'static,
{
  fn offer(&self, value: O) {
    let admitted = self.outlet.update(|st, flow| {
      if flow.closed || st.completion.is_some() {
        false
      } else if flow.spare.has_demand() {
        st.pending.push_back(value);
        true
      } else if st.retain_latest {
        st.parked = Some(value);
        true
      } else {
        false
      }
    });
    if admitted {
      self.outlet.drain();
    }
  }

  fn finish(&self, completion: Completion<E>) {
    self.outlet.update(|st, _| {
      if st.completion.is_none() {
        st.completion = Some(completion);
      }
    });
    self.outlet.drain();
  }
}

impl<O, E, S> Cancellable for SubjectSubscription<O, E, S>
where
  O: Send + 'static,
  E: Send + 'static,
  S: Subscriber<O, E> + 'static,
{
  fn cancel(&self) {
    if !self.outlet.terminate() {
      return;
    }
    tracing::trace!(id = self.id, "subject subscriber cancelled");
    if let Some(core) = self.core.upgrade() {
      core.remove(self.id);
    }
  }
}

impl<O, E, S> Subscription for SubjectSubscription<O, E, S>
where
  O: Send + 'static,
  E: Send + 'static,
  S: Subscriber<O, E> + 'static,
{
  fn request(&self, demand: Demand) { self.outlet.request(demand) }
}

impl<O: Send + 'static, E: Send + 'static> Drain for RecordState<O, E> {
  type Output = O;
  type Failure = E;

  fn backlog(&self) -> usize { self.pending.len() }

  fn poll_completion(&mut self) -> Option<Completion<E>> {
    if self.pending.is_empty() && self.completion.is_some() {
      self.parked = None;
      return self.completion.take();
    }
    None
  }

  fn poll_value(&mut self) -> Option<O> { self.pending.pop_front().or_else(|| self.parked.take()) }
}

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::{
  subject_subscription::SubjectSubscription,
  subscribers::{broadcast_completion, broadcast_value, Subscribers},
};
use crate::{
  demand::Demand,
  subscriber::{Completion, Subscriber},
  subscription::{AnySubscription, EmptySubscription},
};

/// State shared by every handle of one subject.
pub(crate) struct SubjectCore<O, E> {
  state: Mutex<CoreState<O, E>>,
  retain_latest: bool,
}

struct CoreState<O, E> {
  records: Subscribers<O, E>,
  completion: Option<Completion<E>>,
  upstreams: SmallVec<[AnySubscription; 1]>,
  current: Option<O>,
}

impl<O, E> SubjectCore<O, E>
where
  O: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  pub(crate) fn new(current: Option<O>) -> Arc<Self> {
    Arc::new(SubjectCore {
      retain_latest: current.is_some(),
      state: Mutex::new(CoreState {
        records: Subscribers::default(),
        completion: None,
        upstreams: SmallVec::new(),
        current,
      }),
    })
  }

  pub(crate) fn subscribe<S>(self: &Arc<Self>, mut subscriber: S)
  where
    S: Subscriber<O, E> + 'static,
  {
    let mut state = self.state.lock();
    if let Some(completion) = state.completion.clone() {
      drop(state);
      tracing::trace!("subscribed to a completed subject");
      subscriber.receive_subscription(EmptySubscription::shared());
      subscriber.receive_completion(completion);
      return;
    }
    let id = state.records.reserve_id();
    let primer = state.current.clone();
    let record =
      Arc::new(SubjectSubscription::new(id, Arc::downgrade(self), self.retain_latest, primer));
    state.records.insert(id, record.clone());
    drop(state);
    record.attach(subscriber);
  }

  pub(crate) fn send(&self, value: O) {
    let records = {
      let mut state = self.state.lock();
      if state.completion.is_some() {
        return;
      }
      if self.retain_latest {
        state.current = Some(value.clone());
      }
      state.records.snapshot()
    };
    broadcast_value(records, value);
  }

  pub(crate) fn send_completion(&self, completion: Completion<E>) {
    let (records, upstreams) = {
      let mut state = self.state.lock();
      if state.completion.is_some() {
        return;
      }
      state.completion = Some(completion.clone());
      (state.records.take_all(), std::mem::take(&mut state.upstreams))
    };
    tracing::debug!(
      subscribers = records.len(),
      failed = completion.is_failure(),
      "subject completed"
    );
    for upstream in upstreams {
      upstream.cancel();
    }
    broadcast_completion(records, completion);
  }

  /// Keeps `subscription` until completion, which cancels and drops it.
  pub(crate) fn receive_upstream(&self, subscription: AnySubscription) {
    let accepted = {
      let mut state = self.state.lock();
      let open = state.completion.is_none();
      if open {
        state.upstreams.push(subscription.clone());
      }
      open
    };
    if accepted {
      subscription.request(Demand::UNLIMITED);
    } else {
      subscription.cancel();
    }
  }

  pub(crate) fn current(&self) -> Option<O> { self.state.lock().current.clone() }
}

impl<O, E> SubjectCore<O, E> {
  pub(crate) fn remove(&self, id: usize) {
    let removed = self.state.lock().records.remove(id);
    drop(removed);
  }

  pub(crate) fn subscriber_count(&self) -> usize { self.state.lock().records.len() }

  pub(crate) fn is_completed(&self) -> bool { self.state.lock().completion.is_some() }
}

//! The subscriber an operator attaches to each of its upstreams.

use std::sync::Arc;

use crate::{
  demand::Demand,
  outlet::{Drain, Flow, Outlet, Teardown},
  subscriber::{Completion, Lifecycle, Subscriber},
  subscription::AnySubscription,
};

/// Operator state fed by indexed upstreams.
pub(crate) trait Junction: Drain {
  /// Keeps the link of upstream `index` until release.
  fn link(&mut self, index: usize, link: AnySubscription);

  fn complete(&mut self, index: usize, completion: Completion<Self::Failure>);
}

/// How a value from upstream `index` enters the state.
pub(crate) type Store<St, V> = fn(&mut St, usize, V, Flow);

/// Forwards one upstream's signals into an operator's outlet.
///
/// Requests `initial` once subscribed. Signals arriving after the operator
/// closed are ignored; a subscription arriving after it closed is cancelled.
pub(crate) struct Upstream<St: Drain, S, V> {
  outlet: Arc<Outlet<St, S>>,
  index: usize,
  initial: Demand,
  store: Store<St, V>,
  lifecycle: Lifecycle,
}

impl<St, S, V> Upstream<St, S, V>
where
  St: Junction,
  S: Subscriber<St::Output, St::Failure>,
{
  pub(crate) fn new(
    outlet: Arc<Outlet<St, S>>,
    index: usize,
    initial: Demand,
    store: Store<St, V>,
  ) -> Self {
    Upstream { outlet, index, initial, store, lifecycle: Lifecycle::default() }
  }
}

impl<St, S, V> Subscriber<V, St::Failure> for Upstream<St, S, V>
where
  St: Junction,
  S: Subscriber<St::Output, St::Failure>,
  V: Send,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    if !self.lifecycle.subscribe() {
      subscription.cancel();
      return;
    }
    let index = self.index;
    let open = self.outlet.update(|st, flow| {
      if !flow.closed {
        st.link(index, subscription.clone());
      }
      !flow.closed
    });
    if !open {
      subscription.cancel();
    } else if self.initial.has_demand() {
      subscription.request(self.initial);
    }
  }

  fn receive(&mut self, input: V) -> Demand {
    self.lifecycle.value("operator upstream");
    let (index, store) = (self.index, self.store);
    let stored = self.outlet.update(|st, flow| {
      if !flow.closed {
        store(st, index, input, flow);
      }
      !flow.closed
    });
    if stored {
      self.outlet.drain();
    }
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<St::Failure>) {
    self.lifecycle.complete("operator upstream");
    let index = self.index;
    self.outlet.update(|st, flow| {
      if !flow.closed {
        st.complete(index, completion);
      }
    });
    self.outlet.drain();
  }
}

/// Per-upstream bookkeeping shared by the joins.
pub(crate) struct Links<E> {
  links: Vec<Option<AnySubscription>>,
  finished: Vec<bool>,
  failure: Option<E>,
}

impl<E> Links<E> {
  pub(crate) fn new(count: usize) -> Self {
    Links { links: vec![None; count], finished: vec![false; count], failure: None }
  }

  pub(crate) fn count(&self) -> usize { self.links.len() }

  pub(crate) fn set(&mut self, index: usize, link: AnySubscription) {
    self.links[index] = Some(link);
  }

  /// Records a terminal signal. The first failure wins.
  pub(crate) fn complete(&mut self, index: usize, completion: Completion<E>) {
    self.links[index] = None;
    self.finished[index] = true;
    if let Completion::Failure(e) = completion {
      if self.failure.is_none() {
        tracing::debug!(upstream = index, "upstream failed");
        self.failure = Some(e);
      }
    }
  }

  pub(crate) fn get(&self, index: usize) -> Option<&AnySubscription> { self.links[index].as_ref() }

  pub(crate) fn is_finished(&self, index: usize) -> bool { self.finished[index] }

  pub(crate) fn all_finished(&self) -> bool { self.finished.iter().all(|f| *f) }

  pub(crate) fn live(&self) -> usize { self.finished.iter().filter(|f| !**f).count() }

  pub(crate) fn take_failure(&mut self) -> Option<E> { self.failure.take() }

  pub(crate) fn release(&mut self, teardown: &mut Teardown) {
    teardown.links(self.links.iter_mut().map(Option::take));
  }
}

use std::sync::Arc;

use parking_lot::Mutex;

use super::{Completion, Lifecycle, Subscriber};
use crate::{
  demand::Demand,
  subscription::{AnyCancellable, AnySubscription, Cancellable},
};

/// A closure-backed subscriber that requests unlimited demand.
///
/// Usually built through [`PublisherExt::sink`](crate::ops::PublisherExt::sink)
/// which hands back an [`AnyCancellable`] for the subscription.
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use rxflow::prelude::*;
///
/// let seen = Arc::new(Mutex::new(vec![]));
/// let c_seen = seen.clone();
/// let _token = publisher::sequence(1..=3).sink_value(move |v| c_seen.lock().unwrap().push(v));
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
/// ```
pub struct Sink<FV, FC> {
  on_value: FV,
  on_completion: Option<FC>,
  link: Arc<SinkLink>,
  lifecycle: Lifecycle,
}

#[derive(Default)]
pub(crate) struct SinkLink(Mutex<LinkState>);

#[derive(Default)]
enum LinkState {
  #[default]
  Awaiting,
  Live(AnySubscription),
  Closed,
}

impl<FV, FC> Sink<FV, FC> {
  pub fn new(on_completion: FC, on_value: FV) -> Self {
    Sink {
      on_value,
      on_completion: Some(on_completion),
      link: Arc::default(),
      lifecycle: Lifecycle::default(),
    }
  }

  /// A token cancelling whatever subscription this sink receives.
  pub fn cancellable(&self) -> AnyCancellable { AnyCancellable::from_arc(self.link.clone()) }
}

impl Cancellable for SinkLink {
  fn cancel(&self) {
    let previous = std::mem::replace(&mut *self.0.lock(), LinkState::Closed);
    if let LinkState::Live(subscription) = previous {
      tracing::trace!("sink cancelled");
      subscription.cancel();
    }
  }
}

impl<Input, Failure, FV, FC> Subscriber<Input, Failure> for Sink<FV, FC>
where
  FV: FnMut(Input) + Send,
  FC: FnOnce(Completion<Failure>) + Send,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    if !self.lifecycle.subscribe() {
      subscription.cancel();
      return;
    }
    let accepted = {
      let mut state = self.link.0.lock();
      match *state {
        LinkState::Awaiting => {
          *state = LinkState::Live(subscription.clone());
          true
        }
        _ => false,
      }
    };
    if accepted {
      subscription.request(Demand::UNLIMITED);
    } else {
      subscription.cancel();
    }
  }

  fn receive(&mut self, input: Input) -> Demand {
    self.lifecycle.value("sink");
    if matches!(*self.link.0.lock(), LinkState::Live(_)) {
      (self.on_value)(input);
    }
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<Failure>) {
    self.lifecycle.complete("sink");
    let was_live = matches!(
      std::mem::replace(&mut *self.link.0.lock(), LinkState::Closed),
      LinkState::Live(_)
    );
    if let (true, Some(on_completion)) = (was_live, self.on_completion.take()) {
      on_completion(completion);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::subscription::Subscription;

  #[derive(Default)]
  struct Probe {
    requested: Mutex<Vec<Demand>>,
    cancelled: AtomicUsize,
  }

  impl Cancellable for Probe {
    fn cancel(&self) { self.cancelled.fetch_add(1, Ordering::SeqCst); }
  }

  impl Subscription for Probe {
    fn request(&self, demand: Demand) { self.requested.lock().push(demand); }
  }

  #[test]
  fn requests_unlimited_and_forwards() {
    let values = Arc::new(Mutex::new(vec![]));
    let done = Arc::new(Mutex::new(None));
    let (c_values, c_done) = (values.clone(), done.clone());
    let mut sink = Sink::new(
      move |c: Completion<()>| *c_done.lock() = Some(c),
      move |v: i32| c_values.lock().push(v),
    );

    let probe = Arc::new(Probe::default());
    sink.receive_subscription(probe.clone());
    assert_eq!(*probe.requested.lock(), vec![Demand::UNLIMITED]);

    sink.receive(1);
    sink.receive(2);
    sink.receive_completion(Completion::Finished);
    assert_eq!(*values.lock(), vec![1, 2]);
    assert_eq!(*done.lock(), Some(Completion::Finished));
  }

  #[test]
  fn cancel_before_subscription_cancels_on_arrival() {
    let mut sink = Sink::new(|_: Completion<()>| {}, |_: i32| {});
    let mut token = sink.cancellable();
    token.cancel();

    let probe = Arc::new(Probe::default());
    sink.receive_subscription(probe.clone());
    assert_eq!(probe.cancelled.load(Ordering::SeqCst), 1);
    assert!(probe.requested.lock().is_empty());
  }

  #[test]
  fn second_subscription_is_cancelled() {
    let mut sink = Sink::new(|_: Completion<()>| {}, |_: i32| {});
    let first = Arc::new(Probe::default());
    let second = Arc::new(Probe::default());
    sink.receive_subscription(first.clone());
    sink.receive_subscription(second.clone());
    assert_eq!(first.cancelled.load(Ordering::SeqCst), 0);
    assert_eq!(second.cancelled.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn cancel_token_cancels_live_subscription_once() {
    let mut sink = Sink::new(|_: Completion<()>| {}, |_: i32| {});
    let probe = Arc::new(Probe::default());
    sink.receive_subscription(probe.clone());
    drop(sink.cancellable());
    drop(sink.cancellable());
    assert_eq!(probe.cancelled.load(Ordering::SeqCst), 1);
  }

  #[test]
  #[should_panic(expected = "before its subscription")]
  fn value_before_subscription_is_fatal() {
    let mut sink = Sink::new(|_: Completion<()>| {}, |_: i32| {});
    sink.receive(1);
  }
}

//! Subscriber trait, terminal signals, and the lifecycle checks shared by
//! every subscriber the crate implements.
//!
//! A [`Subscriber`] receives, in order: exactly one subscription, then at most
//! as many values as it requested, then at most one [`Completion`]. Values
//! and completions are delivered serially, never concurrently for the same
//! subscription, but possibly from different threads over time.

mod sink;

pub use sink::Sink;

use crate::{demand::Demand, error::protocol_violation, subscription::AnySubscription};

/// The terminal signal of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Completion<E> {
  Finished,
  Failure(E),
}

impl<E> Completion<E> {
  #[inline]
  pub fn is_finished(&self) -> bool { matches!(self, Completion::Finished) }

  #[inline]
  pub fn is_failure(&self) -> bool { matches!(self, Completion::Failure(_)) }

  pub fn failure(&self) -> Option<&E> {
    match self {
      Completion::Finished => None,
      Completion::Failure(e) => Some(e),
    }
  }

  pub fn map_failure<F>(self, f: impl FnOnce(E) -> F) -> Completion<F> {
    match self {
      Completion::Finished => Completion::Finished,
      Completion::Failure(e) => Completion::Failure(f(e)),
    }
  }

  pub fn into_result(self) -> Result<(), E> {
    match self {
      Completion::Finished => Ok(()),
      Completion::Failure(e) => Err(e),
    }
  }
}

impl<E> From<Result<(), E>> for Completion<E> {
  fn from(result: Result<(), E>) -> Self {
    match result {
      Ok(()) => Completion::Finished,
      Err(e) => Completion::Failure(e),
    }
  }
}

/// The consuming end of the protocol.
///
/// The trait is object safe; `Box<dyn Subscriber<I, E>>` is itself a
/// subscriber, which is how type-erased publishers carry their downstream.
pub trait Subscriber<Input, Failure>: Send {
  /// Called exactly once, before any other signal.
  fn receive_subscription(&mut self, subscription: AnySubscription);

  /// Called for each value, never more often than demand allows.
  ///
  /// The returned demand is added to whatever is still outstanding. Calling
  /// back into the subscription (`request`/`cancel`) from here is allowed.
  fn receive(&mut self, input: Input) -> Demand;

  /// Called at most once, regardless of outstanding demand. No value follows.
  fn receive_completion(&mut self, completion: Completion<Failure>);
}

/// Boxed subscriber for type-erased publishers.
pub type BoxedSubscriber<'a, Input, Failure> = Box<dyn Subscriber<Input, Failure> + 'a>;

impl<'a, Input, Failure> Subscriber<Input, Failure> for BoxedSubscriber<'a, Input, Failure> {
  #[inline]
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    (**self).receive_subscription(subscription)
  }

  #[inline]
  fn receive(&mut self, input: Input) -> Demand { (**self).receive(input) }

  #[inline]
  fn receive_completion(&mut self, completion: Completion<Failure>) {
    (**self).receive_completion(completion)
  }
}

/// Tracks which protocol signals a subscriber has seen and rejects the
/// illegal orders.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
  #[default]
  Awaiting,
  Subscribed,
  Completed,
}

impl Lifecycle {
  /// Returns `false` for a repeated subscription, which the caller must
  /// cancel.
  pub(crate) fn subscribe(&mut self) -> bool {
    match self {
      Lifecycle::Awaiting => {
        *self = Lifecycle::Subscribed;
        true
      }
      _ => {
        tracing::warn!("subscriber already has a subscription; cancelling the new one");
        false
      }
    }
  }

  pub(crate) fn value(&self, who: &str) {
    match self {
      Lifecycle::Subscribed => {}
      Lifecycle::Awaiting => {
        protocol_violation(format_args!("{who} received a value before its subscription"))
      }
      Lifecycle::Completed => {
        protocol_violation(format_args!("{who} received a value after its completion"))
      }
    }
  }

  pub(crate) fn complete(&mut self, who: &str) {
    match self {
      Lifecycle::Subscribed => *self = Lifecycle::Completed,
      Lifecycle::Awaiting => {
        protocol_violation(format_args!("{who} received a completion before its subscription"))
      }
      Lifecycle::Completed => {
        protocol_violation(format_args!("{who} received a second completion"))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::EmptySubscription;

  struct Collect(Vec<i32>, Option<Completion<()>>);

  impl Subscriber<i32, ()> for Collect {
    fn receive_subscription(&mut self, subscription: AnySubscription) {
      subscription.request(Demand::UNLIMITED);
    }

    fn receive(&mut self, input: i32) -> Demand {
      self.0.push(input);
      Demand::NONE
    }

    fn receive_completion(&mut self, completion: Completion<()>) { self.1 = Some(completion); }
  }

  #[test]
  fn boxed_subscriber_forwards() {
    let mut boxed: BoxedSubscriber<'_, i32, ()> = Box::new(Collect(vec![], None));
    boxed.receive_subscription(EmptySubscription::shared());
    assert_eq!(boxed.receive(1), Demand::NONE);
    boxed.receive_completion(Completion::Finished);
  }

  #[test]
  fn completion_conversions() {
    let c: Completion<&str> = Err("boom").into();
    assert_eq!(c.failure(), Some(&"boom"));
    assert_eq!(c.map_failure(str::len), Completion::Failure(4));
    assert!(Completion::<()>::from(Ok(())).is_finished());
  }

  #[test]
  fn lifecycle_accepts_the_legal_order() {
    let mut life = Lifecycle::default();
    assert!(life.subscribe());
    life.value("source");
    life.complete("source");
    assert!(!life.subscribe());
  }

  #[test]
  #[should_panic(expected = "before its subscription")]
  fn value_before_subscription_is_fatal() { Lifecycle::default().value("source"); }

  #[test]
  #[should_panic(expected = "second completion")]
  fn double_completion_is_fatal() {
    let mut life = Lifecycle::Subscribed;
    life.complete("source");
    life.complete("source");
  }
}

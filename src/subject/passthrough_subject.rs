use std::sync::Arc;

use super::subject_core::SubjectCore;
use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::AnySubscription,
};

/// Broadcasts values to the subscribers present when they are sent.
///
/// No value is replayed: late subscribers only see what is sent after they
/// subscribed, and subscribers that attach after completion only receive the
/// completion.
///
/// ```rust
/// use rxflow::{prelude::*, testing::TestSubscriber};
///
/// let subject = PassthroughSubject::<i32, Never>::new();
/// let probe = TestSubscriber::new(Demand::UNLIMITED);
/// subject.subscribe(probe.clone());
///
/// subject.send(1);
/// subject.send(2);
/// subject.send_completion(Completion::Finished);
/// assert_eq!(probe.values(), vec![1, 2]);
/// ```
pub struct PassthroughSubject<O, E> {
  core: Arc<SubjectCore<O, E>>,
}

impl<O, E> Clone for PassthroughSubject<O, E> {
  fn clone(&self) -> Self { PassthroughSubject { core: self.core.clone() } }
}

impl<O, E> PassthroughSubject<O, E>
where
  O: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  pub fn new() -> Self { PassthroughSubject { core: SubjectCore::new(None) } }

  /// Offers `value` to every current subscriber. Does nothing once the
  /// subject completed.
  pub fn send(&self, value: O) { self.core.send(value) }

  /// Completes every current subscriber and latches `completion` for the
  /// future ones. Only the first call has an effect.
  pub fn send_completion(&self, completion: Completion<E>) { self.core.send_completion(completion) }

  /// Number of live subscribers.
  pub fn subscriber_count(&self) -> usize { self.core.subscriber_count() }

  pub fn is_completed(&self) -> bool { self.core.is_completed() }
}

impl<O, E> Default for PassthroughSubject<O, E>
where
  O: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl<O, E> Publisher for PassthroughSubject<O, E>
where
  O: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  type Output = O;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<O, E> + 'static,
  {
    self.core.subscribe(subscriber)
  }
}

/// Relays an upstream publisher: every value is sent on, the completion
/// completes the subject.
///
/// The subject keeps each upstream subscription until it completes, while
/// the upstream keeps the subject as its subscriber. That reference cycle
/// lasts until the subject completes or the upstream subscription ends.
impl<O, E> Subscriber<O, E> for PassthroughSubject<O, E>
where
  O: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    self.core.receive_upstream(subscription)
  }

  fn receive(&mut self, input: O) -> Demand {
    self.send(input);
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<E>) { self.send_completion(completion) }
}

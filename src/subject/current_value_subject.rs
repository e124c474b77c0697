use std::sync::Arc;

use super::subject_core::SubjectCore;
use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::AnySubscription,
};

/// A subject that remembers its latest value.
///
/// New subscribers receive the current value as soon as they have demand,
/// then everything sent afterwards. A subscriber without demand keeps only
/// the newest value it missed.
pub struct CurrentValueSubject<O, E> {
  core: Arc<SubjectCore<O, E>>,
}

impl<O, E> Clone for CurrentValueSubject<O, E> {
  fn clone(&self) -> Self { CurrentValueSubject { core: self.core.clone() } }
}

impl<O, E> CurrentValueSubject<O, E>
where
  O: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  pub fn new(value: O) -> Self { CurrentValueSubject { core: SubjectCore::new(Some(value)) } }

  /// The latest value sent, or the initial one.
  pub fn value(&self) -> Option<O> { self.core.current() }

  /// Stores `value` and offers it to every current subscriber.
  pub fn send(&self, value: O) { self.core.send(value) }

  pub fn send_completion(&self, completion: Completion<E>) { self.core.send_completion(completion) }

  pub fn subscriber_count(&self) -> usize { self.core.subscriber_count() }

  pub fn is_completed(&self) -> bool { self.core.is_completed() }
}

impl<O, E> Publisher for CurrentValueSubject<O, E>
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
impl<O, E> Subscriber<O, E> for CurrentValueSubject<O, E>
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

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestSubscriber;

  #[test]
  fn new_subscriber_sees_the_current_value() {
    let subject = CurrentValueSubject::<i32, ()>::new(1);
    subject.send(2);
    let probe = TestSubscriber::new(Demand::UNLIMITED);
    subject.subscribe(probe.clone());
    subject.send(3);
    assert_eq!(probe.values(), vec![2, 3]);
    assert_eq!(subject.value(), Some(3));
  }

  #[test]
  fn value_updates_without_demand() {
    let subject = CurrentValueSubject::<i32, ()>::new(0);
    let probe = TestSubscriber::new(Demand::NONE);
    subject.subscribe(probe.clone());
    subject.send(1);
    subject.send(2);
    assert_eq!(subject.value(), Some(2));
    assert!(probe.values().is_empty());

    probe.request(Demand::max(5));
    assert_eq!(probe.values(), vec![2]);
  }

  #[test]
  fn completion_drops_the_missed_value() {
    let subject = CurrentValueSubject::<i32, ()>::new(0);
    let probe = TestSubscriber::new(Demand::NONE);
    subject.subscribe(probe.clone());
    subject.send_completion(Completion::Finished);
    probe.request(Demand::UNLIMITED);
    assert!(probe.values().is_empty());
    assert_eq!(probe.completion(), Some(Completion::Finished));
  }
}

use std::{marker::PhantomData, sync::Arc};

use super::Publisher;
use crate::{
  outlet::{Drain, Outlet},
  subscriber::{Completion, Subscriber},
};

/// Finishes without producing, or never terminates at all.
pub struct Empty<T, E> {
  complete_immediately: bool,
  _marker: PhantomData<fn() -> (T, E)>,
}

impl<T, E> Empty<T, E> {
  pub fn new() -> Self { Empty { complete_immediately: true, _marker: PhantomData } }

  /// A publisher that never produces and never completes.
  pub fn never() -> Self { Empty { complete_immediately: false, _marker: PhantomData } }
}

impl<T, E> Default for Empty<T, E> {
  fn default() -> Self { Self::new() }
}

impl<T, E> Clone for Empty<T, E> {
  fn clone(&self) -> Self {
    Empty { complete_immediately: self.complete_immediately, _marker: PhantomData }
  }
}

impl<T, E> Publisher for Empty<T, E>
where
  T: Send + 'static,
  E: Send + 'static,
{
  type Output = T;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<T, E> + 'static,
  {
    let completion = self.complete_immediately.then_some(Completion::Finished);
    let outlet = Arc::new(Outlet::new(Terminal::<T, E>(completion, PhantomData)));
    outlet.attach(subscriber, outlet.clone());
  }
}

/// Fails every subscriber right away.
#[derive(Clone)]
pub struct Fail<T, E> {
  failure: E,
  _marker: PhantomData<fn() -> T>,
}

impl<T, E> Fail<T, E> {
  pub fn new(failure: E) -> Self { Fail { failure, _marker: PhantomData } }
}

impl<T, E> Publisher for Fail<T, E>
where
  T: Send + 'static,
  E: Clone + Send + 'static,
{
  type Output = T;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<T, E> + 'static,
  {
    let completion = Some(Completion::Failure(self.failure.clone()));
    let outlet = Arc::new(Outlet::new(Terminal::<T, E>(completion, PhantomData)));
    outlet.attach(subscriber, outlet.clone());
  }
}

struct Terminal<T, E>(Option<Completion<E>>, PhantomData<fn() -> T>);

impl<T, E> Drain for Terminal<T, E>
where
  T: Send + 'static,
  E: Send + 'static,
{
  type Output = T;
  type Failure = E;

  fn poll_completion(&mut self) -> Option<Completion<E>> { self.0.take() }

  fn poll_value(&mut self) -> Option<T> { None }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{demand::Demand, error::Never, testing::TestSubscriber};

  #[test]
  fn empty_finishes_without_demand() {
    let probe = TestSubscriber::<i32, Never>::new(Demand::NONE);
    Empty::new().subscribe(probe.clone());
    assert!(probe.is_subscribed());
    assert_eq!(probe.completion(), Some(Completion::Finished));
  }

  #[test]
  fn never_stays_silent() {
    let probe = TestSubscriber::<i32, Never>::new(Demand::UNLIMITED);
    Empty::never().subscribe(probe.clone());
    assert!(probe.is_subscribed());
    assert_eq!(probe.completion(), None);
  }

  #[test]
  fn fail_delivers_the_failure() {
    let probe = TestSubscriber::<i32, &str>::new(Demand::NONE);
    Fail::new("boom").subscribe(probe.clone());
    assert_eq!(probe.completion(), Some(Completion::Failure("boom")));
  }
}

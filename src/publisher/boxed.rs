use std::sync::Arc;

use super::Publisher;
use crate::subscriber::{BoxedSubscriber, Subscriber};

/// A cloneable, type-erased publisher.
///
/// Heterogeneous publishers with the same `Output` and `Failure` become one
/// type, which is what operators taking a publisher of publishers usually
/// need.
///
/// ```rust
/// use rxflow::prelude::*;
///
/// let sources: Vec<AnyPublisher<i32, Never>> =
///   vec![publisher::just(1).boxed(), publisher::sequence(vec![2, 3]).boxed()];
/// assert_eq!(sources.len(), 2);
/// ```
pub struct AnyPublisher<O, E> {
  inner: Arc<dyn DynPublisher<O, E> + Send + Sync>,
}

trait DynPublisher<O, E> {
  fn subscribe_boxed(&self, subscriber: BoxedSubscriber<'static, O, E>);
}

impl<P> DynPublisher<P::Output, P::Failure> for P
where
  P: Publisher,
  P::Output: 'static,
  P::Failure: 'static,
{
  fn subscribe_boxed(&self, subscriber: BoxedSubscriber<'static, P::Output, P::Failure>) {
    self.subscribe(subscriber)
  }
}

impl<O, E> AnyPublisher<O, E> {
  pub fn new<P>(publisher: P) -> Self
  where
    P: Publisher<Output = O, Failure = E> + Send + Sync + 'static,
    O: 'static,
    E: 'static,
  {
    AnyPublisher { inner: Arc::new(publisher) }
  }
}

impl<O, E> Clone for AnyPublisher<O, E> {
  fn clone(&self) -> Self { AnyPublisher { inner: self.inner.clone() } }
}

impl<O, E> Publisher for AnyPublisher<O, E> {
  type Output = O;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<O, E> + 'static,
  {
    self.inner.subscribe_boxed(Box::new(subscriber))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    demand::Demand, error::Never, publisher, subscriber::Completion, testing::TestSubscriber,
  };

  #[test]
  fn erased_publishers_behave_like_their_source() {
    let sources: Vec<AnyPublisher<i32, Never>> = vec![
      AnyPublisher::new(publisher::just(1)),
      AnyPublisher::new(publisher::sequence(vec![2, 3])),
      AnyPublisher::new(publisher::empty()),
    ];
    let collected: Vec<Vec<i32>> = sources
      .iter()
      .cloned()
      .map(|source| {
        let probe = TestSubscriber::new(Demand::UNLIMITED);
        source.subscribe(probe.clone());
        assert_eq!(probe.completion(), Some(Completion::Finished));
        probe.values()
      })
      .collect();
    assert_eq!(collected, vec![vec![1], vec![2, 3], vec![]]);
  }

  #[test]
  fn clones_share_the_source() {
    let source: AnyPublisher<i32, Never> = AnyPublisher::new(publisher::sequence(vec![2, 3]));
    let copy = source.clone();
    let probe = TestSubscriber::new(Demand::max(1));
    copy.subscribe(probe.clone());
    assert_eq!(probe.values(), vec![2]);
    assert_eq!(probe.completion(), None);
  }
}

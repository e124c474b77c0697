//! Interleaves the values of several publishers in arrival order.
//!
//! Every upstream is asked for unlimited demand. Values that arrive while the
//! downstream has no demand are queued without bound and delivered, in the
//! order they entered the merge, as demand comes in. The merged stream
//! finishes once every upstream finished and the queue is drained, and fails
//! on the first upstream failure, dropping whatever is still queued.

use std::{collections::VecDeque, sync::Arc};

use super::upstream::{Junction, Links, Upstream};
use crate::{
  demand::Demand,
  outlet::{Drain, Flow, Outlet, Teardown},
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::AnySubscription,
};

/// Merge of two publishers, see [`PublisherExt::merge`](super::PublisherExt::merge).
#[derive(Clone)]
pub struct Merge<A, B> {
  a: A,
  b: B,
}

impl<A, B> Merge<A, B> {
  pub fn new(a: A, b: B) -> Self { Merge { a, b } }
}

/// Merge of any number of publishers of one type.
///
/// ```rust
/// use rxflow::{ops::merge::MergeMany, prelude::*, testing::TestSubscriber};
///
/// let sources = vec![publisher::sequence(vec![1, 2]), publisher::sequence(vec![3])];
/// let merged = MergeMany::new(sources);
/// let probe = TestSubscriber::new(Demand::UNLIMITED);
/// merged.subscribe(probe.clone());
/// assert_eq!(probe.values(), vec![1, 2, 3]);
/// ```
#[derive(Clone)]
pub struct MergeMany<P> {
  sources: Vec<P>,
}

impl<P> MergeMany<P> {
  pub fn new(sources: Vec<P>) -> Self { MergeMany { sources } }
}

struct Merging<T, E> {
  queue: VecDeque<T>,
  links: Links<E>,
}

impl<T, E> Merging<T, E> {
  fn new(count: usize) -> Self { Merging { queue: VecDeque::new(), links: Links::new(count) } }

  fn push(&mut self, _index: usize, value: T, _flow: Flow) { self.queue.push_back(value); }
}

impl<T: Send + 'static, E: Send + 'static> Drain for Merging<T, E> {
  type Output = T;
  type Failure = E;

  fn poll_completion(&mut self) -> Option<Completion<E>> {
    if let Some(e) = self.links.take_failure() {
      self.queue.clear();
      return Some(Completion::Failure(e));
    }
    (self.links.all_finished() && self.queue.is_empty()).then_some(Completion::Finished)
  }

  fn poll_value(&mut self) -> Option<T> { self.queue.pop_front() }

  fn release(&mut self, teardown: &mut Teardown) { self.links.release(teardown); }
}

impl<T: Send + 'static, E: Send + 'static> Junction for Merging<T, E> {
  fn link(&mut self, index: usize, link: AnySubscription) { self.links.set(index, link); }

  fn complete(&mut self, index: usize, completion: Completion<E>) {
    self.links.complete(index, completion);
    tracing::trace!(live = self.links.live(), "merge upstream completed");
  }
}

impl<A, B> Publisher for Merge<A, B>
where
  A: Publisher,
  B: Publisher<Output = A::Output, Failure = A::Failure>,
  A::Output: Send + 'static,
  A::Failure: Send + 'static,
{
  type Output = A::Output;
  type Failure = A::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<A::Output, A::Failure> + 'static,
  {
    let outlet = Arc::new(Outlet::new(Merging::new(2)));
    outlet.attach(subscriber, outlet.clone());
    if !outlet.is_done() {
      self.a.subscribe(Upstream::new(outlet.clone(), 0, Demand::UNLIMITED, Merging::push));
    }
    if !outlet.is_done() {
      self.b.subscribe(Upstream::new(outlet.clone(), 1, Demand::UNLIMITED, Merging::push));
    }
  }
}

impl<P> Publisher for MergeMany<P>
where
  P: Publisher,
  P::Output: Send + 'static,
  P::Failure: Send + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<P::Output, P::Failure> + 'static,
  {
    let outlet = Arc::new(Outlet::new(Merging::new(self.sources.len())));
    outlet.attach(subscriber, outlet.clone());
    for (index, source) in self.sources.iter().enumerate() {
      if outlet.is_done() {
        break;
      }
      source.subscribe(Upstream::new(outlet.clone(), index, Demand::UNLIMITED, Merging::push));
    }
  }
}

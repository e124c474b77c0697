//! Combines the latest value of every upstream.
//!
//! Nothing is emitted until every upstream produced at least once. From then
//! on each upstream value emits a combination built from the newest value of
//! every upstream, provided the downstream has demand for it; a combination
//! produced without demand is dropped while the latest values still update.
//!
//! The combination finishes when all upstreams finished and fails as soon as
//! one of them fails, cancelling the others.

use std::{collections::VecDeque, sync::Arc};

use super::upstream::{Junction, Links, Upstream};
use crate::{
  demand::Demand,
  outlet::{Drain, Flow, Outlet, Teardown},
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::AnySubscription,
};

/// Latest values of two publishers as `(A, B)` pairs.
#[derive(Clone)]
pub struct CombineLatest<A, B> {
  a: A,
  b: B,
}

impl<A, B> CombineLatest<A, B> {
  pub fn new(a: A, b: B) -> Self { CombineLatest { a, b } }
}

/// Latest values of three publishers as `(A, B, C)` triples.
#[derive(Clone)]
pub struct CombineLatest3<A, B, C> {
  a: A,
  b: B,
  c: C,
}

impl<A, B, C> CombineLatest3<A, B, C> {
  pub fn new(a: A, b: B, c: C) -> Self { CombineLatest3 { a, b, c } }
}

/// Latest values of any number of same-typed publishers as a `Vec`, in
/// upstream order. With no upstream it finishes right away.
#[derive(Clone)]
pub struct CombineLatestAll<P> {
  sources: Vec<P>,
}

impl<P> CombineLatestAll<P> {
  pub fn new(sources: Vec<P>) -> Self { CombineLatestAll { sources } }
}

trait Latest: Send + 'static {
  type Combined: Send + 'static;

  fn combined(&self) -> Option<Self::Combined>;
}

/// Write access to the cell of upstream `I`.
trait Slot<const I: usize, V> {
  fn set(&mut self, value: V);
}

impl<A, B> Latest for (Option<A>, Option<B>)
where
  A: Clone + Send + 'static,
  B: Clone + Send + 'static,
{
  type Combined = (A, B);

  fn combined(&self) -> Option<(A, B)> { Some((self.0.clone()?, self.1.clone()?)) }
}

impl<A, B> Slot<0, A> for (Option<A>, Option<B>) {
  fn set(&mut self, value: A) { self.0 = Some(value); }
}

impl<A, B> Slot<1, B> for (Option<A>, Option<B>) {
  fn set(&mut self, value: B) { self.1 = Some(value); }
}

impl<A, B, C> Latest for (Option<A>, Option<B>, Option<C>)
where
  A: Clone + Send + 'static,
  B: Clone + Send + 'static,
  C: Clone + Send + 'static,
{
  type Combined = (A, B, C);

  fn combined(&self) -> Option<(A, B, C)> {
    Some((self.0.clone()?, self.1.clone()?, self.2.clone()?))
  }
}

impl<A, B, C> Slot<0, A> for (Option<A>, Option<B>, Option<C>) {
  fn set(&mut self, value: A) { self.0 = Some(value); }
}

impl<A, B, C> Slot<1, B> for (Option<A>, Option<B>, Option<C>) {
  fn set(&mut self, value: B) { self.1 = Some(value); }
}

impl<A, B, C> Slot<2, C> for (Option<A>, Option<B>, Option<C>) {
  fn set(&mut self, value: C) { self.2 = Some(value); }
}

impl<T: Clone + Send + 'static> Latest for Vec<Option<T>> {
  type Combined = Vec<T>;

  fn combined(&self) -> Option<Vec<T>> { self.iter().cloned().collect() }
}

struct Combining<L: Latest, E> {
  latest: L,
  ready: VecDeque<L::Combined>,
  links: Links<E>,
}

impl<L: Latest, E> Combining<L, E> {
  fn new(latest: L, count: usize) -> Self {
    Combining { latest, ready: VecDeque::new(), links: Links::new(count) }
  }

  fn emit(&mut self, flow: Flow) {
    if !flow.spare.has_demand() {
      tracing::trace!("combination dropped without demand");
      return;
    }
    if let Some(combined) = self.latest.combined() {
      self.ready.push_back(combined);
    }
  }
}

fn store<L, E, V, const I: usize>(st: &mut Combining<L, E>, _index: usize, value: V, flow: Flow)
where
  L: Latest + Slot<I, V>,
{
  st.latest.set(value);
  st.emit(flow);
}

fn store_at<T, E>(st: &mut Combining<Vec<Option<T>>, E>, index: usize, value: T, flow: Flow)
where
  T: Clone + Send + 'static,
{
  st.latest[index] = Some(value);
  st.emit(flow);
}

impl<L: Latest, E: Send + 'static> Drain for Combining<L, E> {
  type Output = L::Combined;
  type Failure = E;

  fn backlog(&self) -> usize { self.ready.len() }

  fn poll_completion(&mut self) -> Option<Completion<E>> {
    if let Some(e) = self.links.take_failure() {
      return Some(Completion::Failure(e));
    }
    (self.links.all_finished() && self.ready.is_empty()).then_some(Completion::Finished)
  }

  fn poll_value(&mut self) -> Option<L::Combined> { self.ready.pop_front() }

  fn release(&mut self, teardown: &mut Teardown) { self.links.release(teardown); }
}

impl<L: Latest, E: Send + 'static> Junction for Combining<L, E> {
  fn link(&mut self, index: usize, link: AnySubscription) { self.links.set(index, link); }

  fn complete(&mut self, index: usize, completion: Completion<E>) {
    self.links.complete(index, completion);
  }
}

impl<A, B> Publisher for CombineLatest<A, B>
where
  A: Publisher,
  B: Publisher<Failure = A::Failure>,
  A::Output: Clone + Send + 'static,
  B::Output: Clone + Send + 'static,
  A::Failure: Send + 'static,
{
  type Output = (A::Output, B::Output);
  type Failure = A::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Self::Output, A::Failure> + 'static,
  {
    let latest = (None::<A::Output>, None::<B::Output>);
    let outlet = Arc::new(Outlet::new(Combining::new(latest, 2)));
    outlet.attach(subscriber, outlet.clone());
    if !outlet.is_done() {
      self.a.subscribe(Upstream::new(outlet.clone(), 0, Demand::UNLIMITED, store::<_, _, _, 0>));
    }
    if !outlet.is_done() {
      self.b.subscribe(Upstream::new(outlet.clone(), 1, Demand::UNLIMITED, store::<_, _, _, 1>));
    }
  }
}

impl<A, B, C> Publisher for CombineLatest3<A, B, C>
where
  A: Publisher,
  B: Publisher<Failure = A::Failure>,
  C: Publisher<Failure = A::Failure>,
  A::Output: Clone + Send + 'static,
  B::Output: Clone + Send + 'static,
  C::Output: Clone + Send + 'static,
  A::Failure: Send + 'static,
{
  type Output = (A::Output, B::Output, C::Output);
  type Failure = A::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Self::Output, A::Failure> + 'static,
  {
    let latest = (None::<A::Output>, None::<B::Output>, None::<C::Output>);
    let outlet = Arc::new(Outlet::new(Combining::new(latest, 3)));
    outlet.attach(subscriber, outlet.clone());
    if !outlet.is_done() {
      self.a.subscribe(Upstream::new(outlet.clone(), 0, Demand::UNLIMITED, store::<_, _, _, 0>));
    }
    if !outlet.is_done() {
      self.b.subscribe(Upstream::new(outlet.clone(), 1, Demand::UNLIMITED, store::<_, _, _, 1>));
    }
    if !outlet.is_done() {
      self.c.subscribe(Upstream::new(outlet.clone(), 2, Demand::UNLIMITED, store::<_, _, _, 2>));
    }
  }
}

impl<P> Publisher for CombineLatestAll<P>
where
  P: Publisher,
  P::Output: Clone + Send + 'static,
  P::Failure: Send + 'static,
{
  type Output = Vec<P::Output>;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Vec<P::Output>, P::Failure> + 'static,
  {
    let count = self.sources.len();
    let outlet = Arc::new(Outlet::new(Combining::new(vec![None::<P::Output>; count], count)));
    outlet.attach(subscriber, outlet.clone());
    for (index, source) in self.sources.iter().enumerate() {
      if outlet.is_done() {
        break;
      }
      source.subscribe(Upstream::new(outlet.clone(), index, Demand::UNLIMITED, store_at));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{publisher, subject::PassthroughSubject, testing::TestSubscriber};

  type Subject<T> = PassthroughSubject<T, &'static str>;

  fn pair() -> (Subject<i32>, Subject<&'static str>) {
    (PassthroughSubject::new(), PassthroughSubject::new())
  }

  #[test]
  fn waits_for_every_upstream() {
    let (a, b) = pair();
    let probe = TestSubscriber::new(Demand::UNLIMITED);
    CombineLatest::new(a.clone(), b.clone()).subscribe(probe.clone());
    a.send(1);
    a.send(2);
    assert!(probe.values().is_empty());
    b.send("a");
    assert_eq!(probe.values(), vec![(2, "a")]);
  }

  #[test]
  fn combinations_without_demand_are_dropped() {
    let (a, b) = pair();
    let probe = TestSubscriber::new(Demand::max(1));
    CombineLatest::new(a.clone(), b.clone()).subscribe(probe.clone());
    a.send(1);
    b.send("a");
    a.send(2);
    b.send("b");
    assert_eq!(probe.values(), vec![(1, "a")]);

    probe.request(Demand::max(1));
    a.send(3);
    assert_eq!(probe.values(), vec![(1, "a"), (3, "b")]);
  }

  #[test]
  fn fails_fast_and_cancels_siblings() {
    let (a, b) = pair();
    let probe = TestSubscriber::new(Demand::UNLIMITED);
    CombineLatest::new(a.clone(), b.clone()).subscribe(probe.clone());
    a.send(1);
    b.send_completion(Completion::Failure("boom"));
    assert_eq!(probe.completion(), Some(Completion::Failure("boom")));
    assert_eq!(a.subscriber_count(), 0);
  }

  #[test]
  fn finishes_when_all_finished() {
    let (a, b) = pair();
    let probe = TestSubscriber::new(Demand::UNLIMITED);
    CombineLatest::new(a.clone(), b.clone()).subscribe(probe.clone());
    a.send(1);
    a.send_completion(Completion::Finished);
    b.send("x");
    assert_eq!(probe.completion(), None);
    b.send_completion(Completion::Finished);
    assert_eq!(probe.values(), vec![(1, "x")]);
    assert_eq!(probe.completion(), Some(Completion::Finished));
  }

  #[test]
  fn triples_and_vectors() {
    let probe = TestSubscriber::new(Demand::UNLIMITED);
    let (a, b, c) = (publisher::just(1), publisher::just('b'), publisher::sequence(vec!["c", "d"]));
    CombineLatest3::new(a, b, c).subscribe(probe.clone());
    assert_eq!(probe.values(), vec![(1, 'b', "c"), (1, 'b', "d")]);

    let probe = TestSubscriber::new(Demand::UNLIMITED);
    CombineLatestAll::new(vec![publisher::sequence(vec![1, 2]), publisher::sequence(vec![10])])
      .subscribe(probe.clone());
    assert_eq!(probe.values(), vec![vec![2, 10]]);
    assert_eq!(probe.completion(), Some(Completion::Finished));
  }

  #[test]
  fn no_upstreams_finish_immediately() {
    let probe = TestSubscriber::<Vec<i32>, ()>::new(Demand::NONE);
    CombineLatestAll::<PassthroughSubject<i32, ()>>::new(vec![]).subscribe(probe.clone());
    assert_eq!(probe.completion(), Some(Completion::Finished));
  }

  #[test]
  fn cancel_reaches_every_upstream() {
    let (a, b) = pair();
    let probe = TestSubscriber::new(Demand::UNLIMITED);
    CombineLatest::new(a.clone(), b.clone()).subscribe(probe.clone());
    a.send(1);
    assert_eq!((a.subscriber_count(), b.subscriber_count()), (1, 1));

    probe.cancel();
    assert_eq!((a.subscriber_count(), b.subscriber_count()), (0, 0));
    b.send("x");
    assert!(probe.values().is_empty());
  }
}

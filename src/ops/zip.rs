//! Zip operator implementation
//!
//! Zip pairs up values by position: the n-th value of every upstream forms
//! the n-th output. Each upstream is asked for unlimited demand and gets an
//! unbounded queue, so nothing is lost while the downstream has no demand.
//! The zipped stream finishes as soon as some upstream finished with an
//! empty queue, since no further tuple can form, and fails on the first
//! upstream failure.

use std::{collections::VecDeque, sync::Arc};

use super::upstream::{Junction, Links, Upstream};
use crate::{
  demand::Demand,
  outlet::{Drain, Flow, Outlet, Teardown},
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::AnySubscription,
};

// ==================== Zip Operators ====================

/// Zips two publishers into `(A, B)` pairs.
#[derive(Clone)]
pub struct Zip<A, B> {
  a: A,
  b: B,
}

impl<A, B> Zip<A, B> {
  pub fn new(a: A, b: B) -> Self { Zip { a, b } }
}

/// Zips three publishers into `(A, B, C)` triples.
#[derive(Clone)]
pub struct Zip3<A, B, C> {
  a: A,
  b: B,
  c: C,
}

impl<A, B, C> Zip3<A, B, C> {
  pub fn new(a: A, b: B, c: C) -> Self { Zip3 { a, b, c } }
}

/// Zips any number of same-typed publishers into `Vec`s.
#[derive(Clone)]
pub struct ZipAll<P> {
  sources: Vec<P>,
}

impl<P> ZipAll<P> {
  pub fn new(sources: Vec<P>) -> Self { ZipAll { sources } }
}

// ==================== Queues ====================

trait Queues: Send + 'static {
  type Tuple: Send + 'static;

  /// Pops the head of every queue, if none is empty.
  fn pop_tuple(&mut self) -> Option<Self::Tuple>;

  fn is_empty_at(&self, index: usize) -> bool;
}

trait Lane<const I: usize, V> {
  fn push(&mut self, value: V);
}

impl<A, B> Queues for (VecDeque<A>, VecDeque<B>)
where
  A: Send + 'static,
  B: Send + 'static,
{
  type Tuple = (A, B);

  fn pop_tuple(&mut self) -> Option<(A, B)> {
    if self.0.is_empty() || self.1.is_empty() {
      return None;
    }
    Some((self.0.pop_front()?, self.1.pop_front()?))
  }

  fn is_empty_at(&self, index: usize) -> bool {
    match index {
      0 => self.0.is_empty(),
      _ => self.1.is_empty(),
    }
  }
}

impl<A, B> Lane<0, A> for (VecDeque<A>, VecDeque<B>) {
  fn push(&mut self, value: A) { self.0.push_back(value); }
}

impl<A, B> Lane<1, B> for (VecDeque<A>, VecDeque<B>) {
  fn push(&mut self, value: B) { self.1.push_back(value); }
}

impl<A, B, C> Queues for (VecDeque<A>, VecDeque<B>, VecDeque<C>)
where
  A: Send + 'static,
  B: Send + 'static,
  C: Send + 'static,
{
  type Tuple = (A, B, C);

  fn pop_tuple(&mut self) -> Option<(A, B, C)> {
    if self.0.is_empty() || self.1.is_empty() || self.2.is_empty() {
      return None;
    }
    Some((self.0.pop_front()?, self.1.pop_front()?, self.2.pop_front()?))
  }

  fn is_empty_at(&self, index: usize) -> bool {
    match index {
      0 => self.0.is_empty(),
      1 => self.1.is_empty(),
      _ => self.2.is_empty(),
    }
  }
}

impl<A, B, C> Lane<0, A> for (VecDeque<A>, VecDeque<B>, VecDeque<C>) {
  fn push(&mut self, value: A) { self.0.push_back(value); }
}

impl<A, B, C> Lane<1, B> for (VecDeque<A>, VecDeque<B>, VecDeque<C>) {
  fn push(&mut self, value: B) { self.1.push_back(value); }
}

impl<A, B, C> Lane<2, C> for (VecDeque<A>, VecDeque<B>, VecDeque<C>) {
  fn push(&mut self, value: C) { self.2.push_back(value); }
}

impl<T: Send + 'static> Queues for Vec<VecDeque<T>> {
  type Tuple = Vec<T>;

  fn pop_tuple(&mut self) -> Option<Vec<T>> {
    if self.is_empty() || self.iter().any(VecDeque::is_empty) {
      return None;
    }
    self.iter_mut().map(VecDeque::pop_front).collect()
  }

  fn is_empty_at(&self, index: usize) -> bool { self[index].is_empty() }
}

// ==================== Shared State ====================

struct Zipping<Q, E> {
  queues: Q,
  links: Links<E>,
}

fn push<Q, E, V, const I: usize>(st: &mut Zipping<Q, E>, _index: usize, value: V, _flow: Flow)
where
  Q: Lane<I, V>,
{
  st.queues.push(value);
}

fn push_at<T, E>(st: &mut Zipping<Vec<VecDeque<T>>, E>, index: usize, value: T, _flow: Flow) {
  st.queues[index].push_back(value);
}

impl<Q: Queues, E: Send + 'static> Drain for Zipping<Q, E> {
  type Output = Q::Tuple;
  type Failure = E;

  fn poll_completion(&mut self) -> Option<Completion<E>> {
    if let Some(e) = self.links.take_failure() {
      return Some(Completion::Failure(e));
    }
    let exhausted = self.links.count() == 0
      || (0..self.links.count()).any(|i| self.links.is_finished(i) && self.queues.is_empty_at(i));
    exhausted.then_some(Completion::Finished)
  }

  fn poll_value(&mut self) -> Option<Q::Tuple> { self.queues.pop_tuple() }

  fn release(&mut self, teardown: &mut Teardown) { self.links.release(teardown); }
}

impl<Q: Queues, E: Send + 'static> Junction for Zipping<Q, E> {
  fn link(&mut self, index: usize, link: AnySubscription) { self.links.set(index, link); }

  fn complete(&mut self, index: usize, completion: Completion<E>) {
    self.links.complete(index, completion);
  }
}

// ==================== Publishers ====================

impl<A, B> Publisher for Zip<A, B>
where
  A: Publisher,
  B: Publisher<Failure = A::Failure>,
  A::Output: Send + 'static,
  B::Output: Send + 'static,
  A::Failure: Send + 'static,
{
  type Output = (A::Output, B::Output);
  type Failure = A::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Self::Output, A::Failure> + 'static,
  {
    let queues = (VecDeque::<A::Output>::new(), VecDeque::<B::Output>::new());
    let outlet = Arc::new(Outlet::new(Zipping { queues, links: Links::new(2) }));
    outlet.attach(subscriber, outlet.clone());
    if !outlet.is_done() {
      self.a.subscribe(Upstream::new(outlet.clone(), 0, Demand::UNLIMITED, push::<_, _, _, 0>));
    }
    if !outlet.is_done() {
      self.b.subscribe(Upstream::new(outlet.clone(), 1, Demand::UNLIMITED, push::<_, _, _, 1>));
    }
  }
}

impl<A, B, C> Publisher for Zip3<A, B, C>
where
  A: Publisher,
  B: Publisher<Failure = A::Failure>,
  C: Publisher<Failure = A::Failure>,
  A::Output: Send + 'static,
  B::Output: Send + 'static,
  C::Output: Send + 'static,
  A::Failure: Send + 'static,
{
  type Output = (A::Output, B::Output, C::Output);
  type Failure = A::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Self::Output, A::Failure> + 'static,
  {
    let queues =
      (VecDeque::<A::Output>::new(), VecDeque::<B::Output>::new(), VecDeque::<C::Output>::new());
    let outlet = Arc::new(Outlet::new(Zipping { queues, links: Links::new(3) }));
    outlet.attach(subscriber, outlet.clone());
    if !outlet.is_done() {
      self.a.subscribe(Upstream::new(outlet.clone(), 0, Demand::UNLIMITED, push::<_, _, _, 0>));
    }
    if !outlet.is_done() {
      self.b.subscribe(Upstream::new(outlet.clone(), 1, Demand::UNLIMITED, push::<_, _, _, 1>));
    }
    if !outlet.is_done() {
      self.c.subscribe(Upstream::new(outlet.clone(), 2, Demand::UNLIMITED, push::<_, _, _, 2>));
    }
  }
}

impl<P> Publisher for ZipAll<P>
where
  P: Publisher,
  P::Output: Send + 'static,
  P::Failure: Send + 'static,
{
  type Output = Vec<P::Output>;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Vec<P::Output>, P::Failure> + 'static,
  {
    let count = self.sources.len();
    let queues: Vec<VecDeque<P::Output>> = (0..count).map(|_| VecDeque::new()).collect();
    let outlet = Arc::new(Outlet::new(Zipping { queues, links: Links::new(count) }));
    outlet.attach(subscriber, outlet.clone());
    for (index, source) in self.sources.iter().enumerate() {
      if outlet.is_done() {
        break;
      }
      source.subscribe(Upstream::new(outlet.clone(), index, Demand::UNLIMITED, push_at));
    }
  }
}

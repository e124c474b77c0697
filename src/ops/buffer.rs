//! A bounded queue between a publisher and a slow subscriber.
//!
//! `Buffer` decouples upstream production from downstream demand. Values are
//! queued up to `capacity`; what happens beyond that is decided by the
//! [`BufferingStrategy`]. How much the buffer asks of its upstream is decided
//! by [`Prefetch`].

use std::{collections::VecDeque, fmt, sync::Arc};

use super::upstream::{Junction, Links, Upstream};
use crate::{
  demand::Demand,
  outlet::{Drain, Flow, Outlet, Requests, Teardown},
  publisher::Publisher,
  subscriber::{Completion, Subscriber},
  subscription::AnySubscription,
};

/// How the buffer requests values from its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefetch {
  /// Requests unlimited demand on subscription.
  ByRequest,
  /// Requests `capacity` values on subscription, then exactly as many as
  /// the downstream takes out of the queue.
  KeepFull,
}

/// What a full buffer does with an incoming value.
pub enum BufferingStrategy<E> {
  /// Evicts the oldest queued value to make room.
  DropOldest,
  /// Discards the incoming value.
  DropNewest,
  /// Discards the incoming value, cancels the upstream and fails with the
  /// produced failure, ahead of anything still queued.
  CustomError(Arc<dyn Fn() -> E + Send + Sync>),
}

impl<E> BufferingStrategy<E> {
  pub fn custom_error<F>(factory: F) -> Self
  where
    F: Fn() -> E + Send + Sync + 'static,
  {
    BufferingStrategy::CustomError(Arc::new(factory))
  }
}

impl<E> Clone for BufferingStrategy<E> {
  fn clone(&self) -> Self {
    match self {
      BufferingStrategy::DropOldest => BufferingStrategy::DropOldest,
      BufferingStrategy::DropNewest => BufferingStrategy::DropNewest,
      BufferingStrategy::CustomError(f) => BufferingStrategy::CustomError(f.clone()),
    }
  }
}

impl<E> fmt::Debug for BufferingStrategy<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BufferingStrategy::DropOldest => f.write_str("DropOldest"),
      BufferingStrategy::DropNewest => f.write_str("DropNewest"),
      BufferingStrategy::CustomError(_) => f.write_str("CustomError(..)"),
    }
  }
}

/// See [`PublisherExt::buffer`](super::PublisherExt::buffer).
pub struct Buffer<P, E> {
  source: P,
  capacity: usize,
  prefetch: Prefetch,
  when_full: BufferingStrategy<E>,
}

impl<P, E> Buffer<P, E> {
  /// # Panics
  ///
  /// Panics when `capacity` is zero.
  pub fn new(
    source: P,
    capacity: usize,
    prefetch: Prefetch,
    when_full: BufferingStrategy<E>,
  ) -> Self {
    assert!(capacity > 0, "buffer capacity must be at least 1");
    Buffer { source, capacity, prefetch, when_full }
  }
}

impl<P: Clone, E> Clone for Buffer<P, E> {
  fn clone(&self) -> Self {
    Buffer {
      source: self.source.clone(),
      capacity: self.capacity,
      prefetch: self.prefetch,
      when_full: self.when_full.clone(),
    }
  }
}

struct Buffering<T, E> {
  queue: VecDeque<T>,
  capacity: usize,
  when_full: BufferingStrategy<E>,
  keep_full: bool,
  dequeued: usize,
  overflow: Option<E>,
  links: Links<E>,
}

impl<T, E> Buffering<T, E> {
  fn push(&mut self, _index: usize, value: T, _flow: Flow) {
    if self.overflow.is_some() {
      return;
    }
    if self.queue.len() < self.capacity {
      self.queue.push_back(value);
      return;
    }
    match &self.when_full {
      BufferingStrategy::DropOldest => {
        tracing::debug!(capacity = self.capacity, "buffer full, dropping the oldest value");
        self.queue.pop_front();
        self.queue.push_back(value);
      }
      BufferingStrategy::DropNewest => {
        tracing::debug!(capacity = self.capacity, "buffer full, dropping the newest value");
      }
      BufferingStrategy::CustomError(factory) => {
        tracing::debug!(capacity = self.capacity, "buffer full, failing");
        self.overflow = Some(factory());
      }
    }
  }
}

impl<T: Send + 'static, E: Send + 'static> Drain for Buffering<T, E> {
  type Output = T;
  type Failure = E;

  fn poll_completion(&mut self) -> Option<Completion<E>> {
    if let Some(e) = self.overflow.take().or_else(|| self.links.take_failure()) {
      self.queue.clear();
      return Some(Completion::Failure(e));
    }
    (self.links.all_finished() && self.queue.is_empty()).then_some(Completion::Finished)
  }

  fn poll_value(&mut self) -> Option<T> {
    let value = self.queue.pop_front()?;
    if self.keep_full {
      self.dequeued += 1;
    }
    Some(value)
  }

  fn take_requests(&mut self) -> Requests {
    let mut requests = Requests::new();
    if self.dequeued > 0 && !self.links.all_finished() {
      if let Some(link) = self.links.get(0) {
        requests.push((link.clone(), Demand::max(self.dequeued)));
        self.dequeued = 0;
      }
    }
    requests
  }

  fn release(&mut self, teardown: &mut Teardown) { self.links.release(teardown); }
}

impl<T: Send + 'static, E: Send + 'static> Junction for Buffering<T, E> {
  fn link(&mut self, index: usize, link: AnySubscription) { self.links.set(index, link); }

  fn complete(&mut self, index: usize, completion: Completion<E>) {
    self.links.complete(index, completion);
  }
}

impl<P> Publisher for Buffer<P, P::Failure>
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
    let keep_full = self.prefetch == Prefetch::KeepFull;
    let outlet = Arc::new(Outlet::new(Buffering {
      queue: VecDeque::with_capacity(self.capacity),
      capacity: self.capacity,
      when_full: self.when_full.clone(),
      keep_full,
      dequeued: 0,
      overflow: None,
      links: Links::new(1),
    }));
    outlet.attach(subscriber, outlet.clone());
    if outlet.is_done() {
      return;
    }
    let initial = if keep_full { Demand::max(self.capacity) } else { Demand::UNLIMITED };
    self.source.subscribe(Upstream::new(outlet.clone(), 0, initial, Buffering::push));
  }
}

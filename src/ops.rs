//! Operators and the [`PublisherExt`] extension trait that chains them.
//!
//! Every operator is a cold publisher: subscribing builds fresh state behind
//! one serialized outlet and subscribes the upstreams with operator-owned
//! subscribers. Cancelling the returned subscription cancels every live
//! upstream.

pub mod buffer;
pub mod combine_latest;
pub mod flat_map;
pub mod into_stream;
pub mod merge;
pub mod switch_to_latest;
pub mod zip;

mod upstream;

pub use buffer::{Buffer, BufferingStrategy, Prefetch};
pub use combine_latest::{CombineLatest, CombineLatest3, CombineLatestAll};
pub use flat_map::FlatMap;
pub use into_stream::IntoStream;
pub use merge::{Merge, MergeMany};
pub use switch_to_latest::SwitchToLatest;
pub use zip::{Zip, Zip3, ZipAll};

use crate::{
  demand::Demand,
  error::Never,
  publisher::{AnyPublisher, Publisher},
  subscriber::{Completion, Sink},
  subscription::AnyCancellable,
};

/// Operator methods available on every [`Publisher`].
pub trait PublisherExt: Publisher + Sized {
  /// Pairs the latest values of `self` and `other` once both produced.
  fn combine_latest<B>(self, other: B) -> CombineLatest<Self, B>
  where
    B: Publisher<Failure = Self::Failure>,
  {
    CombineLatest::new(self, other)
  }

  fn combine_latest3<B, C>(self, b: B, c: C) -> CombineLatest3<Self, B, C>
  where
    B: Publisher<Failure = Self::Failure>,
    C: Publisher<Failure = Self::Failure>,
  {
    CombineLatest3::new(self, b, c)
  }

  /// Pairs the values of `self` and `other` by position.
  fn zip<B>(self, other: B) -> Zip<Self, B>
  where
    B: Publisher<Failure = Self::Failure>,
  {
    Zip::new(self, other)
  }

  fn zip3<B, C>(self, b: B, c: C) -> Zip3<Self, B, C>
  where
    B: Publisher<Failure = Self::Failure>,
    C: Publisher<Failure = Self::Failure>,
  {
    Zip3::new(self, b, c)
  }

  /// Interleaves the values of `self` and `other` in arrival order.
  fn merge<B>(self, other: B) -> Merge<Self, B>
  where
    B: Publisher<Output = Self::Output, Failure = Self::Failure>,
  {
    Merge::new(self, other)
  }

  /// Maps every value to a publisher and flattens them, keeping at most
  /// `max_publishers` inner subscriptions alive.
  fn flat_map<F, Q>(self, max_publishers: Demand, transform: F) -> FlatMap<Self, F>
  where
    F: Fn(Self::Output) -> Q + Send + Sync + 'static,
    Q: Publisher<Failure = Self::Failure>,
  {
    FlatMap::new(self, max_publishers, transform)
  }

  fn flat_map_unbounded<F, Q>(self, transform: F) -> FlatMap<Self, F>
  where
    F: Fn(Self::Output) -> Q + Send + Sync + 'static,
    Q: Publisher<Failure = Self::Failure>,
  {
    FlatMap::new(self, Demand::UNLIMITED, transform)
  }

  /// Follows only the most recent inner publisher.
  fn switch_to_latest(self) -> SwitchToLatest<Self>
  where
    Self::Output: Publisher<Failure = Self::Failure>,
  {
    SwitchToLatest::new(self)
  }

  /// # Panics
  ///
  /// Panics when `capacity` is zero.
  fn buffer(
    self,
    capacity: usize,
    prefetch: Prefetch,
    when_full: BufferingStrategy<Self::Failure>,
  ) -> Buffer<Self, Self::Failure> {
    Buffer::new(self, capacity, prefetch, when_full)
  }

  /// Subscribes closures with unlimited demand. Dropping the returned token
  /// cancels the subscription.
  fn sink<FC, FV>(&self, on_completion: FC, on_value: FV) -> AnyCancellable
  where
    FC: FnOnce(Completion<Self::Failure>) + Send + 'static,
    FV: FnMut(Self::Output) + Send + 'static,
  {
    let sink = Sink::new(on_completion, on_value);
    let token = sink.cancellable();
    self.subscribe(sink);
    token
  }

  fn sink_value<FV>(&self, on_value: FV) -> AnyCancellable
  where
    Self: Publisher<Failure = Never>,
    FV: FnMut(Self::Output) + Send + 'static,
  {
    self.sink(|_| {}, on_value)
  }

  fn boxed(self) -> AnyPublisher<Self::Output, Self::Failure>
  where
    Self: Send + Sync + 'static,
  {
    AnyPublisher::new(self)
  }

  fn into_stream(&self) -> IntoStream<Self::Output, Self::Failure>
  where
    Self::Output: Send + 'static,
    Self::Failure: Send + 'static,
  {
    IntoStream::new(self)
  }
}

impl<P: Publisher> PublisherExt for P {}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[test]
  fn chains_read_left_to_right() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let _token = publisher::sequence(vec![1, 2])
      .zip(publisher::sequence(vec!["a", "b", "c"]))
      .merge(publisher::just((3, "z")))
      .sink_value(move |pair| c_seen.lock().push(pair));
    assert_eq!(*seen.lock(), vec![(1, "a"), (2, "b"), (3, "z")]);
  }

  #[test]
  fn sink_reports_the_completion() {
    let done = Arc::new(Mutex::new(None));
    let c_done = done.clone();
    let _token = publisher::fail::<i32, _>("boom").sink(move |c| *c_done.lock() = Some(c), |_| {});
    assert_eq!(*done.lock(), Some(Completion::Failure("boom")));
  }

  #[test]
  fn dropping_the_token_cancels() {
    let subject = PassthroughSubject::<i32, Never>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let token = subject.sink_value(move |v| c_seen.lock().push(v));
    subject.send(1);
    drop(token);
    subject.send(2);
    assert_eq!(*seen.lock(), vec![1]);
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[test]
  fn flat_map_over_boxed_inners() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let _token = publisher::sequence(vec![0, 3])
      .flat_map_unbounded(|n| {
        if n == 0 { publisher::just(n).boxed() } else { publisher::sequence(n..n + 2).boxed() }
      })
      .sink_value(move |v| c_seen.lock().push(v));
    assert_eq!(*seen.lock(), vec![0, 3, 4]);
  }
}

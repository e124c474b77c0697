//! IntoStream Operator
//!
//! Bridges a [`Publisher`] into a `futures::Stream` so its values can be
//! consumed with `async`/`await`. The stream pulls: each poll that finds
//! nothing buffered requests exactly one value from the publisher.
//!
//! # Example
//!
//! ```rust
//! use futures::{executor::block_on, StreamExt};
//! use rxflow::prelude::*;
//!
//! let values: Vec<_> = block_on(publisher::sequence(1..=3).into_stream().collect());
//! assert_eq!(values, vec![Ok(1), Ok(2), Ok(3)]);
//! ```

use std::{
  collections::VecDeque,
  pin::Pin,
  sync::Arc,
  task::{Context, Poll, Waker},
};

use futures::Stream;
use parking_lot::Mutex;

use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{Completion, Lifecycle, Subscriber},
  subscription::AnySubscription,
};

/// State shared between the subscription side and the stream consumer.
struct IntoStreamState<T, E> {
  /// Values and the failure waiting to be polled.
  queue: VecDeque<Result<T, E>>,
  link: Option<AnySubscription>,
  /// A value was requested and has not arrived yet.
  requested: bool,
  closed: bool,
  waker: Option<Waker>,
}

/// A `Stream` yielding `Ok` for every value of a publisher and `Err` for its
/// failure.
///
/// The stream ends after the publisher finishes or right after the failure.
/// Dropping it cancels the subscription.
pub struct IntoStream<T, E> {
  state: Arc<Mutex<IntoStreamState<T, E>>>,
}

impl<T, E> IntoStream<T, E>
where
  T: Send + 'static,
  E: Send + 'static,
{
  pub fn new<P>(publisher: &P) -> Self
  where
    P: Publisher<Output = T, Failure = E> + ?Sized,
  {
    let state = Arc::new(Mutex::new(IntoStreamState {
      queue: VecDeque::new(),
      link: None,
      requested: false,
      closed: false,
      waker: None,
    }));
    let subscriber = IntoStreamSubscriber { state: state.clone(), lifecycle: Lifecycle::default() };
    publisher.subscribe(subscriber);
    IntoStream { state }
  }
}

impl<T, E> Stream for IntoStream<T, E> {
  type Item = Result<T, E>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let mut state = self.state.lock();
    if let Some(item) = state.queue.pop_front() {
      return Poll::Ready(Some(item));
    }
    if state.closed {
      return Poll::Ready(None);
    }
    state.waker = Some(cx.waker().clone());
    let link = match (&state.link, state.requested) {
      (Some(link), false) => link.clone(),
      _ => return Poll::Pending,
    };
    state.requested = true;
    drop(state);

    link.request(Demand::max(1));

    // Synchronous publishers answer inside `request`.
    let mut state = self.state.lock();
    match state.queue.pop_front() {
      Some(item) => Poll::Ready(Some(item)),
      None if state.closed => Poll::Ready(None),
      None => Poll::Pending,
    }
  }
}

impl<T, E> Drop for IntoStream<T, E> {
  fn drop(&mut self) {
    let link = {
      let mut state = self.state.lock();
      state.closed = true;
      state.link.take()
    };
    if let Some(link) = link {
      link.cancel();
    }
  }
}

struct IntoStreamSubscriber<T, E> {
  state: Arc<Mutex<IntoStreamState<T, E>>>,
  lifecycle: Lifecycle,
}

impl<T, E> IntoStreamSubscriber<T, E> {
  fn push(&self, item: Option<Result<T, E>>) {
    let waker = {
      let mut state = self.state.lock();
      match item {
        Some(item @ Ok(_)) => {
          state.requested = false;
          state.queue.push_back(item);
        }
        Some(item @ Err(_)) => {
          state.queue.push_back(item);
          state.closed = true;
          state.link = None;
        }
        None => {
          state.closed = true;
          state.link = None;
        }
      }
      state.waker.take()
    };
    if let Some(waker) = waker {
      waker.wake();
    }
  }
}

impl<T: Send, E: Send> Subscriber<T, E> for IntoStreamSubscriber<T, E> {
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    if !self.lifecycle.subscribe() {
      subscription.cancel();
      return;
    }
    self.state.lock().link = Some(subscription);
  }

  fn receive(&mut self, input: T) -> Demand {
    self.lifecycle.value("stream bridge");
    self.push(Some(Ok(input)));
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<E>) {
    self.lifecycle.complete("stream bridge");
    match completion {
      Completion::Finished => self.push(None),
      Completion::Failure(e) => self.push(Some(Err(e))),
    }
  }
}

#[cfg(test)]
mod tests {
  use futures::StreamExt;

  use super::*;
  use crate::{publisher, subject::PassthroughSubject};

  #[tokio::test]
  async fn yields_every_value() {
    let stream = IntoStream::new(&publisher::sequence(vec![1, 2, 3]));
    let values: Vec<i32> = stream.map(|item| item.unwrap_or_default()).collect().await;
    assert_eq!(values, vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn empty_publisher_ends_the_stream() {
    let mut stream = IntoStream::new(&publisher::empty::<i32>());
    assert!(stream.next().await.is_none());
  }

  #[tokio::test]
  async fn failure_is_the_last_item() {
    let mut stream = IntoStream::new(&publisher::fail::<i32, _>("error"));
    assert_eq!(stream.next().await, Some(Err("error")));
    assert_eq!(stream.next().await, None);
  }

  #[tokio::test]
  async fn pulls_one_value_at_a_time() {
    let subject = PassthroughSubject::<i32, ()>::new();
    let mut stream = IntoStream::new(&subject);
    subject.send(0);

    let waiting = tokio::spawn(async move { stream.next().await });
    tokio::task::yield_now().await;
    while !waiting.is_finished() {
      subject.send(1);
      tokio::task::yield_now().await;
    }
    assert_eq!(waiting.await.ok().flatten(), Some(Ok(1)));
  }

  #[test]
  fn dropping_the_stream_cancels() {
    let subject = PassthroughSubject::<i32, ()>::new();
    let stream = IntoStream::new(&subject);
    assert_eq!(subject.subscriber_count(), 1);
    drop(stream);
    assert_eq!(subject.subscriber_count(), 0);
  }
}

//! The producing end of the protocol and the leaf publishers.
//!
//! A [`Publisher`] hands every subscriber its own subscription, exactly once
//! and synchronously inside [`Publisher::subscribe`]. Cold publishers such as
//! [`Sequence`] build fresh state per call, hot ones such as
//! [`PassthroughSubject`](crate::subject::PassthroughSubject) share a single
//! source between all their subscribers.

mod boxed;
mod empty;
mod just;
mod sequence;
mod timer;

pub use boxed::AnyPublisher;
pub use empty::{Empty, Fail};
pub use just::Just;
pub use sequence::Sequence;
pub use timer::Timer;

use crate::{error::Never, scheduler::Scheduler, subscriber::Subscriber};

/// Something subscribers can attach to.
pub trait Publisher {
  type Output;
  type Failure;

  /// Attaches `subscriber`, which receives its subscription before this
  /// call returns.
  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Self::Output, Self::Failure> + 'static;
}

impl<P: Publisher + ?Sized> Publisher for &P {
  type Output = P::Output;
  type Failure = P::Failure;

  #[inline]
  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Self::Output, Self::Failure> + 'static,
  {
    (**self).subscribe(subscriber)
  }
}

impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
  type Output = P::Output;
  type Failure = P::Failure;

  #[inline]
  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Self::Output, Self::Failure> + 'static,
  {
    (**self).subscribe(subscriber)
  }
}

/// Emits `value` on the first demand, then finishes.
pub fn just<T: Clone>(value: T) -> Just<T> { Just::new(value) }

/// Finishes immediately without producing.
pub fn empty<T>() -> Empty<T, Never> { Empty::new() }

/// Fails immediately with `failure`.
pub fn fail<T, E: Clone>(failure: E) -> Fail<T, E> { Fail::new(failure) }

/// Emits the items of `iter` as demand allows, then finishes.
pub fn sequence<I>(iter: I) -> Sequence<I>
where
  I: IntoIterator + Clone,
{
  Sequence::new(iter)
}

/// Emits `0, 1, 2, ...` every `period` on `scheduler`.
pub fn timer<Sch: Scheduler>(scheduler: Sch, period: std::time::Duration) -> Timer<Sch> {
  Timer::new(scheduler, period)
}

//! Error types and the protocol-violation fault.
//!
//! Two kinds of failure exist in rxflow. Data-level failures travel
//! downstream as [`Completion::Failure`](crate::subscriber::Completion) and
//! are recoverable by composition. Protocol violations (a value before the
//! subscription, a second completion, a negative demand) are bugs in a
//! component and abort the current thread through [`protocol_violation`].

use std::fmt::Arguments;

use thiserror::Error;

/// Failure type of publishers that can never fail.
pub type Never = std::convert::Infallible;

/// Ready-made failure for [`BufferingStrategy::CustomError`] factories.
///
/// [`BufferingStrategy::CustomError`]: crate::ops::buffer::BufferingStrategy::CustomError
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("buffer overflow: capacity of {capacity} values exceeded")]
pub struct BufferOverflow {
  pub capacity: usize,
}

/// Errors raised while building a scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
  #[error("failed to spawn the thread pool: {0}")]
  ThreadPool(#[from] std::io::Error),
  #[cfg(feature = "tokio-scheduler")]
  #[error("no tokio runtime available: {0}")]
  Runtime(#[from] tokio::runtime::TryCurrentError),
}

/// Signals a broken publisher/subscriber contract.
///
/// Logs the violation and panics; protocol violations are never turned into
/// data-level failures.
#[cold]
#[track_caller]
pub fn protocol_violation(message: Arguments<'_>) -> ! {
  tracing::error!(%message, "reactive protocol violation");
  panic!("protocol violation: {message}")
}

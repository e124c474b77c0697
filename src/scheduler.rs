//! Where and when deferred work runs.
//!
//! The reactive core never spawns anything on its own. Time-driven
//! publishers such as [`Timer`](crate::publisher::Timer) take a
//! [`Scheduler`] and hand it their periodic work.
//!
//! | Scheduler               | Runs work                          | Feature             |
//! |-------------------------|------------------------------------|---------------------|
//! | [`ImmediateScheduler`]  | inline, on the calling thread      | always              |
//! | [`ThreadPoolScheduler`] | on a `futures` thread pool         | `futures-scheduler` + `timer` |
//! | [`TokioScheduler`]      | on a tokio runtime                 | `tokio-scheduler`   |
//! | [`TestScheduler`]       | when virtual time is advanced      | always              |

mod immediate;
mod test_scheduler;
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
mod thread_pool_scheduler;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;

pub use std::time::Duration;

pub use immediate::ImmediateScheduler;
pub use test_scheduler::TestScheduler;
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub use thread_pool_scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

use crate::subscription::AnyCancellable;

/// Time on a scheduler's clock, measured from the scheduler's own epoch.
pub type SchedulerTime = Duration;

/// Orders the execution of deferred actions.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// Monotonic time since this scheduler's epoch.
  fn now(&self) -> SchedulerTime;

  /// The granularity the scheduler can honour for delays.
  fn min_tolerance(&self) -> Duration { Duration::ZERO }

  /// Runs `action` as soon as possible.
  fn schedule<F>(&self, action: F)
  where
    F: FnOnce() + Send + 'static;

  /// Runs `action` once `delay` has elapsed.
  fn schedule_after<F>(&self, delay: Duration, action: F)
  where
    F: FnOnce() + Send + 'static;

  /// Runs `action` after `after`, then every `interval`, until the returned
  /// token is cancelled or dropped.
  fn schedule_interval<F>(&self, after: Duration, interval: Duration, action: F) -> AnyCancellable
  where
    F: FnMut() + Send + 'static;
}

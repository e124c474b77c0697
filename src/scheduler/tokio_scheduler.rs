use std::time::{Duration, Instant};

use tokio::runtime::Handle;

use super::{Scheduler, SchedulerTime};
use crate::{error::SchedulerError, subscription::AnyCancellable};

/// Runs actions as tasks on a tokio runtime.
#[derive(Clone)]
pub struct TokioScheduler {
  handle: Handle,
  epoch: Instant,
}

impl TokioScheduler {
  /// Uses the runtime the caller is running on.
  pub fn current() -> Result<Self, SchedulerError> { Ok(Self::from_handle(Handle::try_current()?)) }

  pub fn from_handle(handle: Handle) -> Self { TokioScheduler { handle, epoch: Instant::now() } }
}

impl Scheduler for TokioScheduler {
  fn now(&self) -> SchedulerTime { self.epoch.elapsed() }

  fn min_tolerance(&self) -> Duration { Duration::from_millis(1) }

  fn schedule<F>(&self, action: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.handle.spawn(async move { action() });
  }

  fn schedule_after<F>(&self, delay: Duration, action: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.handle.spawn(async move {
      tokio::time::sleep(delay).await;
      action();
    });
  }

  fn schedule_interval<F>(
    &self,
    after: Duration,
    interval: Duration,
    mut action: F,
  ) -> AnyCancellable
  where
    F: FnMut() + Send + 'static,
  {
    let task = self.handle.spawn(async move {
      tokio::time::sleep(after).await;
      loop {
        action();
        tokio::time::sleep(interval).await;
      }
    });
    AnyCancellable::from_fn(move || task.abort())
  }
}

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use super::{Scheduler, SchedulerTime};
use crate::subscription::AnyCancellable;

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Runs every action inline on the calling thread.
///
/// Delays are not honoured: a delayed action runs right away and an
/// interval action runs exactly once.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn now(&self) -> SchedulerTime { EPOCH.elapsed() }

  fn schedule<F>(&self, action: F)
  where
    F: FnOnce() + Send + 'static,
  {
    action()
  }

  fn schedule_after<F>(&self, _delay: Duration, action: F)
  where
    F: FnOnce() + Send + 'static,
  {
    action()
  }

  fn schedule_interval<F>(
    &self,
    _after: Duration,
    _interval: Duration,
    mut action: F,
  ) -> AnyCancellable
  where
    F: FnMut() + Send + 'static,
  {
    action();
    AnyCancellable::from_fn(|| {})
  }
}

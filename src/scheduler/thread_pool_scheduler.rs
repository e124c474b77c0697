use std::time::{Duration, Instant};

use futures::{
  executor::ThreadPool,
  future::{self, AbortHandle},
};
use futures_time::task::sleep;
use once_cell::sync::OnceCell;

use super::{Scheduler, SchedulerTime};
use crate::{error::SchedulerError, subscription::AnyCancellable};

static SHARED_POOL: OnceCell<ThreadPool> = OnceCell::new();

/// Runs actions on a `futures` thread pool; delays are `futures-time` sleeps.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
  epoch: Instant,
}

impl ThreadPoolScheduler {
  /// A scheduler on a fresh pool with one thread per CPU.
  pub fn new() -> Result<Self, SchedulerError> {
    Ok(Self::with_pool(ThreadPool::new()?))
  }

  /// A scheduler on the process-wide pool, created on first use.
  pub fn shared() -> Result<Self, SchedulerError> {
    let pool = SHARED_POOL.get_or_try_init(ThreadPool::new)?;
    Ok(Self::with_pool(pool.clone()))
  }

  pub fn with_pool(pool: ThreadPool) -> Self { ThreadPoolScheduler { pool, epoch: Instant::now() } }
}

impl Scheduler for ThreadPoolScheduler {
  fn now(&self) -> SchedulerTime { self.epoch.elapsed() }

  fn min_tolerance(&self) -> Duration { Duration::from_millis(1) }

  fn schedule<F>(&self, action: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.pool.spawn_ok(future::lazy(move |_| action()));
  }

  fn schedule_after<F>(&self, delay: Duration, action: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.pool.spawn_ok(async move {
      sleep(delay.into()).await;
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
    let (handle, registration) = AbortHandle::new_pair();
    let ticking = async move {
      sleep(after.into()).await;
      loop {
        action();
        sleep(interval.into()).await;
      }
    };
    self.pool.spawn_ok(async move {
      let _ = future::Abortable::new(ticking, registration).await;
    });
    AnyCancellable::from_fn(move || handle.abort())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::mpsc;

  use super::*;

  #[test]
  fn runs_on_the_pool() {
    let scheduler = ThreadPoolScheduler::shared().unwrap();
    let (tx, rx) = mpsc::channel();
    scheduler.schedule(move || tx.send(std::thread::current().id()).unwrap());
    let worker = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_ne!(worker, std::thread::current().id());
  }

  #[test]
  fn interval_stops_when_cancelled() {
    let scheduler = ThreadPoolScheduler::new().unwrap();
    let (tx, rx) = mpsc::channel();
    let mut token = scheduler.schedule_interval(Duration::ZERO, Duration::from_millis(5), move || {
      let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    token.cancel();
    std::thread::sleep(Duration::from_millis(50));
    while rx.try_recv().is_ok() {}
    std::thread::sleep(Duration::from_millis(50));
    assert!(rx.try_recv().is_err());
  }
}

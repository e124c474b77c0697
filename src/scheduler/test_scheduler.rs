//! Virtual-time scheduler for deterministic tests of time-driven publishers.
//!
//! Time stands still until the test moves it with
//! [`TestScheduler::advance_by`] or [`TestScheduler::flush`]; due actions
//! then run synchronously on the calling thread, earliest deadline first and
//! FIFO among equal deadlines.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use rxflow::{prelude::*, scheduler::TestScheduler, testing::TestSubscriber};
//!
//! let scheduler = TestScheduler::new();
//! let probe = TestSubscriber::new(Demand::UNLIMITED);
//! publisher::timer(scheduler.clone(), Duration::from_millis(100)).subscribe(probe.clone());
//!
//! scheduler.advance_by(Duration::from_millis(250));
//! assert_eq!(probe.values(), vec![0, 1]);
//! ```
//!
//! Every instance (and its clones) owns an independent clock and queue, so
//! tests running in parallel never observe each other.

use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  sync::{
    atomic::{AtomicBool, Ordering as AtomicOrdering},
    Arc,
  },
  time::Duration,
};

use parking_lot::Mutex;

use super::{Scheduler, SchedulerTime};
use crate::subscription::AnyCancellable;

const MIN_INTERVAL: Duration = Duration::from_nanos(1);

type Action = Box<dyn FnMut() -> Option<Duration> + Send>;

#[derive(Default)]
struct TestSchedulerState {
  virtual_time: Duration,
  task_queue: BinaryHeap<ScheduledTask>,
  next_task_id: usize,
}

impl TestSchedulerState {
  fn push(&mut self, scheduled_time: Duration, task: Action, cancelled: Arc<AtomicBool>) {
    let task_id = self.next_task_id;
    self.next_task_id += 1;
    self.task_queue.push(ScheduledTask { scheduled_time, task_id, task, cancelled });
  }
}

struct ScheduledTask {
  scheduled_time: Duration,
  task_id: usize,
  task: Action,
  cancelled: Arc<AtomicBool>,
}

impl ScheduledTask {
  fn is_cancelled(&self) -> bool { self.cancelled.load(AtomicOrdering::SeqCst) }
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

/// A scheduler driven by a manually advanced virtual clock.
#[derive(Clone, Default)]
pub struct TestScheduler {
  state: Arc<Mutex<TestSchedulerState>>,
}

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// Number of scheduled actions that are still live.
  pub fn pending_count(&self) -> usize {
    let state = self.state.lock();
    state.task_queue.iter().filter(|t| !t.is_cancelled()).count()
  }

  pub fn is_empty(&self) -> bool { self.pending_count() == 0 }

  /// Moves the clock forward by `duration`, running every action that falls
  /// due on the way, each at its own deadline.
  pub fn advance_by(&self, duration: Duration) {
    let target_time = self.state.lock().virtual_time + duration;
    self.execute_tasks_until(target_time);
    let mut state = self.state.lock();
    state.virtual_time = state.virtual_time.max(target_time);
  }

  /// Runs everything scheduled up to the latest deadline currently queued.
  ///
  /// Repeating actions fire for every period up to that deadline and stay
  /// scheduled afterwards.
  pub fn flush(&self) {
    let last = self.state.lock().task_queue.iter().map(|t| t.scheduled_time).max();
    if let Some(last) = last {
      self.execute_tasks_until(last);
    }
  }

  fn execute_tasks_until(&self, target_time: Duration) {
    loop {
      let next = {
        let mut state = self.state.lock();
        let due = state
          .task_queue
          .peek()
          .is_some_and(|peek| peek.scheduled_time <= target_time);
        if !due {
          break;
        }
        let task = state.task_queue.pop();
        if let Some(task) = &task {
          state.virtual_time = state.virtual_time.max(task.scheduled_time);
        }
        task
      };
      let Some(mut scheduled_task) = next else {
        break;
      };
      if scheduled_task.is_cancelled() {
        continue;
      }

      let again = (scheduled_task.task)();

      if let Some(period) = again {
        if !scheduled_task.is_cancelled() {
          let mut state = self.state.lock();
          let at = state.virtual_time + period.max(MIN_INTERVAL);
          state.push(at, scheduled_task.task, scheduled_task.cancelled);
        }
      }
    }
  }

  fn enqueue(&self, delay: Duration, task: Action) -> Arc<AtomicBool> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut state = self.state.lock();
    let at = state.virtual_time + delay;
    state.push(at, task, cancelled.clone());
    cancelled
  }
}

impl Scheduler for TestScheduler {
  fn now(&self) -> SchedulerTime { self.state.lock().virtual_time }

  fn schedule<F>(&self, action: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.schedule_after(Duration::ZERO, action)
  }

  fn schedule_after<F>(&self, delay: Duration, action: F)
  where
    F: FnOnce() + Send + 'static,
  {
    let mut action = Some(action);
    self.enqueue(
      delay,
      Box::new(move || {
        if let Some(action) = action.take() {
          action();
        }
        None
      }),
    );
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
    let cancelled = self.enqueue(
      after,
      Box::new(move || {
        action();
        Some(interval)
      }),
    );
    AnyCancellable::from_fn(move || cancelled.store(true, AtomicOrdering::SeqCst))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  type Log = Arc<Mutex<Vec<&'static str>>>;

  fn recorder() -> (Log, impl Fn(&'static str) -> Box<dyn FnOnce() + Send>) {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let make = move |tag: &'static str| {
      let log = c_log.clone();
      Box::new(move || log.lock().push(tag)) as Box<dyn FnOnce() + Send>
    };
    (log, make)
  }

  #[test]
  fn time_stands_still_until_advanced() {
    let scheduler = TestScheduler::new();
    let (log, make) = recorder();
    scheduler.schedule_after(Duration::from_millis(100), make("late"));
    assert!(log.lock().is_empty());

    scheduler.advance_by(Duration::from_millis(99));
    assert!(log.lock().is_empty());
    scheduler.advance_by(Duration::from_millis(1));
    assert_eq!(*log.lock(), vec!["late"]);
    assert_eq!(scheduler.now(), Duration::from_millis(100));
  }

  #[test]
  fn fifo_among_equal_deadlines() {
    let scheduler = TestScheduler::new();
    let (log, make) = recorder();
    scheduler.schedule_after(Duration::from_millis(10), make("b"));
    scheduler.schedule(make("a"));
    scheduler.schedule_after(Duration::from_millis(10), make("c"));
    scheduler.flush();
    assert_eq!(*log.lock(), vec!["a", "b", "c"]);
  }

  #[test]
  fn instances_are_independent() {
    let first = TestScheduler::new();
    let second = TestScheduler::new();
    first.advance_by(Duration::from_secs(1));
    assert_eq!(first.now(), Duration::from_secs(1));
    assert_eq!(second.now(), Duration::ZERO);
    assert_eq!(first.clone().now(), Duration::from_secs(1));
  }

  #[test]
  fn interval_repeats_until_cancelled() {
    let scheduler = TestScheduler::new();
    let hits = Arc::new(Mutex::new(vec![]));
    let (c_hits, c_scheduler) = (hits.clone(), scheduler.clone());
    let mut token = scheduler.schedule_interval(
      Duration::from_millis(5),
      Duration::from_millis(10),
      move || c_hits.lock().push(c_scheduler.now()),
    );

    scheduler.advance_by(Duration::from_millis(30));
    assert_eq!(
      *hits.lock(),
      vec![Duration::from_millis(5), Duration::from_millis(15), Duration::from_millis(25)]
    );

    token.cancel();
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(hits.lock().len(), 3);
    assert!(scheduler.is_empty());
  }

  #[test]
  fn actions_may_schedule_more_work() {
    let scheduler = TestScheduler::new();
    let (log, make) = recorder();
    let c_scheduler = scheduler.clone();
    let follow_up = make("second");
    scheduler.schedule_after(Duration::from_millis(1), move || {
      c_scheduler.schedule_after(Duration::from_millis(1), follow_up);
    });
    scheduler.advance_by(Duration::from_millis(5));
    assert_eq!(*log.lock(), vec!["second"]);
  }
}

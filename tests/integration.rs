//! Integration tests for rxflow
//!
//! End-to-end operator chains, subjects fed from several threads and the
//! scheduler-driven publishers.

use std::{
  sync::{mpsc, Arc},
  thread,
  time::Duration,
};

use futures::StreamExt;
use parking_lot::Mutex;
use rxflow::{prelude::*, scheduler::TestScheduler, testing::TestSubscriber};

#[test]
fn combine_latest_of_two_subjects() {
  let a = PassthroughSubject::<i32, Never>::new();
  let b = PassthroughSubject::<i32, Never>::new();
  let probe = TestSubscriber::new(Demand::UNLIMITED);
  a.clone().combine_latest(b.clone()).subscribe(probe.clone());

  a.send(1);
  a.send(2);
  b.send(10);
  a.send(3);
  b.send(11);
  assert_eq!(probe.values(), vec![(2, 10), (3, 10), (3, 11)]);
}

#[test]
fn demand_arithmetic_saturates() {
  assert_eq!(Demand::max(7) + Demand::UNLIMITED, Demand::UNLIMITED);
  assert_eq!(Demand::max(2) - Demand::max(5), Demand::NONE);
  assert_eq!(Demand::UNLIMITED - Demand::max(5), Demand::UNLIMITED);
}

#[test]
fn double_cancel_is_a_single_cancel() {
  let subject = PassthroughSubject::<i32, Never>::new();
  let probe = TestSubscriber::new(Demand::UNLIMITED);
  subject.subscribe(probe.clone());
  probe.cancel();
  probe.cancel();
  subject.send(1);
  assert_eq!(subject.subscriber_count(), 0);
  assert!(probe.values().is_empty());
  assert_eq!(probe.completion(), None);
}

#[test]
fn completed_subject_replays_only_the_completion() {
  let subject = PassthroughSubject::<i32, &str>::new();
  subject.send(1);
  subject.send_completion(Completion::Failure("closed"));
  let probe = TestSubscriber::new(Demand::UNLIMITED);
  subject.subscribe(probe.clone());
  assert!(probe.is_subscribed());
  assert!(probe.values().is_empty());
  assert_eq!(probe.completion(), Some(Completion::Failure("closed")));
}

#[test]
fn zip_then_buffer_keeps_the_newest_pairs() {
  let (a, b) = (PassthroughSubject::<i32, ()>::new(), PassthroughSubject::<char, ()>::new());
  let probe = TestSubscriber::new(Demand::NONE);
  a.clone()
    .zip(b.clone())
    .buffer(2, Prefetch::ByRequest, BufferingStrategy::DropOldest)
    .subscribe(probe.clone());

  for (n, c) in (0..4).zip('a'..='d') {
    a.send(n);
    b.send(c);
  }
  probe.request(Demand::UNLIMITED);
  assert_eq!(probe.values(), vec![(2, 'c'), (3, 'd')]);
}

#[test]
fn switch_to_latest_over_a_flat_map() {
  let outer = PassthroughSubject::<AnyPublisher<i32, Never>, Never>::new();
  let probe = TestSubscriber::new(Demand::UNLIMITED);
  outer.clone().switch_to_latest().subscribe(probe.clone());

  let live = PassthroughSubject::<i32, Never>::new();
  outer.send(live.clone().boxed());
  live.send(1);
  outer.send(
    publisher::sequence(vec![10, 20])
      .flat_map_unbounded(|n| publisher::sequence(vec![n, n + 1]))
      .boxed(),
  );
  live.send(2);
  outer.send_completion(Completion::Finished);

  assert_eq!(probe.values(), vec![1, 10, 11, 20, 21]);
  assert_eq!(probe.completion(), Some(Completion::Finished));
  assert_eq!(live.subscriber_count(), 0);
}

#[test]
fn current_value_subject_feeds_late_subscribers() {
  let subject = CurrentValueSubject::<&str, Never>::new("idle");
  let early = TestSubscriber::new(Demand::UNLIMITED);
  subject.subscribe(early.clone());
  subject.send("busy");

  let late = TestSubscriber::new(Demand::max(1));
  subject.subscribe(late.clone());
  assert_eq!(early.values(), vec!["idle", "busy"]);
  assert_eq!(late.values(), vec!["busy"]);
  assert_eq!(subject.value(), Some("busy"));
}

#[test]
fn merge_of_concurrent_senders_keeps_per_source_order() {
  let subjects: Vec<_> =
    (0..4).map(|_| PassthroughSubject::<(usize, usize), Never>::new()).collect();
  let probe = TestSubscriber::new(Demand::UNLIMITED);
  rxflow::ops::MergeMany::new(subjects.clone()).subscribe(probe.clone());

  let senders: Vec<_> = subjects
    .into_iter()
    .enumerate()
    .map(|(source, subject)| {
      thread::spawn(move || {
        for n in 0..500 {
          subject.send((source, n));
        }
      })
    })
    .collect();
  for sender in senders {
    sender.join().expect("sender thread panicked");
  }

  let values = probe.values();
  assert_eq!(values.len(), 2000);
  for source in 0..4 {
    let seen: Vec<_> = values.iter().filter(|(s, _)| *s == source).map(|(_, n)| *n).collect();
    assert_eq!(seen, (0..500).collect::<Vec<_>>());
  }
}

#[test]
fn timer_on_virtual_time_through_zip() {
  let scheduler = TestScheduler::new();
  let probe = TestSubscriber::new(Demand::UNLIMITED);
  publisher::timer(scheduler.clone(), Duration::from_millis(10))
    .zip(publisher::sequence(vec!["a", "b"]))
    .subscribe(probe.clone());

  scheduler.advance_by(Duration::from_millis(100));
  assert_eq!(probe.values(), vec![(0, "a"), (1, "b")]);
  assert_eq!(probe.completion(), Some(Completion::Finished));
  assert!(scheduler.is_empty());
}

#[test]
fn timer_on_the_thread_pool() {
  let scheduler = ThreadPoolScheduler::shared().expect("thread pool");
  let (tx, rx) = mpsc::channel();
  let tx = Mutex::new(tx);
  let token = publisher::timer(scheduler, Duration::from_millis(5)).sink_value(move |tick| {
    let _ = tx.lock().send(tick);
  });

  let ticks: Vec<usize> =
    (0..3).map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("tick")).collect();
  assert_eq!(ticks, vec![0, 1, 2]);
  drop(token);
}

#[tokio::test]
async fn stream_bridge_pulls_from_a_subject_relay() {
  let relay = PassthroughSubject::<i32, Never>::new();
  let seen = Arc::new(Mutex::new(vec![]));
  let c_seen = seen.clone();
  let _token = relay.sink_value(move |v| c_seen.lock().push(v));
  publisher::sequence(1..=3).subscribe(relay.clone());

  let merged = publisher::sequence(1..=3).merge(publisher::just(9));
  let collected: Vec<_> = merged.into_stream().collect().await;
  assert_eq!(collected, vec![Ok(1), Ok(2), Ok(3), Ok(9)]);
  assert_eq!(*seen.lock(), vec![1, 2, 3]);
  assert!(relay.is_completed());
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_of_thread_pool_ticks() {
  let scheduler = ThreadPoolScheduler::shared().expect("thread pool");
  let ticks: Vec<_> = publisher::timer(scheduler, Duration::from_millis(2))
    .into_stream()
    .take(3)
    .filter_map(|tick| async move { tick.ok() })
    .collect()
    .await;
  assert_eq!(ticks.len(), 3);
  assert!(ticks.windows(2).all(|w| w[0] < w[1]));
}

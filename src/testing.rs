//! Fixtures for exercising publishers in tests.
//!
//! [`TestSubscriber`] records every signal it receives and exposes its
//! subscription, so a test drives demand by hand:
//!
//! ```rust
//! use rxflow::{prelude::*, testing::TestSubscriber};
//!
//! let probe = TestSubscriber::new(Demand::max(1));
//! publisher::sequence(1..=3).subscribe(probe.clone());
//! assert_eq!(probe.values(), vec![1]);
//!
//! probe.request(Demand::UNLIMITED);
//! assert_eq!(probe.values(), vec![1, 2, 3]);
//! assert!(probe.completion().is_some_and(|c| c.is_finished()));
//! ```

use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  subscriber::{Completion, Lifecycle, Subscriber},
  subscription::AnySubscription,
};

/// One recorded signal.
#[derive(Clone, PartialEq, Eq)]
pub enum Event<I, E> {
  Subscription,
  Value(I),
  Completion(Completion<E>),
}

impl<I: fmt::Debug, E: fmt::Debug> fmt::Debug for Event<I, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Event::Subscription => f.write_str("subscription"),
      Event::Value(v) => write!(f, "value({v:?})"),
      Event::Completion(Completion::Finished) => f.write_str("finished"),
      Event::Completion(Completion::Failure(e)) => write!(f, "failure({e:?})"),
    }
  }
}

type Hook<I, E> = Arc<dyn Fn(&TestSubscriber<I, E>, &I) + Send + Sync>;

/// A recording subscriber. Clones share the same record.
///
/// On subscription it requests the initial demand given to
/// [`TestSubscriber::new`]; every value returns the demand configured with
/// [`TestSubscriber::with_response`] (none by default).
pub struct TestSubscriber<I, E> {
  shared: Arc<Mutex<Record<I, E>>>,
}

struct Record<I, E> {
  initial: Demand,
  response: Demand,
  subscription: Option<AnySubscription>,
  lifecycle: Lifecycle,
  events: Vec<Event<I, E>>,
  hook: Option<Hook<I, E>>,
}

impl<I, E> Clone for TestSubscriber<I, E> {
  fn clone(&self) -> Self { TestSubscriber { shared: self.shared.clone() } }
}

impl<I, E> TestSubscriber<I, E> {
  pub fn new(initial: Demand) -> Self {
    TestSubscriber {
      shared: Arc::new(Mutex::new(Record {
        initial,
        response: Demand::NONE,
        subscription: None,
        lifecycle: Lifecycle::default(),
        events: vec![],
        hook: None,
      })),
    }
  }

  /// Demand returned from every `receive`.
  pub fn with_response(self, response: Demand) -> Self {
    self.shared.lock().response = response;
    self
  }

  /// Runs `hook` on each value just before it is recorded, outside the
  /// record lock, so the hook may request or cancel.
  pub fn on_value<F>(self, hook: F) -> Self
  where
    F: Fn(&TestSubscriber<I, E>, &I) + Send + Sync + 'static,
  {
    self.shared.lock().hook = Some(Arc::new(hook));
    self
  }

  pub fn is_subscribed(&self) -> bool { self.shared.lock().subscription.is_some() }

  pub fn request(&self, demand: Demand) {
    let subscription = self.shared.lock().subscription.clone();
    if let Some(subscription) = subscription {
      subscription.request(demand);
    }
  }

  pub fn cancel(&self) {
    let subscription = self.shared.lock().subscription.clone();
    if let Some(subscription) = subscription {
      subscription.cancel();
    }
  }
}

impl<I: Clone, E: Clone> TestSubscriber<I, E> {
  pub fn events(&self) -> Vec<Event<I, E>> { self.shared.lock().events.clone() }

  pub fn values(&self) -> Vec<I> {
    let record = self.shared.lock();
    record
      .events
      .iter()
      .filter_map(|event| match event {
        Event::Value(v) => Some(v.clone()),
        _ => None,
      })
      .collect()
  }

  pub fn completion(&self) -> Option<Completion<E>> {
    let record = self.shared.lock();
    record.events.iter().find_map(|event| match event {
      Event::Completion(c) => Some(c.clone()),
      _ => None,
    })
  }
}

impl<I: Send, E: Send> Subscriber<I, E> for TestSubscriber<I, E> {
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    let initial = {
      let mut record = self.shared.lock();
      if !record.lifecycle.subscribe() {
        drop(record);
        subscription.cancel();
        return;
      }
      record.subscription = Some(subscription.clone());
      record.events.push(Event::Subscription);
      record.initial
    };
    if initial.has_demand() {
      subscription.request(initial);
    }
  }

  fn receive(&mut self, input: I) -> Demand {
    let (hook, response) = {
      let record = self.shared.lock();
      record.lifecycle.value("test subscriber");
      (record.hook.clone(), record.response)
    };
    if let Some(hook) = hook {
      hook(self, &input);
    }
    self.shared.lock().events.push(Event::Value(input));
    response
  }

  fn receive_completion(&mut self, completion: Completion<E>) {
    let mut record = self.shared.lock();
    record.lifecycle.complete("test subscriber");
    record.events.push(Event::Completion(completion));
  }
}

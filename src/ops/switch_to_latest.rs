//! Flattens a publisher of publishers by following only the most recent
//! inner publisher.
//!
//! Every new inner publisher cancels the previous one before it is
//! subscribed, and values of a cancelled inner are never observed, even if
//! they were already on their way. Downstream demand is forwarded to the
//! active inner; a new inner starts with whatever demand is still
//! outstanding.

use std::{collections::VecDeque, sync::Arc};

use crate::{
  demand::Demand,
  outlet::{Drain, Outlet, Requests, Teardown},
  publisher::Publisher,
  subscriber::{Completion, Lifecycle, Subscriber},
  subscription::AnySubscription,
};

/// See [`PublisherExt::switch_to_latest`](super::PublisherExt::switch_to_latest).
#[derive(Clone)]
pub struct SwitchToLatest<P> {
  source: P,
}

impl<P> SwitchToLatest<P> {
  pub fn new(source: P) -> Self { SwitchToLatest { source } }
}

struct Switching<T, E> {
  outer: Option<AnySubscription>,
  outer_finished: bool,
  generation: usize,
  active: Option<AnySubscription>,
  active_finished: bool,
  forward: Demand,
  ready: VecDeque<T>,
  failure: Option<E>,
}

impl<T, E> Switching<T, E> {
  fn fail(&mut self, failure: E) {
    if self.failure.is_none() {
      self.failure = Some(failure);
    }
  }
}

impl<T: Send + 'static, E: Send + 'static> Drain for Switching<T, E> {
  type Output = T;
  type Failure = E;

  fn backlog(&self) -> usize { self.ready.len() }

  fn poll_completion(&mut self) -> Option<Completion<E>> {
    if let Some(e) = self.failure.take() {
      self.ready.clear();
      return Some(Completion::Failure(e));
    }
    let done = self.outer_finished && self.active_finished && self.ready.is_empty();
    done.then_some(Completion::Finished)
  }

  fn poll_value(&mut self) -> Option<T> { self.ready.pop_front() }

  fn on_request(&mut self, demand: Demand) { self.forward += demand; }

  fn take_requests(&mut self) -> Requests {
    let mut requests = Requests::new();
    if let (Some(active), true) = (&self.active, self.forward.has_demand()) {
      requests.push((active.clone(), self.forward));
      self.forward = Demand::NONE;
    }
    requests
  }

  fn release(&mut self, teardown: &mut Teardown) {
    teardown.link(self.outer.take());
    teardown.link(self.active.take());
  }
}

impl<P> Publisher for SwitchToLatest<P>
where
  P: Publisher,
  P::Output: Publisher<Failure = P::Failure>,
  <P::Output as Publisher>::Output: Send + 'static,
  P::Failure: Send + 'static,
{
  type Output = <P::Output as Publisher>::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Self::Output, P::Failure> + 'static,
  {
    let outlet = Arc::new(Outlet::new(Switching {
      outer: None,
      outer_finished: false,
      generation: 0,
      active: None,
      active_finished: true,
      forward: Demand::NONE,
      ready: VecDeque::new(),
      failure: None,
    }));
    outlet.attach(subscriber, outlet.clone());
    if !outlet.is_done() {
      self.source.subscribe(OuterSubscriber { outlet, lifecycle: Lifecycle::default() });
    }
  }
}

struct OuterSubscriber<T, E, S> {
  outlet: Arc<Outlet<Switching<T, E>, S>>,
  lifecycle: Lifecycle,
}

impl<Q, T, E, S> Subscriber<Q, E> for OuterSubscriber<T, E, S>
where
  Q: Publisher<Output = T, Failure = E>,
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E> + 'static,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    if !self.lifecycle.subscribe() {
      subscription.cancel();
      return;
    }
    let open = self.outlet.update(|st, flow| {
      if !flow.closed {
        st.outer = Some(subscription.clone());
      }
      !flow.closed
    });
    if open {
      subscription.request(Demand::UNLIMITED);
    } else {
      subscription.cancel();
    }
  }

  fn receive(&mut self, inner: Q) -> Demand {
    self.lifecycle.value("switch_to_latest upstream");
    let switched = self.outlet.update(|st, flow| {
      if flow.closed {
        return None;
      }
      let stale = st.ready.len();
      st.ready.clear();
      st.generation += 1;
      st.active_finished = false;
      st.forward = Demand::NONE;
      Some((st.generation, st.active.take(), flow.spare + stale))
    });
    let Some((generation, previous, initial)) = switched else {
      return Demand::NONE;
    };
    if let Some(previous) = previous {
      tracing::trace!(generation, "switching to a newer inner publisher");
      previous.cancel();
    }
    inner.subscribe(InnerSubscriber {
      outlet: self.outlet.clone(),
      generation,
      initial,
      lifecycle: Lifecycle::default(),
    });
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<E>) {
    self.lifecycle.complete("switch_to_latest upstream");
    self.outlet.update(|st, flow| {
      if flow.closed {
        return;
      }
      st.outer = None;
      match completion {
        Completion::Finished => st.outer_finished = true,
        Completion::Failure(e) => st.fail(e),
      }
    });
    self.outlet.drain();
  }
}

struct InnerSubscriber<T, E, S> {
  outlet: Arc<Outlet<Switching<T, E>, S>>,
  generation: usize,
  initial: Demand,
  lifecycle: Lifecycle,
}

impl<T, E, S> Subscriber<T, E> for InnerSubscriber<T, E, S>
where
  T: Send + 'static,
  E: Send + 'static,
  S: Subscriber<T, E> + 'static,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    if !self.lifecycle.subscribe() {
      subscription.cancel();
      return;
    }
    let generation = self.generation;
    let current = self.outlet.update(|st, flow| {
      let current = !flow.closed && st.generation == generation;
      if current {
        st.active = Some(subscription.clone());
      }
      current
    });
    if !current {
      subscription.cancel();
      return;
    }
    if self.initial.has_demand() {
      subscription.request(self.initial);
    }
    // Demand that arrived before the link was stored.
    self.outlet.drain();
  }

  fn receive(&mut self, input: T) -> Demand {
    self.lifecycle.value("switch_to_latest inner");
    let generation = self.generation;
    let current = self.outlet.update(|st, flow| {
      let current = !flow.closed && st.generation == generation;
      if current {
        st.ready.push_back(input);
      }
      current
    });
    if current {
      self.outlet.drain();
    }
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<E>) {
    self.lifecycle.complete("switch_to_latest inner");
    let generation = self.generation;
    self.outlet.update(|st, flow| {
      if flow.closed || st.generation != generation {
        return;
      }
      st.active = None;
      match completion {
        Completion::Finished => st.active_finished = true,
        Completion::Failure(e) => st.fail(e),
      }
    });
    self.outlet.drain();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{publisher, subject::PassthroughSubject, testing::TestSubscriber};

  type Inner = PassthroughSubject<i32, ()>;

  #[test]
  fn newer_inner_cancels_the_older() {
    let outer = PassthroughSubject::<Inner, ()>::new();
    let (s1, s2) = (Inner::new(), Inner::new());
    let probe = TestSubscriber::new(Demand::UNLIMITED);
    SwitchToLatest::new(outer.clone()).subscribe(probe.clone());

    outer.send(s1.clone());
    s1.send(1);
    outer.send(s2.clone());
    assert_eq!(s1.subscriber_count(), 0);
    s1.send(2);
    s2.send(3);
    assert_eq!(probe.values(), vec![1, 3]);
  }

  #[test]
  fn demand_follows_the_active_inner() {
    let outer = PassthroughSubject::<publisher::Sequence<Vec<i32>>, _>::new();
    let probe = TestSubscriber::new(Demand::NONE);
    SwitchToLatest::new(outer.clone()).subscribe(probe.clone());

    outer.send(publisher::sequence(vec![1, 2, 3]));
    assert!(probe.values().is_empty());
    probe.request(Demand::max(2));
    assert_eq!(probe.values(), vec![1, 2]);

    outer.send(publisher::sequence(vec![7, 8]));
    assert_eq!(probe.values(), vec![1, 2]);
    probe.request(Demand::max(1));
    assert_eq!(probe.values(), vec![1, 2, 7]);
    assert_eq!(probe.completion(), None::<Completion<crate::error::Never>>);
  }

  #[test]
  fn outstanding_demand_carries_over() {
    let outer = PassthroughSubject::<Inner, ()>::new();
    let (s1, s2) = (Inner::new(), Inner::new());
    let probe = TestSubscriber::new(Demand::max(3));
    SwitchToLatest::new(outer.clone()).subscribe(probe.clone());

    outer.send(s1.clone());
    s1.send(1);
    outer.send(s2.clone());
    for v in 10..15 {
      s2.send(v);
    }
    assert_eq!(probe.values(), vec![1, 10, 11]);
  }

  #[test]
  fn finishes_after_outer_and_active_inner() {
    let outer = PassthroughSubject::<Inner, ()>::new();
    let inner = Inner::new();
    let probe = TestSubscriber::new(Demand::UNLIMITED);
    SwitchToLatest::new(outer.clone()).subscribe(probe.clone());
    outer.send(inner.clone());
    outer.send_completion(Completion::Finished);
    assert_eq!(probe.completion(), None);
    inner.send_completion(Completion::Finished);
    assert_eq!(probe.completion(), Some(Completion::Finished));

    let probe = TestSubscriber::<i32, ()>::new(Demand::UNLIMITED);
    SwitchToLatest::new(publisher::Empty::<Inner, ()>::new()).subscribe(probe.clone());
    assert_eq!(probe.completion(), Some(Completion::Finished));
  }

  #[test]
  fn inner_failure_cancels_the_outer() {
    let outer = PassthroughSubject::<PassthroughSubject<i32, &str>, &str>::new();
    let inner = PassthroughSubject::new();
    let probe = TestSubscriber::new(Demand::UNLIMITED);
    SwitchToLatest::new(outer.clone()).subscribe(probe.clone());
    outer.send(inner.clone());
    inner.send(1);
    inner.send_completion(Completion::Failure("boom"));
    assert_eq!(probe.values(), vec![1]);
    assert_eq!(probe.completion(), Some(Completion::Failure("boom")));
    assert_eq!(outer.subscriber_count(), 0);
  }

  #[test]
  fn cancel_reaches_the_outer_and_the_active_inner() {
    let outer = PassthroughSubject::<Inner, ()>::new();
    let (s1, s2) = (Inner::new(), Inner::new());
    let probe = TestSubscriber::new(Demand::UNLIMITED);
    SwitchToLatest::new(outer.clone()).subscribe(probe.clone());
    outer.send(s1.clone());
    outer.send(s2.clone());
    assert_eq!((s1.subscriber_count(), s2.subscriber_count()), (0, 1));

    probe.cancel();
    assert_eq!(outer.subscriber_count(), 0);
    assert_eq!(s2.subscriber_count(), 0);
    s2.send(1);
    assert!(probe.values().is_empty());
  }
}

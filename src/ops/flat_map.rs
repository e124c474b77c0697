//! FlatMap: maps every upstream value to a publisher and interleaves the
//! values of all those inner publishers.
//!
//! At most `max_publishers` inner subscriptions are live at a time: the
//! outer publisher is asked for that many values on subscription, and for
//! one more whenever an inner subscription is done.
//!
//! While the downstream has spare demand, every inner subscription is asked
//! for that much. Once downstream demand runs out, an inner with nothing
//! queued may still have one value outstanding; that value waits until the
//! downstream asks again, and the inner is not asked for more before then.

use std::{collections::VecDeque, sync::Arc};

use crate::{
  demand::Demand,
  error::protocol_violation,
  outlet::{Drain, Outlet, Requests, Teardown},
  publisher::Publisher,
  subscriber::{Completion, Lifecycle, Subscriber},
  subscription::{AnySubscription, Registry},
};

/// See [`PublisherExt::flat_map`](super::PublisherExt::flat_map).
pub struct FlatMap<P, F> {
  source: P,
  max_publishers: Demand,
  transform: Arc<F>,
}

impl<P, F> FlatMap<P, F> {
  pub fn new(source: P, max_publishers: Demand, transform: F) -> Self {
    FlatMap { source, max_publishers, transform: Arc::new(transform) }
  }
}

impl<P: Clone, F> Clone for FlatMap<P, F> {
  fn clone(&self) -> Self {
    FlatMap {
      source: self.source.clone(),
      max_publishers: self.max_publishers,
      transform: self.transform.clone(),
    }
  }
}

#[derive(Default)]
struct Inner {
  link: Option<AnySubscription>,
  /// Outstanding demand of this inner subscription.
  requested: Demand,
  /// Values of this inner still in the ready queue.
  queued: usize,
  finished: bool,
}

/// How much an inner subscription should have outstanding.
fn wanted(spare: Demand, queued: usize) -> Demand {
  if spare.has_demand() {
    spare
  } else if queued == 0 {
    Demand::max(1)
  } else {
    Demand::NONE
  }
}

struct Flattening<T, E> {
  outer: Option<AnySubscription>,
  outer_finished: bool,
  bounded: bool,
  outer_refill: usize,
  /// Mirrors the downstream demand the outlet holds.
  demand: Demand,
  inners: Registry<Inner>,
  ready: VecDeque<(usize, T)>,
  failure: Option<E>,
}

impl<T, E> Flattening<T, E> {
  fn fail(&mut self, failure: E) {
    if self.failure.is_none() {
      self.failure = Some(failure);
    }
  }

  fn spare(&self) -> Demand { self.demand - self.ready.len() }

  fn inner_done(&mut self, id: usize) {
    self.inners.remove(id);
    if self.bounded {
      self.outer_refill += 1;
    }
  }
}

impl<T: Send + 'static, E: Send + 'static> Drain for Flattening<T, E> {
  type Output = T;
  type Failure = E;

  fn backlog(&self) -> usize { self.ready.len() }

  fn poll_completion(&mut self) -> Option<Completion<E>> {
    if let Some(e) = self.failure.take() {
      self.ready.clear();
      return Some(Completion::Failure(e));
    }
    let done = self.outer_finished && self.inners.is_empty() && self.ready.is_empty();
    done.then_some(Completion::Finished)
  }

  fn poll_value(&mut self) -> Option<T> {
    let (id, value) = self.ready.pop_front()?;
    self.demand.consume_one();
    if let Some(inner) = self.inners.get_mut(id) {
      inner.queued -= 1;
      if inner.finished && inner.queued == 0 {
        self.inner_done(id);
      }
    }
    Some(value)
  }

  fn on_request(&mut self, demand: Demand) { self.demand += demand; }

  fn take_requests(&mut self) -> Requests {
    let spare = self.spare();
    let mut requests = Requests::new();
    for inner in self.inners.iter_mut() {
      let Some(link) = &inner.link else {
        continue;
      };
      let target = wanted(spare, inner.queued);
      if inner.requested < target {
        requests.push((link.clone(), target - inner.requested));
        inner.requested = target;
      }
    }
    if self.outer_refill > 0 {
      if let Some(outer) = &self.outer {
        requests.push((outer.clone(), Demand::max(self.outer_refill)));
      }
      self.outer_refill = 0;
    }
    requests
  }

  fn release(&mut self, teardown: &mut Teardown) {
    teardown.link(self.outer.take());
    teardown.links(self.inners.drain().map(|inner| inner.link));
  }
}

impl<P, F, Q> Publisher for FlatMap<P, F>
where
  P: Publisher<Failure = Q::Failure>,
  F: Fn(P::Output) -> Q + Send + Sync + 'static,
  Q: Publisher,
  P::Output: Send + 'static,
  Q::Output: Send + 'static,
  Q::Failure: Send + 'static,
{
  type Output = Q::Output;
  type Failure = Q::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Q::Output, Q::Failure> + 'static,
  {
    let outlet = Arc::new(Outlet::new(Flattening {
      outer: None,
      outer_finished: false,
      bounded: !self.max_publishers.is_unlimited(),
      outer_refill: 0,
      demand: Demand::NONE,
      inners: Registry::new(),
      ready: VecDeque::new(),
      failure: None,
    }));
    outlet.attach(subscriber, outlet.clone());
    if outlet.is_done() {
      return;
    }
    self.source.subscribe(OuterSubscriber {
      outlet,
      transform: self.transform.clone(),
      max_publishers: self.max_publishers,
      lifecycle: Lifecycle::default(),
    });
  }
}

struct OuterSubscriber<F, T, E, S> {
  outlet: Arc<Outlet<Flattening<T, E>, S>>,
  transform: Arc<F>,
  max_publishers: Demand,
  lifecycle: Lifecycle,
}

impl<V, F, Q, T, E, S> Subscriber<V, E> for OuterSubscriber<F, T, E, S>
where
  V: Send,
  F: Fn(V) -> Q + Send + Sync,
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
    if !open {
      subscription.cancel();
    } else if self.max_publishers.has_demand() {
      subscription.request(self.max_publishers);
    }
  }

  fn receive(&mut self, input: V) -> Demand {
    self.lifecycle.value("flat_map upstream");
    let inner = (self.transform)(input);
    let id = self.outlet.update(|st, flow| (!flow.closed).then(|| st.inners.add(Inner::default())));
    if let Some(id) = id {
      tracing::trace!(inner = id, "flat_map subscribing inner publisher");
      inner.subscribe(InnerSubscriber {
        outlet: self.outlet.clone(),
        id,
        lifecycle: Lifecycle::default(),
      });
    }
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<E>) {
    self.lifecycle.complete("flat_map upstream");
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
  outlet: Arc<Outlet<Flattening<T, E>, S>>,
  id: usize,
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
    let id = self.id;
    let initial = self.outlet.update(|st, flow| {
      let spare = st.spare();
      match st.inners.get_mut(id) {
        Some(inner) if !flow.closed => {
          inner.link = Some(subscription.clone());
          inner.requested = wanted(spare, inner.queued);
          Some(inner.requested)
        }
        _ => None,
      }
    });
    match initial {
      Some(demand) => subscription.request(demand),
      None => subscription.cancel(),
    }
  }

  fn receive(&mut self, input: T) -> Demand {
    self.lifecycle.value("flat_map inner");
    let id = self.id;
    let overran = self.outlet.update(|st, flow| {
      let Some(inner) = st.inners.get_mut(id).filter(|_| !flow.closed) else {
        return false;
      };
      if !inner.requested.consume_one() {
        return true;
      }
      inner.queued += 1;
      st.ready.push_back((id, input));
      false
    });
    if overran {
      protocol_violation(format_args!("flat_map inner publisher sent more than requested"));
    }
    self.outlet.drain();
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<E>) {
    self.lifecycle.complete("flat_map inner");
    let id = self.id;
    self.outlet.update(|st, flow| {
      if flow.closed {
        return;
      }
      match completion {
        Completion::Failure(e) => {
          st.inners.remove(id);
          st.fail(e);
        }
        Completion::Finished => {
          let Some(inner) = st.inners.get_mut(id) else {
            return;
          };
          inner.link = None;
          inner.finished = true;
          inner.requested = Demand::NONE;
          if inner.queued == 0 {
            st.inner_done(id);
          }
        }
      }
    });
    self.outlet.drain();
  }
}

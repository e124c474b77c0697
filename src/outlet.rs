//! The serialized, demand-gated delivery loop behind every publisher in the
//! crate.
//!
//! An [`Outlet`] owns an operator's mutable state together with its single
//! downstream subscriber and outstanding demand, all behind one
//! `parking_lot::Mutex`. Producers (upstream callbacks, subject sends,
//! downstream requests) mutate the state with [`Outlet::update`] and then
//! call [`Outlet::drain`]. Whichever thread finds the loop idle becomes the
//! drainer and delivers everything that is deliverable; every other caller
//! returns immediately and leaves its work to the active drainer.
//!
//! The lock is never held while calling into a subscriber or a subscription.
//! The downstream is checked out of the core for the duration of a
//! `receive`, which makes reentrant `request`/`cancel` from inside the
//! callback safe: they only touch the core and find the loop busy.

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::{
  demand::Demand,
  subscriber::{Completion, Subscriber},
  subscription::{AnyCancellable, AnySubscription, Cancellable, Subscription},
};

/// Upstream requests to issue once the core lock is released.
pub(crate) type Requests = SmallVec<[(AnySubscription, Demand); 2]>;

/// Upstream links and tokens to cancel once the core lock is released.
#[derive(Default)]
pub(crate) struct Teardown {
  links: SmallVec<[AnySubscription; 4]>,
  tokens: SmallVec<[AnyCancellable; 1]>,
}

impl Teardown {
  pub(crate) fn link(&mut self, link: Option<AnySubscription>) {
    if let Some(link) = link {
      self.links.push(link);
    }
  }

  pub(crate) fn links(&mut self, links: impl IntoIterator<Item = Option<AnySubscription>>) {
    self.links.extend(links.into_iter().flatten());
  }

  pub(crate) fn token(&mut self, token: Option<AnyCancellable>) {
    if let Some(token) = token {
      self.tokens.push(token);
    }
  }

  fn run(self) {
    for link in self.links {
      link.cancel();
    }
    drop(self.tokens);
  }
}

/// Operator state driven by an [`Outlet`].
pub(crate) trait Drain: Send + 'static {
  type Output;
  type Failure;

  /// Values already admitted for delivery that count against demand.
  fn backlog(&self) -> usize { 0 }

  /// The terminal signal, once it is due. Checked before every value.
  fn poll_completion(&mut self) -> Option<Completion<Self::Failure>>;

  /// The next deliverable value. Only called while demand is positive.
  fn poll_value(&mut self) -> Option<Self::Output>;

  /// Sees every demand increase: downstream requests and the demand
  /// returned from `receive`.
  fn on_request(&mut self, _demand: Demand) {}

  /// Upstream requests accumulated by the state since the last call.
  fn take_requests(&mut self) -> Requests { Requests::new() }

  /// Hands every upstream resource over for cancellation. Called once, on
  /// completion or on cancel.
  fn release(&mut self, _teardown: &mut Teardown) {}
}

/// Snapshot passed to [`Outlet::update`] closures.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Flow {
  /// Downstream demand not yet covered by the backlog.
  pub(crate) spare: Demand,
  /// The downstream was cancelled or has been completed.
  pub(crate) closed: bool,
}

pub(crate) struct Outlet<St, S> {
  core: Mutex<Core<St, S>>,
}

struct Core<St, S> {
  state: St,
  demand: Demand,
  downstream: Option<S>,
  draining: bool,
  done: bool,
}

impl<St, S> Outlet<St, S>
where
  St: Drain,
  S: Subscriber<St::Output, St::Failure>,
{
  /// The outlet starts in the handshake phase: nothing is delivered until
  /// [`Outlet::attach`] handed the subscription to the downstream.
  pub(crate) fn new(state: St) -> Self {
    Outlet {
      core: Mutex::new(Core {
        state,
        demand: Demand::NONE,
        downstream: None,
        draining: true,
        done: false,
      }),
    }
  }

  /// Gives `subscription` to the downstream, then starts delivering.
  pub(crate) fn attach(&self, mut downstream: S, subscription: AnySubscription) {
    downstream.receive_subscription(subscription);
    let mut core = self.core.lock();
    core.draining = false;
    if core.done {
      drop(core);
      drop(downstream);
      return;
    }
    core.downstream = Some(downstream);
    drop(core);
    self.drain();
  }

  pub(crate) fn update<R>(&self, f: impl FnOnce(&mut St, Flow) -> R) -> R {
    let mut core = self.core.lock();
    let flow = Flow { spare: core.demand - core.state.backlog(), closed: core.done };
    f(&mut core.state, flow)
  }

  pub(crate) fn request(&self, demand: Demand) {
    {
      let mut core = self.core.lock();
      if core.done {
        return;
      }
      core.demand += demand;
      core.state.on_request(demand);
    }
    self.drain();
  }

  pub(crate) fn is_done(&self) -> bool { self.core.lock().done }

  /// Cancels the downstream link. Returns `false` when it was already
  /// cancelled or completed.
  pub(crate) fn terminate(&self) -> bool {
    let mut teardown = Teardown::default();
    let downstream = {
      let mut core = self.core.lock();
      if core.done {
        return false;
      }
      core.done = true;
      core.state.release(&mut teardown);
      core.downstream.take()
    };
    teardown.run();
    drop(downstream);
    true
  }

  /// Delivers everything deliverable, unless another thread already does.
  ///
  /// Upstream requests are issued while this thread still owns the loop, so
  /// a synchronous upstream answering them only enqueues; its values are
  /// picked up by the next turn instead of recursing.
  pub(crate) fn drain(&self) {
    let mut core = self.core.lock();
    if core.draining || core.done {
      return;
    }
    core.draining = true;
    loop {
      if let Some(completion) = core.state.poll_completion() {
        core.done = true;
        core.draining = false;
        let mut teardown = Teardown::default();
        core.state.release(&mut teardown);
        let downstream = core.downstream.take();
        drop(core);
        teardown.run();
        if let Some(mut downstream) = downstream {
          downstream.receive_completion(completion);
        }
        return;
      }

      let deliverable = core.demand.has_demand() && core.downstream.is_some();
      if let Some(value) = deliverable.then(|| core.state.poll_value()).flatten() {
        core.demand.consume_one();
        let Some(mut downstream) = core.downstream.take() else {
          break;
        };
        drop(core);
        let more = downstream.receive(value);
        core = self.core.lock();
        if core.done {
          core.draining = false;
          drop(core);
          drop(downstream);
          return;
        }
        core.downstream = Some(downstream);
        core.demand += more;
        core.state.on_request(more);
        continue;
      }

      let requests = core.state.take_requests();
      if requests.is_empty() {
        break;
      }
      drop(core);
      for (link, demand) in requests {
        link.request(demand);
      }
      core = self.core.lock();
      if core.done {
        core.draining = false;
        return;
      }
    }
    core.draining = false;
  }
}

/// An `Arc<Outlet>` is the subscription handed to its own downstream.
impl<St, S> Cancellable for Outlet<St, S>
where
  St: Drain,
  S: Subscriber<St::Output, St::Failure>,
{
  fn cancel(&self) {
    if self.terminate() {
      tracing::trace!("subscription cancelled");
    }
  }
}

impl<St, S> Subscription for Outlet<St, S>
where
  St: Drain,
  S: Subscriber<St::Output, St::Failure>,
{
  fn request(&self, demand: Demand) { Outlet::request(self, demand) }
}

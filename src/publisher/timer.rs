use std::{collections::VecDeque, sync::Arc, time::Duration};

use super::Publisher;
use crate::{
  error::Never,
  outlet::{Drain, Outlet, Teardown},
  scheduler::Scheduler,
  subscriber::{Completion, Subscriber},
  subscription::AnyCancellable,
};

/// Emits an increasing tick count every `period` on a scheduler.
///
/// Ticks that fire while the subscriber has no outstanding demand are
/// dropped; the count still advances. Never completes.
#[derive(Clone)]
pub struct Timer<Sch> {
  scheduler: Sch,
  period: Duration,
}

impl<Sch> Timer<Sch> {
  pub fn new(scheduler: Sch, period: Duration) -> Self { Timer { scheduler, period } }
}

impl<Sch: Scheduler> Publisher for Timer<Sch> {
  type Output = usize;
  type Failure = Never;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<usize, Never> + 'static,
  {
    let outlet = Arc::new(Outlet::new(Ticks::default()));
    outlet.attach(subscriber, outlet.clone());
    if outlet.is_done() {
      return;
    }

    let c_outlet = outlet.clone();
    let mut count = 0;
    let token = self.scheduler.schedule_interval(self.period, self.period, move || {
      let tick = count;
      count += 1;
      let admitted = c_outlet.update(|st, flow| {
        let admit = !flow.closed && flow.spare.has_demand();
        if admit {
          st.ready.push_back(tick);
        }
        admit
      });
      if admitted {
        c_outlet.drain();
      } else {
        tracing::trace!(tick, "timer tick dropped without demand");
      }
    });

    let stale = outlet.update(|st, flow| {
      if flow.closed {
        Some(token)
      } else {
        st.token = Some(token);
        None
      }
    });
    drop(stale);
  }
}

#[derive(Default)]
struct Ticks {
  ready: VecDeque<usize>,
  token: Option<AnyCancellable>,
}

impl Drain for Ticks {
  type Output = usize;
  type Failure = Never;

  fn backlog(&self) -> usize { self.ready.len() }

  fn poll_completion(&mut self) -> Option<Completion<Never>> { None }

  fn poll_value(&mut self) -> Option<usize> { self.ready.pop_front() }

  fn release(&mut self, teardown: &mut Teardown) {
    teardown.token(self.token.take());
    self.ready.clear();
  }
}

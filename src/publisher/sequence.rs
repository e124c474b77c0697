use std::sync::Arc;

use super::Publisher;
use crate::{
  error::Never,
  outlet::{Drain, Outlet},
  subscriber::{Completion, Subscriber},
};

/// Emits the items of an iterable one per unit of demand, then finishes.
///
/// Each subscription iterates its own clone of the iterable. Requests made
/// from inside `receive` are served by the running delivery loop, so a
/// subscriber requesting one value at a time never grows the stack.
#[derive(Debug, Clone)]
pub struct Sequence<I> {
  iter: I,
}

impl<I> Sequence<I> {
  pub fn new(iter: I) -> Self { Sequence { iter } }
}

impl<I> Publisher for Sequence<I>
where
  I: IntoIterator + Clone,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
{
  type Output = I::Item;
  type Failure = Never;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<I::Item, Never> + 'static,
  {
    let state = Iterating { iter: self.iter.clone().into_iter(), peeked: None };
    let outlet = Arc::new(Outlet::new(state));
    outlet.attach(subscriber, outlet.clone());
  }
}

struct Iterating<It: Iterator> {
  iter: It,
  peeked: Option<It::Item>,
}

impl<It> Drain for Iterating<It>
where
  It: Iterator + Send + 'static,
  It::Item: Send + 'static,
{
  type Output = It::Item;
  type Failure = Never;

  // Look one item ahead so an exhausted iterator finishes without demand.
  fn poll_completion(&mut self) -> Option<Completion<Never>> {
    if self.peeked.is_none() {
      self.peeked = self.iter.next();
    }
    self.peeked.is_none().then_some(Completion::Finished)
  }

  fn poll_value(&mut self) -> Option<It::Item> { self.peeked.take() }
}

use std::sync::Arc;

use super::Publisher;
use crate::{
  error::Never,
  outlet::{Drain, Outlet},
  subscriber::{Completion, Subscriber},
};

/// Emits a single value once the subscriber asks for it, then finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Just<T> {
  value: T,
}

impl<T> Just<T> {
  pub fn new(value: T) -> Self { Just { value } }
}

impl<T> Publisher for Just<T>
where
  T: Clone + Send + 'static,
{
  type Output = T;
  type Failure = Never;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<T, Never> + 'static,
  {
    let outlet = Arc::new(Outlet::new(Once(Some(self.value.clone()))));
    outlet.attach(subscriber, outlet.clone());
  }
}

struct Once<T>(Option<T>);

impl<T: Send + 'static> Drain for Once<T> {
  type Output = T;
  type Failure = Never;

  fn poll_completion(&mut self) -> Option<Completion<Never>> {
    self.0.is_none().then_some(Completion::Finished)
  }

  fn poll_value(&mut self) -> Option<T> { self.0.take() }
}

use std::sync::Arc;

use parking_lot::Mutex;

use super::Cancellable;

/// A type-erased cancellation token that cancels when dropped.
///
/// Returned by [`sink`](crate::ops::PublisherExt::sink) and by repeating
/// scheduler timers. Keep it alive for as long as the work should run.
///
/// **Attention:** if the returned value is not bound to a variable it is
/// dropped, and therefore cancelled, immediately.
#[must_use]
pub struct AnyCancellable {
  inner: Option<Arc<dyn Cancellable>>,
}

impl AnyCancellable {
  pub fn new<C: Cancellable + 'static>(cancellable: C) -> Self {
    AnyCancellable { inner: Some(Arc::new(cancellable)) }
  }

  pub fn from_arc(cancellable: Arc<dyn Cancellable>) -> Self {
    AnyCancellable { inner: Some(cancellable) }
  }

  /// Wraps a one-shot cancel action.
  pub fn from_fn<F>(action: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    Self::new(CancelAction(Mutex::new(Some(Box::new(action)))))
  }

  /// Cancels now. Later cancels and the drop become no-ops.
  pub fn cancel(&mut self) {
    if let Some(inner) = self.inner.take() {
      inner.cancel();
    }
  }

  /// Consumes the token without cancelling: the work keeps running until it
  /// terminates on its own.
  pub fn detach(mut self) { self.inner = None; }

  /// Moves the token into a collection that owns its lifetime.
  pub fn store(self, bag: &mut Vec<AnyCancellable>) { bag.push(self); }
}

impl Drop for AnyCancellable {
  fn drop(&mut self) { self.cancel(); }
}

impl std::fmt::Debug for AnyCancellable {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AnyCancellable")
      .field("active", &self.inner.is_some())
      .finish()
  }
}

type Action = Box<dyn FnOnce() + Send>;

struct CancelAction(Mutex<Option<Action>>);

impl Cancellable for CancelAction {
  fn cancel(&self) {
    let action = self.0.lock().take();
    if let Some(action) = action {
      action();
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[test]
  fn cancels_on_drop_exactly_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    {
      let mut token = AnyCancellable::from_fn(move || {
        c_hits.fetch_add(1, Ordering::SeqCst);
      });
      token.cancel();
      token.cancel();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn detach_keeps_work_alive() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    AnyCancellable::from_fn(move || {
      c_hits.fetch_add(1, Ordering::SeqCst);
    })
    .detach();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn store_in_bag() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut bag = vec![];
    for _ in 0..3 {
      let c_hits = hits.clone();
      AnyCancellable::from_fn(move || {
        c_hits.fetch_add(1, Ordering::SeqCst);
      })
      .store(&mut bag);
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    drop(bag);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
  }
}

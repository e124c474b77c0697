//! Subscription and cancellation handles.
//!
//! A [`Subscription`] is the live link between one subscriber and one
//! publisher. The subscriber drives it with [`Subscription::request`] and
//! tears it down with [`Cancellable::cancel`]. Both may be called from any
//! thread, any number of times, including after the subscription terminated,
//! in which case they do nothing.

mod guard;
mod registry;

use std::sync::Arc;

pub use guard::AnyCancellable;
pub use registry::Registry;

use crate::demand::Demand;

/// Something that can be cancelled.
///
/// `cancel` must be idempotent and safe to call concurrently with any other
/// signal on the same object.
pub trait Cancellable: Send + Sync {
  fn cancel(&self);
}

/// The live link created by `Publisher::subscribe`.
pub trait Subscription: Cancellable {
  /// Adds `demand` to the outstanding request of this subscription.
  ///
  /// Requests accumulate. Requesting on a cancelled or completed subscription
  /// is a no-op.
  fn request(&self, demand: Demand);
}

/// Type-erased, shareable subscription handle.
///
/// Operators store upstream links exclusively through this handle, never
/// through a concrete publisher type.
pub type AnySubscription = Arc<dyn Subscription>;

/// A subscription that never delivers anything.
///
/// Handed to subscribers of publishers that terminate before producing, so
/// that the "subscription first" rule still holds.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySubscription;

impl EmptySubscription {
  pub fn shared() -> AnySubscription { Arc::new(EmptySubscription) }
}

impl Cancellable for EmptySubscription {
  fn cancel(&self) {}
}

impl Subscription for EmptySubscription {
  fn request(&self, _demand: Demand) {}
}

impl<T: Cancellable + ?Sized> Cancellable for Arc<T> {
  #[inline]
  fn cancel(&self) { (**self).cancel() }
}

impl<T: Subscription + ?Sized> Subscription for Arc<T> {
  #[inline]
  fn request(&self, demand: Demand) { (**self).request(demand) }
}

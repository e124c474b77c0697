//! Demand: how many more values a subscriber is willing to accept.
//!
//! A [`Demand`] is either [`Demand::Unlimited`] or a finite, non-negative
//! [`Demand::Max`] count. Demands form a commutative monoid under `+` with
//! [`Demand::NONE`] as identity, and every arithmetic operation saturates:
//! adding to `Unlimited` stays `Unlimited`, and a finite demand never drops
//! below zero.
//!
//! ```rust
//! use rxflow::prelude::*;
//!
//! let d = Demand::max(2) + Demand::max(3);
//! assert_eq!(d, Demand::max(5));
//! assert_eq!(d + Demand::UNLIMITED, Demand::UNLIMITED);
//! assert_eq!(Demand::max(1) - Demand::max(4), Demand::NONE);
//! ```

use std::{
  cmp::Ordering,
  fmt::{Display, Formatter},
  iter::Sum,
  ops::{Add, AddAssign, Sub, SubAssign},
};

use crate::error::protocol_violation;

/// Outstanding request of a subscriber.
///
/// Variant order matters: every finite demand compares below `Unlimited`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Demand {
  /// A finite number of values.
  Max(usize),
  /// As many values as the publisher can produce.
  Unlimited,
}

impl Demand {
  /// No demand at all.
  pub const NONE: Demand = Demand::Max(0);
  /// Unbounded demand.
  pub const UNLIMITED: Demand = Demand::Unlimited;

  /// A finite demand of `n` values.
  #[inline]
  pub const fn max(n: usize) -> Self { Demand::Max(n) }

  /// Builds a demand from a signed count.
  ///
  /// # Panics
  ///
  /// A negative count is a protocol violation: demand can never be negative.
  pub fn from_signed(n: i64) -> Self {
    if n < 0 {
      protocol_violation(format_args!("demand must not be negative, got {n}"));
    }
    usize::try_from(n).map_or(Demand::Unlimited, Demand::Max)
  }

  /// The finite count, or `None` for unlimited demand.
  #[inline]
  pub fn max_value(&self) -> Option<usize> {
    match self {
      Demand::Max(n) => Some(*n),
      Demand::Unlimited => None,
    }
  }

  #[inline]
  pub fn is_unlimited(&self) -> bool { matches!(self, Demand::Unlimited) }

  /// `true` when at least one more value may be delivered.
  #[inline]
  pub fn has_demand(&self) -> bool { *self != Demand::NONE }

  /// `true` when more than `n` values may be delivered.
  #[inline]
  pub fn exceeds(&self, n: usize) -> bool {
    match self {
      Demand::Max(m) => *m > n,
      Demand::Unlimited => true,
    }
  }

  /// Consumes one unit of demand, returning `false` when none was left.
  #[inline]
  pub fn consume_one(&mut self) -> bool {
    match self {
      Demand::Unlimited => true,
      Demand::Max(0) => false,
      Demand::Max(n) => {
        *n -= 1;
        true
      }
    }
  }
}

impl Default for Demand {
  fn default() -> Self { Demand::NONE }
}

impl From<usize> for Demand {
  fn from(n: usize) -> Self { Demand::Max(n) }
}

impl Display for Demand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Demand::Max(n) => write!(f, "max({n})"),
      Demand::Unlimited => f.write_str("unlimited"),
    }
  }
}

impl Add for Demand {
  type Output = Demand;

  fn add(self, rhs: Demand) -> Demand {
    match (self, rhs) {
      (Demand::Max(a), Demand::Max(b)) => a.checked_add(b).map_or(Demand::Unlimited, Demand::Max),
      _ => Demand::Unlimited,
    }
  }
}

impl Add<usize> for Demand {
  type Output = Demand;

  fn add(self, rhs: usize) -> Demand { self + Demand::Max(rhs) }
}

impl AddAssign for Demand {
  fn add_assign(&mut self, rhs: Demand) { *self = *self + rhs; }
}

impl AddAssign<usize> for Demand {
  fn add_assign(&mut self, rhs: usize) { *self = *self + rhs; }
}

impl Sub for Demand {
  type Output = Demand;

  fn sub(self, rhs: Demand) -> Demand {
    match (self, rhs) {
      (Demand::Unlimited, _) => Demand::Unlimited,
      (Demand::Max(_), Demand::Unlimited) => Demand::NONE,
      (Demand::Max(a), Demand::Max(b)) => Demand::Max(a.saturating_sub(b)),
    }
  }
}

impl Sub<usize> for Demand {
  type Output = Demand;

  fn sub(self, rhs: usize) -> Demand { self - Demand::Max(rhs) }
}

impl SubAssign for Demand {
  fn sub_assign(&mut self, rhs: Demand) { *self = *self - rhs; }
}

impl SubAssign<usize> for Demand {
  fn sub_assign(&mut self, rhs: usize) { *self = *self - rhs; }
}

impl PartialEq<usize> for Demand {
  fn eq(&self, other: &usize) -> bool { *self == Demand::Max(*other) }
}

impl PartialOrd<usize> for Demand {
  fn partial_cmp(&self, other: &usize) -> Option<Ordering> { Some(self.cmp(&Demand::Max(*other))) }
}

impl Sum for Demand {
  fn sum<I: Iterator<Item = Demand>>(iter: I) -> Self { iter.fold(Demand::NONE, Add::add) }
}

//! # rxflow: demand-driven reactive streams
//!
//! Publishers, subscribers and subscriptions that negotiate backpressure
//! through explicit [`Demand`](demand::Demand): nothing is delivered that was
//! not asked for.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxflow::{prelude::*, testing::TestSubscriber};
//!
//! let temperature = PassthroughSubject::<i32, Never>::new();
//! let humidity = PassthroughSubject::<i32, Never>::new();
//!
//! let probe = TestSubscriber::new(Demand::UNLIMITED);
//! temperature.clone().combine_latest(humidity.clone()).subscribe(probe.clone());
//!
//! temperature.send(21);
//! humidity.send(40);
//! temperature.send(22);
//! assert_eq!(probe.values(), vec![(21, 40), (22, 40)]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Publisher`] | Hands each subscriber its own subscription |
//! | [`Subscriber`] | Receives the subscription, values and one completion |
//! | [`Subscription`] | Requests demand and cancels |
//! | [`Demand`] | How many more values a subscriber accepts |
//! | [`PassthroughSubject`] | Hot multicast source fed by `send` |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** and **`timer`** (default): the thread-pool
//!   scheduler
//! - **`tokio-scheduler`**: a scheduler running on a tokio runtime
//!
//! [`Publisher`]: publisher::Publisher
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`Demand`]: demand::Demand
//! [`PassthroughSubject`]: subject::PassthroughSubject

pub mod demand;
pub mod error;
pub mod ops;
pub mod prelude;
pub mod publisher;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;
pub mod testing;

mod outlet;

pub use prelude::*;

#[cfg(doctest)]
mod readme {
  #![doc = include_str!("../README.md")]
}

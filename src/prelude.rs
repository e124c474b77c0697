//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Core protocol
pub use crate::demand::Demand;
pub use crate::error::Never;
// Operators
pub use crate::ops::{BufferingStrategy, Prefetch, PublisherExt};
// Publishers
pub use crate::publisher::{self, AnyPublisher, Publisher};
// Schedulers
pub use crate::scheduler::{Duration, ImmediateScheduler, Scheduler, SchedulerTime};
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub use crate::scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
// Subjects
pub use crate::subject::{CurrentValueSubject, PassthroughSubject};
pub use crate::subscriber::{Completion, Sink, Subscriber};
pub use crate::subscription::{AnyCancellable, AnySubscription, Cancellable, Subscription};

//! Hot, multicasting publishers.
//!
//! A subject is both the producing end for imperative code
//! ([`PassthroughSubject::send`], [`PassthroughSubject::send_completion`])
//! and a [`Publisher`](crate::publisher::Publisher) any number of subscribers
//! attach to. Every subscriber gets its own record with its own demand; a
//! value sent while a record has no demand is lost for that subscriber.
//!
//! Subjects are also [`Subscriber`](crate::subscriber::Subscriber)s: subscribe
//! one to an upstream and it relays everything it receives, requesting
//! unlimited demand.
//!
//! Handles are cheap to clone and all clones share the same subject.

mod current_value_subject;
mod passthrough_subject;
mod subject_core;
mod subject_subscription;
mod subscribers;

pub use current_value_subject::CurrentValueSubject;
pub use passthrough_subject::PassthroughSubject;

//! Simulate management exchanges deterministically.
//!
//! [deterministic::Scheduler] provides a logical clock and a task queue. [face::Face] is a client
//! face whose every action is deferred onto that queue, so a test controls exactly when requests
//! are delivered and responses recorded.

pub mod deterministic;
pub mod face;

pub use deterministic::{Config, Scheduler};
pub use face::{Face, FilterId};

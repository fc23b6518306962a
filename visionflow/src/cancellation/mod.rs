//! Cooperative cancellation for pipeline runs.
//!
//! The orchestrator checks the token only between stages; an in-flight
//! provider call is never interrupted.

mod token;

pub use token::{CancelRequest, CancellationToken};

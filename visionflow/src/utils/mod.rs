//! Utility functions for run identifiers and timestamps.

pub mod timestamps;

pub use timestamps::{format_timestamp, generate_run_id, iso_timestamp, Timestamp};

//! Shared E2E test helpers.
//!
//! Provides frame builders, in-memory report sinks and a harness that
//! runs the filter on a background task with a controllable shutdown.

pub mod frames;
pub mod harness;
pub mod output;

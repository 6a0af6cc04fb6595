//! E2E integration tests for udpfilter.
//!
//! These tests run the full attach, report, detach cycle through
//! `runner::run_filter` with the in-process software driver, feeding
//! synthetic frames and checking the report output and exit status.
//!
//! # Test Structure
//!
//! - `helpers/` -- Shared test utilities (frame builders, output sinks, harness)
//! - `scenarios/` -- Test files organized by scenario
//!
//! # Running
//!
//! ```bash
//! cargo test -p udpfilter-daemon --test e2e
//! ```

mod helpers;
mod scenarios;

//! udpfilter daemon library.
//!
//! Exposes the binary's building blocks for integration testing.
//! In production, `udpfilter` is used as a binary (main.rs).

pub mod cli;
pub mod exit;
pub mod logging;
pub mod metrics_server;
pub mod runner;
#[cfg(unix)]
pub mod signals;

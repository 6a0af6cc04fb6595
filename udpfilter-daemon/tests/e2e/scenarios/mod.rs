//! E2E test scenarios.

mod attach_failure;
mod config_flow;
mod output_closed;
mod shutdown;

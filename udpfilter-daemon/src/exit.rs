//! Process termination reasons and their exit codes.
//!
//! Every way the binary can finish is listed here so the code mapping
//! lives in one place.

use std::process::ExitCode;

/// Why the process is exiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `--help`, `--version` or `--validate` finished.
    Completed,
    /// The report output was closed by the reader.
    OutputClosed,
    /// Shut down by SIGINT or SIGTERM after detaching.
    Signal,
    /// Wrong command-line arguments.
    Usage,
    /// Configuration could not be loaded or failed validation.
    Config,
    /// The filter could not be loaded or attached.
    AttachFailed,
    /// Logging, metrics, signal setup or report output failed.
    Runtime,
}

impl Termination {
    /// Numeric process exit status.
    ///
    /// Signal shutdown shares status 1 with genuine failures.
    pub fn code(self) -> u8 {
        match self {
            Self::Completed | Self::OutputClosed => 0,
            Self::Signal | Self::Usage | Self::Config | Self::AttachFailed | Self::Runtime => 1,
        }
    }
}

impl From<Termination> for ExitCode {
    fn from(termination: Termination) -> Self {
        ExitCode::from(termination.code())
    }
}

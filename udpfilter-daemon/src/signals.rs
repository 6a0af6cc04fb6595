//! Termination signal handling.
//!
//! Handlers are installed by [`ShutdownSignals::install`] before the filter is
//! attached, so a signal that arrives while attaching is queued rather than
//! killing the process with the filter still on the interface.

use anyhow::Result;
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Installed SIGTERM, SIGINT and SIGHUP streams.
pub struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
    sighup: Signal,
}

impl ShutdownSignals {
    /// Install the handlers now.
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler cannot be installed.
    pub fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;
        let sighup = signal(SignalKind::hangup())
            .map_err(|e| anyhow::anyhow!("failed to install SIGHUP handler: {}", e))?;

        Ok(Self {
            sigterm,
            sigint,
            sighup,
        })
    }

    /// Wait for SIGTERM or SIGINT and return its name.
    ///
    /// SIGHUP is logged and otherwise ignored.
    pub async fn recv(&mut self) -> &'static str {
        loop {
            tokio::select! {
                _ = self.sigterm.recv() => return "SIGTERM",
                _ = self.sigint.recv() => return "SIGINT",
                _ = self.sighup.recv() => {
                    tracing::info!("SIGHUP received, ignoring");
                }
            }
        }
    }
}

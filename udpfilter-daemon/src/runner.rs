//! Attach, report, detach.
//!
//! [`run_filter`] is the whole life of one filter: it attaches through a
//! [`FilterLifecycle`], runs the report loop on its own task, waits for either
//! a shutdown signal or the loop ending by itself, and then detaches exactly
//! once. The lifecycle's `Drop` covers any path that leaves early.
//!
//! Detach never waits on the report output. A reader that stopped reading
//! can hold the report task for at most [`DRAIN_TIMEOUT`].

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use udpfilter_core::error::{DriverError, LifecycleError};
use udpfilter_engine::{
    EngineConfig, FilterLifecycle, PlatformDriver, ReportOutcome, ReportSettings, Reporter,
};

use crate::exit::Termination;
use crate::metrics_server::set_filter_attached;

/// How long the report task and the detach confirmation may block on output.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// What stopped the report loop.
#[derive(Debug)]
pub enum StopCause {
    /// A termination signal arrived.
    Signal(&'static str),
    /// The report output was closed.
    OutputClosed,
    /// Writing the report failed or the report task died.
    ReportFailed(io::Error),
    /// The shutdown future failed, e.g. signal handlers were unavailable.
    SignalSetupFailed(String),
}

/// Result of [`serve`].
#[derive(Debug)]
pub struct ServeReport<W> {
    pub cause: StopCause,
    /// Outcome of the single detach performed after the loop stopped.
    pub detached: Result<bool, LifecycleError>,
    /// The output stream, handed back unless the report task died or stalled.
    pub out: Option<W>,
}

enum Trigger<J> {
    Shutdown(anyhow::Result<&'static str>),
    ReportEnded(J),
}

/// Report counters until `shutdown` resolves or the output closes, then detach.
pub async fn serve<D, W, F>(
    lifecycle: &mut FilterLifecycle<D>,
    counters: D::Counters,
    settings: ReportSettings,
    out: W,
    shutdown: F,
) -> ServeReport<W>
where
    D: PlatformDriver,
    W: AsyncWrite + Unpin + Send + 'static,
    F: Future<Output = anyhow::Result<&'static str>>,
{
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let mut task = tokio::spawn(async move {
        let mut out = out;
        let mut reporter = Reporter::new(counters, settings);
        let result = reporter.run(&mut out, task_cancel).await;
        (out, result)
    });

    let trigger = tokio::select! {
        signal = shutdown => Trigger::Shutdown(signal),
        joined = &mut task => Trigger::ReportEnded(joined),
    };

    let (cause, detached, joined) = match trigger {
        Trigger::Shutdown(signal) => {
            let cause = match signal {
                Ok(name) => {
                    tracing::info!(signal = name, "shutdown signal received");
                    StopCause::Signal(name)
                }
                Err(e) => {
                    tracing::error!(error = %e, "signal handling unavailable");
                    StopCause::SignalSetupFailed(e.to_string())
                }
            };
            cancel.cancel();
            // 출력이 막혀 있어도 detach는 먼저
            let detached = detach(lifecycle);
            let joined = match tokio::time::timeout(DRAIN_TIMEOUT, &mut task).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    tracing::warn!("report task did not stop in time, aborting");
                    task.abort();
                    None
                }
            };
            (cause, detached, joined)
        }
        Trigger::ReportEnded(joined) => {
            let cause = match &joined {
                Ok((_, Ok(ReportOutcome::OutputClosed))) => StopCause::OutputClosed,
                Ok((_, Ok(ReportOutcome::Cancelled))) => {
                    StopCause::ReportFailed(io::Error::other("report loop cancelled unexpectedly"))
                }
                Ok((_, Err(e))) => StopCause::ReportFailed(io::Error::new(e.kind(), e.to_string())),
                Err(e) => StopCause::ReportFailed(io::Error::other(e.to_string())),
            };
            (cause, detach(lifecycle), Some(joined))
        }
    };

    let out = match joined {
        Some(Ok((out, Ok(_)))) => Some(out),
        Some(Ok((out, Err(e)))) => {
            tracing::warn!(error = %e, "report output failed");
            Some(out)
        }
        Some(Err(e)) => {
            tracing::error!(error = %e, "report task failed");
            None
        }
        None => None,
    };

    ServeReport {
        cause,
        detached,
        out,
    }
}

fn detach<D: PlatformDriver>(lifecycle: &mut FilterLifecycle<D>) -> Result<bool, LifecycleError> {
    let detached = lifecycle.detach();
    set_filter_attached(false);
    detached
}

/// Attach `driver` to `interface`, report to `out` and detach on the way out.
///
/// Errors are printed to stderr. The detach confirmation goes to `out`.
pub async fn run_filter<D, W, F>(
    driver: D,
    interface: &str,
    config: &EngineConfig,
    out: W,
    shutdown: F,
) -> Termination
where
    D: PlatformDriver,
    W: AsyncWrite + Unpin + Send + 'static,
    F: Future<Output = anyhow::Result<&'static str>>,
{
    let mut lifecycle = FilterLifecycle::new(driver, interface, config.program.clone());

    let counters = match lifecycle.attach() {
        Ok(counters) => counters,
        Err(e) => {
            report_attach_failure(&e);
            return Termination::AttachFailed;
        }
    };
    set_filter_attached(true);

    let report = serve(&mut lifecycle, counters, config.report, out, shutdown).await;

    match report.detached {
        Ok(true) => {
            if let Some(mut out) = report.out {
                let line = format!("Removed XDP from {interface}\n");
                // 출력이 이미 닫혔거나 멈췄을 수 있음
                let confirm = async {
                    out.write_all(line.as_bytes()).await?;
                    out.flush().await
                };
                if tokio::time::timeout(DRAIN_TIMEOUT, confirm).await.is_err() {
                    tracing::warn!("detach confirmation not written, output stalled");
                }
            }
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(error = %e, "detach failed");
            eprintln!("Failed to remove XDP from {interface}: {}", detach_cause(&e));
        }
    }

    match report.cause {
        StopCause::Signal(_) => Termination::Signal,
        StopCause::OutputClosed => Termination::OutputClosed,
        StopCause::ReportFailed(e) => {
            eprintln!("Failed to write report: {e}");
            Termination::Runtime
        }
        StopCause::SignalSetupFailed(reason) => {
            eprintln!("{reason}");
            Termination::Runtime
        }
    }
}

/// Report that this platform has no XDP hook to attach to.
pub fn report_unsupported_platform(interface: &str) -> Termination {
    let err = LifecycleError::Attachment {
        interface: interface.to_owned(),
        source: DriverError::Unsupported("XDP is only supported on Linux".to_owned()),
    };
    report_attach_failure(&err);
    Termination::AttachFailed
}

fn report_attach_failure(err: &LifecycleError) {
    tracing::error!(error = %err, "filter attach failed");
    match err {
        LifecycleError::Attachment { source, .. } if source.is_load_failure() => {
            eprintln!("Failed to load xdp prog: {source}");
        }
        LifecycleError::Attachment { source, .. } => {
            eprintln!("Failed to attach xdp prog: {source}");
        }
        other => eprintln!("Failed to attach xdp prog: {other}"),
    }
}

fn detach_cause(err: &LifecycleError) -> String {
    match err {
        LifecycleError::Detachment { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use udpfilter_engine::{ProgramSpec, SoftwareDriver};

    fn settings() -> ReportSettings {
        ReportSettings {
            interval: Duration::from_millis(5),
            only_changed: false,
        }
    }

    #[tokio::test]
    async fn serve_detaches_once_on_shutdown() {
        let driver = SoftwareDriver::new();
        let hook = driver.hook();
        let mut lifecycle = FilterLifecycle::new(driver, "veth0", ProgramSpec::default());
        let counters = lifecycle.attach().unwrap();

        let report = serve(&mut lifecycle, counters, settings(), Vec::new(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok("SIGINT")
        })
        .await;

        assert!(matches!(report.cause, StopCause::Signal("SIGINT")));
        assert!(report.detached.unwrap());
        assert!(!hook.is_attached());
        assert_eq!(hook.detach_calls(), 1);

        let text = String::from_utf8(report.out.unwrap()).unwrap();
        assert!(text.starts_with("Passing packets, hit CTRL+C to stop"));
    }

    #[tokio::test]
    async fn serve_treats_signal_setup_error_as_stop() {
        let driver = SoftwareDriver::new();
        let hook = driver.hook();
        let mut lifecycle = FilterLifecycle::new(driver, "veth0", ProgramSpec::default());
        let counters = lifecycle.attach().unwrap();

        let report = serve(&mut lifecycle, counters, settings(), Vec::new(), async {
            Err(anyhow::anyhow!("failed to install SIGTERM handler"))
        })
        .await;

        assert!(matches!(report.cause, StopCause::SignalSetupFailed(_)));
        assert!(report.detached.unwrap());
        assert!(!hook.is_attached());
    }

    #[tokio::test]
    async fn run_filter_reports_attach_failure() {
        let driver = SoftwareDriver::new();
        let hook = driver.hook();
        hook.fail_next_attach("no such device");

        let termination = run_filter(
            driver,
            "missing0",
            &EngineConfig::default(),
            Vec::new(),
            std::future::pending(),
        )
        .await;

        assert_eq!(termination, Termination::AttachFailed);
        assert_eq!(hook.detach_calls(), 0);
    }

    #[tokio::test]
    async fn run_filter_detaches_when_signal_beats_attach() {
        // 시그널이 attach 완료 전에 이미 도착해 있던 경우
        let driver = SoftwareDriver::new();
        let hook = driver.hook();

        let termination = run_filter(
            driver,
            "veth0",
            &EngineConfig::default(),
            Vec::new(),
            std::future::ready(Ok("SIGTERM")),
        )
        .await;

        assert_eq!(termination, Termination::Signal);
        assert_eq!(hook.attach_calls(), 1);
        assert_eq!(hook.detach_calls(), 1);
        assert!(!hook.is_attached());
    }

    #[test]
    fn unsupported_platform_is_an_attach_failure() {
        assert_eq!(
            report_unsupported_platform("eth0"),
            Termination::AttachFailed
        );
        let err = DriverError::Unsupported("XDP is only supported on Linux".to_owned());
        assert!(err.is_load_failure());
    }

    #[test]
    fn detach_cause_unwraps_driver_error() {
        let err = LifecycleError::Detachment {
            interface: "veth0".to_owned(),
            source: DriverError::Detach("device gone".to_owned()),
        };
        assert!(detach_cause(&err).contains("device gone"));
    }
}

//! Runs the filter on a background task with a test-controlled shutdown.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use udpfilter_daemon::exit::Termination;
use udpfilter_daemon::runner::run_filter;
use udpfilter_engine::{EngineConfig, ReportSettings, SoftwareDriver, SoftwareHook};

use super::output::SharedBuf;

/// Upper bound for anything the tests wait on.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine config with a short report interval.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        report: ReportSettings {
            interval: Duration::from_millis(5),
            only_changed: false,
        },
        ..EngineConfig::default()
    }
}

/// A filter attached through the software driver.
pub struct RunningFilter {
    pub hook: SoftwareHook,
    pub output: SharedBuf,
    shutdown: oneshot::Sender<&'static str>,
    task: JoinHandle<Termination>,
}

impl RunningFilter {
    /// Spawn `run_filter` and wait until the hook is attached.
    pub async fn start(interface: &'static str, config: EngineConfig) -> Self {
        let driver = SoftwareDriver::new();
        let hook = driver.hook();
        let output = SharedBuf::default();
        let (shutdown, rx) = oneshot::channel();

        let out = output.clone();
        let task = tokio::spawn(async move {
            run_filter(driver, interface, &config, out, async move {
                rx.await
                    .map_err(|e| anyhow::anyhow!("shutdown sender dropped: {}", e))
            })
            .await
        });

        let running = Self {
            hook,
            output,
            shutdown,
            task,
        };
        let hook = running.hook.clone();
        wait_until(move || hook.is_attached()).await;
        running
    }

    /// Wait until the report output contains `needle`.
    pub async fn wait_for_output(&self, needle: &str) {
        let output = self.output.clone();
        let needle = needle.to_owned();
        wait_until(move || output.contents().contains(&needle)).await;
    }

    /// Deliver a termination signal and wait for the run to finish.
    pub async fn signal(self, name: &'static str) -> (Termination, SoftwareHook, String) {
        let Self {
            hook,
            output,
            shutdown,
            task,
        } = self;
        let _ = shutdown.send(name);
        let termination = tokio::time::timeout(DEFAULT_TIMEOUT, task)
            .await
            .expect("filter run did not finish in time")
            .expect("filter task panicked");
        (termination, hook, output.contents())
    }
}

/// Poll `condition` until it holds.
///
/// # Panics
///
/// Panics if the condition is still false after [`DEFAULT_TIMEOUT`].
pub async fn wait_until(condition: impl Fn() -> bool) {
    let poll = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    };
    tokio::time::timeout(DEFAULT_TIMEOUT, poll)
        .await
        .expect("condition not met in time");
}

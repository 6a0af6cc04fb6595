//! The report reader goes away.
//!
//! When stdout is closed the loop ends by itself: the filter is detached
//! and the process exits with status 0. A reader that merely stops reading
//! must not keep the filter attached after a signal.

use udpfilter_daemon::exit::Termination;
use udpfilter_daemon::runner::{DRAIN_TIMEOUT, run_filter};
use udpfilter_engine::SoftwareDriver;

use crate::helpers::harness::{DEFAULT_TIMEOUT, fast_config, wait_until};
use crate::helpers::output::{ClosedPipe, FailingWriter, StalledPipe};

#[tokio::test]
async fn test_e2e_closed_output_detaches_and_exits_zero() {
    let driver = SoftwareDriver::new();
    let hook = driver.hook();

    let termination = tokio::time::timeout(
        DEFAULT_TIMEOUT,
        run_filter(
            driver,
            "veth0",
            &fast_config(),
            ClosedPipe,
            std::future::pending(),
        ),
    )
    .await
    .expect("closed output must end the run");

    assert_eq!(termination, Termination::OutputClosed);
    assert_eq!(termination.code(), 0);
    assert_eq!(hook.attach_calls(), 1);
    assert_eq!(hook.detach_calls(), 1);
    assert!(!hook.is_attached());
}

#[tokio::test]
async fn test_e2e_write_error_is_a_failure() {
    let driver = SoftwareDriver::new();
    let hook = driver.hook();

    let termination = tokio::time::timeout(
        DEFAULT_TIMEOUT,
        run_filter(
            driver,
            "veth0",
            &fast_config(),
            FailingWriter,
            std::future::pending(),
        ),
    )
    .await
    .expect("write error must end the run");

    assert_eq!(termination, Termination::Runtime);
    assert_eq!(hook.detach_calls(), 1);
}

#[tokio::test]
async fn test_e2e_stalled_output_still_detaches_on_signal() {
    let driver = SoftwareDriver::new();
    let hook = driver.hook();
    let (shutdown, rx) = tokio::sync::oneshot::channel::<&'static str>();

    let run = tokio::spawn(async move {
        run_filter(driver, "veth0", &fast_config(), StalledPipe, async move {
            rx.await
                .map_err(|e| anyhow::anyhow!("shutdown sender dropped: {}", e))
        })
        .await
    });
    let attached = hook.clone();
    wait_until(move || attached.is_attached()).await;

    // When: SIGTERM while the report is stuck writing its preamble
    shutdown.send("SIGTERM").unwrap();

    // Then: detach happens without waiting for the output
    let detached = hook.clone();
    tokio::time::timeout(DRAIN_TIMEOUT / 2, async move {
        while detached.is_attached() {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("detach must not wait on a stalled reader");

    let termination = tokio::time::timeout(DEFAULT_TIMEOUT, run)
        .await
        .expect("stalled output must not hang shutdown")
        .unwrap();
    assert_eq!(termination, Termination::Signal);
    assert_eq!(hook.detach_calls(), 1);
}

//! Attach failures.
//!
//! Nothing is installed, nothing is reported and the exit status is 1.

use udpfilter_daemon::exit::Termination;
use udpfilter_daemon::runner::run_filter;
use udpfilter_engine::SoftwareDriver;

use crate::helpers::harness::fast_config;
use crate::helpers::output::SharedBuf;

/// Program load/verification failure.
#[tokio::test]
async fn test_e2e_load_failure_exits_one() {
    let driver = SoftwareDriver::new();
    let hook = driver.hook();
    hook.fail_next_load("verifier rejected program");
    let output = SharedBuf::default();

    let termination = run_filter(
        driver,
        "veth0",
        &fast_config(),
        output.clone(),
        std::future::pending(),
    )
    .await;

    assert_eq!(termination, Termination::AttachFailed);
    assert_eq!(termination.code(), 1);
    assert_eq!(hook.attach_calls(), 0);
    assert!(output.contents().is_empty(), "no banner before attach");
}

/// Interface binding failure.
#[tokio::test]
async fn test_e2e_attach_failure_exits_one() {
    let driver = SoftwareDriver::new();
    let hook = driver.hook();
    hook.fail_next_attach("no such device");
    let output = SharedBuf::default();

    let termination = run_filter(
        driver,
        "nonexistent0",
        &fast_config(),
        output.clone(),
        std::future::pending(),
    )
    .await;

    assert_eq!(termination, Termination::AttachFailed);
    assert!(!hook.is_attached());
    assert_eq!(hook.detach_calls(), 0);
    assert!(output.contents().is_empty());
}

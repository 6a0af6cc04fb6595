//! Signal-driven shutdown.
//!
//! Traffic is counted and reported while attached; a termination signal
//! detaches exactly once, prints the removal line and exits with status 1.

use udpfilter_daemon::exit::Termination;

use crate::helpers::frames;
use crate::helpers::harness::{RunningFilter, fast_config};

/// Live traffic shows up in the report, then SIGINT tears down.
#[tokio::test]
async fn test_e2e_signal_detaches_and_exits_one() {
    let filter = RunningFilter::start("veth0", fast_config()).await;

    for _ in 0..2 {
        let mut frame = frames::ipv4_udp(6081, 0);
        filter.hook.deliver(&mut frame);
        assert_eq!(frames::udp_dport(&frame), 6082);
    }
    filter.hook.deliver(&mut frames::ipv6(&[0x8100], 6));
    filter.wait_for_output("17: 2 pkts").await;

    let (termination, hook, output) = filter.signal("SIGINT").await;

    assert_eq!(termination, Termination::Signal);
    assert_eq!(termination.code(), 1);
    assert!(!hook.is_attached());
    assert_eq!(hook.detach_calls(), 1);

    let mut lines = output.lines();
    assert_eq!(lines.next(), Some("Passing packets, hit CTRL+C to stop"));
    assert_eq!(lines.next(), Some(""));
    assert_eq!(lines.next(), Some("{IP protocol-number}: {total dropped pkts}"));
    assert!(output.contains("6: 1 pkts\n"));
    assert!(output.ends_with("Removed XDP from veth0\n"));
}

/// SIGTERM is handled the same way as SIGINT.
#[tokio::test]
async fn test_e2e_sigterm_without_traffic() {
    let filter = RunningFilter::start("eth1", fast_config()).await;
    filter.wait_for_output("{IP protocol-number}").await;

    let (termination, hook, output) = filter.signal("SIGTERM").await;

    assert_eq!(termination, Termination::Signal);
    assert_eq!(hook.detach_calls(), 1);
    assert!(!output.contains("pkts\n"), "no counters without traffic");
    assert!(output.ends_with("Removed XDP from eth1\n"));
}

/// A failed detach is reported but does not change the exit status.
#[tokio::test]
async fn test_e2e_detach_failure_still_exits() {
    let filter = RunningFilter::start("veth0", fast_config()).await;
    filter.hook.fail_next_detach("interface vanished");

    let (termination, hook, output) = filter.signal("SIGINT").await;

    assert_eq!(termination, Termination::Signal);
    assert_eq!(hook.detach_calls(), 1);
    assert!(!output.contains("Removed XDP"));
}

/// Frames arriving after shutdown are neither counted nor rewritten.
#[tokio::test]
async fn test_e2e_no_classification_after_shutdown() {
    let filter = RunningFilter::start("veth0", fast_config()).await;
    let counters = filter.hook.counters();

    let (_, hook, _) = filter.signal("SIGINT").await;

    let mut frame = frames::ipv4_udp(6081, 0);
    assert!(hook.deliver(&mut frame).is_none());
    assert_eq!(frames::udp_dport(&frame), 6081);
    assert_eq!(counters.get(17), 0);
}

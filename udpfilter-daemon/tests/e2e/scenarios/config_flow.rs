//! Configuration flows from CLI to the running filter.

use clap::Parser;
use udpfilter_daemon::cli::DaemonCli;
use udpfilter_engine::{EngineConfig, PassAction, XdpMode};

use crate::helpers::frames;
use crate::helpers::harness::RunningFilter;

/// CLI port overrides reach the classifier.
#[tokio::test]
async fn test_e2e_cli_ports_drive_rewrite() {
    let cli = DaemonCli::try_parse_from([
        "udpfilter",
        "--ingress-port",
        "4789",
        "--egress-port",
        "4790",
        "--pass-action",
        "tx",
        "--xdp-mode",
        "native",
        "--interval-ms",
        "5",
        "veth0",
    ])
    .unwrap();
    let config = cli.resolve_config().await.expect("valid overrides");
    let engine = EngineConfig::from_core(&config).expect("valid engine config");
    assert_eq!(engine.program.pass_action, PassAction::Tx);
    assert_eq!(engine.program.xdp_mode, XdpMode::Native);

    let filter = RunningFilter::start("veth0", engine).await;

    let mut default_port = frames::ipv4_udp(6081, 0);
    filter.hook.deliver(&mut default_port);
    assert_eq!(frames::udp_dport(&default_port), 6081);

    let mut custom_port = frames::ipv4_udp(4789, 0);
    filter.hook.deliver(&mut custom_port);
    assert_eq!(frames::udp_dport(&custom_port), 4790);

    filter.wait_for_output("17: 2 pkts").await;
    filter.signal("SIGINT").await;
}

/// Fragments are dropped and counted; `--only-changed` suppresses repeats.
#[tokio::test]
async fn test_e2e_only_changed_reports_once() {
    let cli =
        DaemonCli::try_parse_from(["udpfilter", "--only-changed", "--interval-ms", "5", "veth0"])
            .unwrap();
    let config = cli.resolve_config().await.unwrap();
    let engine = EngineConfig::from_core(&config).unwrap();

    let filter = RunningFilter::start("veth0", engine).await;
    let mut fragment = frames::ipv4_udp(6081, 0x2000);
    filter.hook.deliver(&mut fragment);
    assert_eq!(frames::udp_dport(&fragment), 6081, "fragments are not rewritten");

    filter.wait_for_output("17: 1 pkts").await;
    // 몇 주기 더 돌려도 같은 줄이 반복되지 않아야 함
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    let (_, _, output) = filter.signal("SIGINT").await;

    assert_eq!(output.matches("17: 1 pkts").count(), 1);
}

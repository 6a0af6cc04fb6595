use std::process::ExitCode;

use clap::Parser;

use udpfilter_daemon::cli::DaemonCli;
use udpfilter_daemon::exit::Termination;
use udpfilter_daemon::{logging, metrics_server};
#[cfg(target_os = "linux")]
use udpfilter_daemon::{runner, signals};
use udpfilter_engine::EngineConfig;

#[tokio::main]
async fn main() -> ExitCode {
    run().await.into()
}

async fn run() -> Termination {
    let cli = match DaemonCli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                Termination::Usage
            } else {
                Termination::Completed
            };
        }
    };

    // 설정 로드 (파일 → 환경변수 → CLI)
    let config = match cli.resolve_config().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return Termination::Config;
        }
    };
    let engine_config = match EngineConfig::from_core(&config) {
        Ok(engine_config) => engine_config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return Termination::Config;
        }
    };

    if cli.validate {
        println!("Configuration OK");
        return Termination::Completed;
    }

    let Some(interface) = cli.interface.as_deref() else {
        eprintln!("Usage: udpfilter <INTERFACE>");
        return Termination::Usage;
    };

    // 로깅 초기화
    if let Err(e) = logging::init_tracing(&config.general) {
        eprintln!("{e}");
        return Termination::Runtime;
    }

    if config.metrics.enabled {
        if let Err(e) = metrics_server::install_metrics_recorder(&config.metrics) {
            tracing::error!(error = %e, "metrics endpoint unavailable");
            eprintln!("{e}");
            return Termination::Runtime;
        }
    }

    tracing::info!(
        interface,
        version = env!("CARGO_PKG_VERSION"),
        ingress_port = config.xdp.ingress_port,
        egress_port = config.xdp.egress_port,
        "udpfilter starting"
    );

    let termination = attach_and_run(interface, &engine_config).await;
    tracing::info!(?termination, "udpfilter stopped");
    termination
}

#[cfg(target_os = "linux")]
async fn attach_and_run(interface: &str, config: &EngineConfig) -> Termination {
    use udpfilter_engine::AyaDriver;

    // attach 중 도착한 시그널도 놓치지 않도록 먼저 설치
    let mut signals = match signals::ShutdownSignals::install() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "signal handling unavailable");
            eprintln!("{e}");
            return Termination::Runtime;
        }
    };

    runner::run_filter(
        AyaDriver::new(),
        interface,
        config,
        tokio::io::stdout(),
        async move { Ok(signals.recv().await) },
    )
    .await
}

#[cfg(not(target_os = "linux"))]
async fn attach_and_run(interface: &str, _config: &EngineConfig) -> Termination {
    udpfilter_daemon::runner::report_unsupported_platform(interface)
}

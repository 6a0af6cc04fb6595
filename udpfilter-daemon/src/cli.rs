//! CLI argument definitions for udpfilter.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.
//! Flags override the config file and environment variables.

use std::path::PathBuf;

use clap::Parser;
use udpfilter_core::config::UdpFilterConfig;
use udpfilter_core::error::UdpFilterError;

/// XDP filter that counts frames per IP protocol and rewrites a UDP port.
///
/// Attaches to the given interface, prints per-protocol counters until
/// interrupted, then detaches.
#[derive(Parser, Debug)]
#[command(name = "udpfilter")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Network interface to attach the filter to.
    #[arg(required_unless_present = "validate")]
    pub interface: Option<String>,

    /// Path to udpfilter.toml configuration file.
    ///
    /// Without it, built-in defaults plus environment variables are used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// UDP destination port to rewrite.
    #[arg(long)]
    pub ingress_port: Option<u16>,

    /// Port written in place of the ingress port.
    #[arg(long)]
    pub egress_port: Option<u16>,

    /// Action for frames that are not dropped (pass, tx).
    #[arg(long)]
    pub pass_action: Option<String>,

    /// XDP attach mode (skb, native, hw).
    #[arg(long)]
    pub xdp_mode: Option<String>,

    /// Path to the compiled BPF object.
    #[arg(long)]
    pub program: Option<String>,

    /// Report interval in milliseconds (0 polls continuously).
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Only print counters that changed since the previous report.
    #[arg(long)]
    pub only_changed: bool,

    /// Validate configuration and exit without attaching.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply command-line overrides on top of an already loaded config.
    pub fn apply_overrides(&self, config: &mut UdpFilterConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(port) = self.ingress_port {
            config.xdp.ingress_port = port;
        }
        if let Some(port) = self.egress_port {
            config.xdp.egress_port = port;
        }
        if let Some(action) = &self.pass_action {
            config.xdp.pass_action = action.clone();
        }
        if let Some(mode) = &self.xdp_mode {
            config.xdp.xdp_mode = mode.clone();
        }
        if let Some(program) = &self.program {
            config.xdp.program_path = program.clone();
        }
        if let Some(interval) = self.interval_ms {
            config.report.interval_ms = interval;
        }
        if self.only_changed {
            config.report.only_changed = true;
        }
    }

    /// Build the effective configuration.
    ///
    /// Precedence, lowest first: defaults, config file, environment, flags.
    /// The result is validated once all layers are applied.
    pub async fn resolve_config(&self) -> Result<UdpFilterConfig, UdpFilterError> {
        let mut config = match &self.config {
            Some(path) => UdpFilterConfig::read_file(path).await?,
            None => UdpFilterConfig::default(),
        };
        config.apply_env_overrides();
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }
}

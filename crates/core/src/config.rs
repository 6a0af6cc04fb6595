//! 설정 관리 — udpfilter.toml 파싱 및 런타임 설정
//!
//! [`UdpFilterConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//! 포트 쌍, 통과 액션, 보고 주기 등 원래 컴파일 타임 상수였던 값을
//! 런타임에 바꿀 수 있습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`UDPFILTER_XDP_INGRESS_PORT=4789` 형식)
//! 3. 설정 파일 (`udpfilter.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), udpfilter_core::error::UdpFilterError> {
//! use udpfilter_core::config::UdpFilterConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = UdpFilterConfig::load("udpfilter.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = UdpFilterConfig::parse("[xdp]\ningress_port = 4789")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, UdpFilterError};

/// udpfilter 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UdpFilterConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// XDP 필터 설정
    #[serde(default)]
    pub xdp: XdpConfig,
    /// 카운터 보고 설정
    #[serde(default)]
    pub report: ReportConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl UdpFilterConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 검증은 오버라이드를 모두 적용한 뒤 한 번만 수행합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, UdpFilterError> {
        let mut config = Self::read_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드하고 검증합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, UdpFilterError> {
        let config = Self::read_file(path).await?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일을 읽어 파싱만 합니다 (검증 없음).
    ///
    /// 상위 계층(환경변수, CLI)이 값을 덮어쓴 뒤 검증하는 호출자용입니다.
    pub async fn read_file(path: impl AsRef<Path>) -> Result<Self, UdpFilterError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UdpFilterError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                UdpFilterError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, UdpFilterError> {
        toml::from_str(toml_str).map_err(|e| {
            UdpFilterError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `UDPFILTER_{SECTION}_{FIELD}`
    /// 예: `UDPFILTER_XDP_EGRESS_PORT=4790`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "UDPFILTER_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "UDPFILTER_GENERAL_LOG_FORMAT");

        // XDP
        override_u16(&mut self.xdp.ingress_port, "UDPFILTER_XDP_INGRESS_PORT");
        override_u16(&mut self.xdp.egress_port, "UDPFILTER_XDP_EGRESS_PORT");
        override_string(&mut self.xdp.pass_action, "UDPFILTER_XDP_PASS_ACTION");
        override_string(&mut self.xdp.xdp_mode, "UDPFILTER_XDP_XDP_MODE");
        override_string(&mut self.xdp.program_path, "UDPFILTER_XDP_PROGRAM_PATH");

        // Report
        override_u64(&mut self.report.interval_ms, "UDPFILTER_REPORT_INTERVAL_MS");
        override_bool(
            &mut self.report.only_changed,
            "UDPFILTER_REPORT_ONLY_CHANGED",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "UDPFILTER_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "UDPFILTER_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "UDPFILTER_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), UdpFilterError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // 포트 검증
        if self.xdp.ingress_port == 0 {
            return Err(invalid("xdp.ingress_port", "must not be 0".to_owned()));
        }
        if self.xdp.egress_port == 0 {
            return Err(invalid("xdp.egress_port", "must not be 0".to_owned()));
        }
        if self.xdp.ingress_port == self.xdp.egress_port {
            return Err(invalid(
                "xdp.egress_port",
                "must differ from xdp.ingress_port".to_owned(),
            ));
        }

        let valid_actions = ["pass", "tx"];
        if !valid_actions.contains(&self.xdp.pass_action.as_str()) {
            return Err(invalid(
                "xdp.pass_action",
                format!("must be one of: {}", valid_actions.join(", ")),
            ));
        }

        let valid_modes = ["native", "skb", "hw"];
        if !valid_modes.contains(&self.xdp.xdp_mode.as_str()) {
            return Err(invalid(
                "xdp.xdp_mode",
                format!("must be one of: {}", valid_modes.join(", ")),
            ));
        }

        if self.xdp.program_path.is_empty() {
            return Err(invalid(
                "xdp.program_path",
                "program path must not be empty".to_owned(),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid(
                "metrics.port",
                "must not be 0 when metrics are enabled".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> UdpFilterError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// XDP 필터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XdpConfig {
    /// 재작성 대상 UDP 목적지 포트
    pub ingress_port: u16,
    /// 재작성 후 UDP 목적지 포트
    pub egress_port: u16,
    /// 통과 판정의 XDP 액션 (pass, tx)
    pub pass_action: String,
    /// XDP 모드 (native, skb, hw)
    pub xdp_mode: String,
    /// 컴파일된 BPF 오브젝트 경로
    pub program_path: String,
}

impl Default for XdpConfig {
    fn default() -> Self {
        Self {
            ingress_port: 6081,
            egress_port: 6082,
            pass_action: "pass".to_owned(),
            xdp_mode: "skb".to_owned(),
            program_path: "target/bpfel-unknown-none/release/udpfilter-ebpf".to_owned(),
        }
    }
}

/// 카운터 보고 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// 보고 주기 (밀리초, 0이면 busy-poll)
    pub interval_ms: u64,
    /// 이전 주기 대비 바뀐 카운터만 출력
    pub only_changed: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            only_changed: false,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// HTTP 리스너 주소
    pub listen_addr: String,
    /// HTTP 리스너 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

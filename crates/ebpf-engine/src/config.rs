//! 엔진 설정 — core 설정을 드라이버/보고 루프가 쓰는 타입으로 변환
//!
//! [`EngineConfig`]는 core의 [`UdpFilterConfig`] 문자열 필드를 검증된
//! 열거형으로 바꿔 담습니다. 드라이버는 [`ProgramSpec`]만, 보고 루프는
//! [`ReportSettings`]만 봅니다.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use udpfilter_common::{FilterConfig, PASS_ACTION_PASS, PASS_ACTION_TX};
use udpfilter_core::config::{ReportConfig, UdpFilterConfig, XdpConfig};
use udpfilter_core::error::{ConfigError, UdpFilterError};

/// XDP 어태치 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XdpMode {
    /// 범용(SKB) 모드, 모든 드라이버에서 동작
    #[default]
    Skb,
    /// 드라이버 네이티브 모드
    Native,
    /// NIC 오프로드 모드
    Hw,
}

impl XdpMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skb => "skb",
            Self::Native => "native",
            Self::Hw => "hw",
        }
    }
}

impl fmt::Display for XdpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XdpMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skb" => Ok(Self::Skb),
            "native" => Ok(Self::Native),
            "hw" => Ok(Self::Hw),
            other => Err(ConfigError::InvalidValue {
                field: "xdp.xdp_mode".to_owned(),
                reason: format!("unknown mode '{other}'"),
            }),
        }
    }
}

/// 통과 판정에 대응하는 XDP 액션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassAction {
    /// XDP_PASS: 커널 네트워크 스택으로 전달
    #[default]
    Pass,
    /// XDP_TX: 수신 인터페이스로 되돌려 보냄
    Tx,
}

impl PassAction {
    /// 커널 맵에 기록하는 원시 값
    pub fn as_raw(self) -> u8 {
        match self {
            Self::Pass => PASS_ACTION_PASS,
            Self::Tx => PASS_ACTION_TX,
        }
    }
}

impl FromStr for PassAction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(Self::Pass),
            "tx" => Ok(Self::Tx),
            other => Err(ConfigError::InvalidValue {
                field: "xdp.pass_action".to_owned(),
                reason: format!("unknown action '{other}'"),
            }),
        }
    }
}

/// 드라이버에 넘기는 프로그램 명세
///
/// 컴파일된 BPF 오브젝트 위치와 커널에 기록할 런타임 필터 설정을 담습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSpec {
    /// BPF 오브젝트 파일 경로
    pub program_path: PathBuf,
    /// 재작성 대상 목적지 포트
    pub ingress_port: u16,
    /// 재작성 후 목적지 포트
    pub egress_port: u16,
    /// 통과 판정 액션
    pub pass_action: PassAction,
    /// 어태치 모드
    pub xdp_mode: XdpMode,
}

impl ProgramSpec {
    /// core의 XDP 섹션에서 명세를 생성합니다.
    pub fn from_config(config: &XdpConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            program_path: PathBuf::from(&config.program_path),
            ingress_port: config.ingress_port,
            egress_port: config.egress_port,
            pass_action: config.pass_action.parse()?,
            xdp_mode: config.xdp_mode.parse()?,
        })
    }

    /// 커널 `FILTER_CONFIG` 맵에 기록할 값
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig::new(
            self.ingress_port,
            self.egress_port,
            self.pass_action.as_raw(),
        )
    }
}

impl Default for ProgramSpec {
    fn default() -> Self {
        // 기본 XdpConfig는 항상 유효하므로 직접 구성
        let xdp = XdpConfig::default();
        Self {
            program_path: PathBuf::from(xdp.program_path),
            ingress_port: xdp.ingress_port,
            egress_port: xdp.egress_port,
            pass_action: PassAction::Pass,
            xdp_mode: XdpMode::Skb,
        }
    }
}

/// 보고 루프 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    /// 보고 주기 (`Duration::ZERO`이면 busy-poll)
    pub interval: Duration,
    /// 바뀐 카운터만 출력
    pub only_changed: bool,
}

impl ReportSettings {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            only_changed: config.only_changed,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

/// 엔진 전체 설정
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// 드라이버용 프로그램 명세
    pub program: ProgramSpec,
    /// 보고 루프 설정
    pub report: ReportSettings,
}

impl EngineConfig {
    /// 검증된 core 설정에서 엔진 설정을 생성합니다.
    pub fn from_core(config: &UdpFilterConfig) -> Result<Self, UdpFilterError> {
        Ok(Self {
            program: ProgramSpec::from_config(&config.xdp)?,
            report: ReportSettings::from_config(&config.report),
        })
    }
}

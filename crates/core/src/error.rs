//! 에러 타입 — 도메인별 에러 정의
//!
//! 프레임 단위 파싱 에러(`udpfilter_common::Truncated`)는 분류기 안에서 복구되므로
//! 여기에는 나타나지 않습니다. 운영자에게 보이는 것은 설정/라이프사이클 에러뿐입니다.

/// udpfilter 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum UdpFilterError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 필터 어태치/디태치 에러
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// 플랫폼 드라이버 에러
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 플랫폼 드라이버 에러
///
/// 컴파일/검증/권한 실패는 `Load`, 인터페이스 바인딩 실패는 `Attach`로 구분합니다.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// 프로그램 로드/검증 실패
    #[error("program load failed: {0}")]
    Load(String),

    /// 인터페이스 어태치 실패
    #[error("attach failed: {0}")]
    Attach(String),

    /// 인터페이스 디태치 실패
    #[error("detach failed: {0}")]
    Detach(String),

    /// 카운터 맵 접근 실패
    #[error("counter map error: {0}")]
    Map(String),

    /// 프로그램이 아직 로드되지 않음
    #[error("program not loaded")]
    NotLoaded,

    /// 현재 플랫폼에서 지원하지 않음
    #[error("unsupported platform: {0}")]
    Unsupported(String),
}

impl DriverError {
    /// 로드/검증 단계 실패인지 확인합니다.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::Load(_) | Self::NotLoaded | Self::Unsupported(_))
    }
}

/// 필터 라이프사이클 에러
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// 수신 경로에 분류기를 설치하지 못함 (치명적)
    #[error("failed to attach filter to {interface}: {source}")]
    Attachment {
        interface: String,
        #[source]
        source: DriverError,
    },

    /// 설치된 분류기를 제거하지 못함 (보고만 하고 종료는 계속)
    #[error("failed to detach filter from {interface}: {source}")]
    Detachment {
        interface: String,
        #[source]
        source: DriverError,
    },

    /// 현재 상태에서 허용되지 않는 전환
    #[error("invalid lifecycle transition: {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
}

#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//! - [`config`]: core 설정 → 드라이버/보고 루프 설정 변환
//! - [`counters`]: 카운터 테이블과 읽기 인터페이스 ([`CounterSource`])
//! - [`driver`]: 플랫폼 드라이버 trait과 구현 (aya, software)
//! - [`lifecycle`]: 어태치/디태치 상태 머신
//! - [`stats`]: 처리율 계산 + 메트릭 내보내기
//! - [`report`]: stdout 보고 루프
//!
//! # 공유 타입
//! 커널/유저스페이스 공유 타입은 [`udpfilter_common`] 크레이트에 정의되어 있습니다.

pub mod config;
pub mod counters;
pub mod driver;
pub mod lifecycle;
pub mod report;
pub mod stats;

// --- 주요 타입 re-export ---

// 설정
pub use config::{EngineConfig, PassAction, ProgramSpec, ReportSettings, XdpMode};

// 카운터
pub use counters::{CounterSnapshot, CounterSource, CounterTable};

// 드라이버
#[cfg(target_os = "linux")]
pub use driver::{AyaDriver, KernelCounters};
pub use driver::{PlatformDriver, SoftwareDriver, SoftwareHook};

// 라이프사이클
pub use lifecycle::{FilterLifecycle, FilterState};

// 보고
pub use report::{ReportOutcome, Reporter};
pub use stats::ProtocolStats;

// 공유 타입 (커널/유저스페이스 공통)
pub use udpfilter_common;

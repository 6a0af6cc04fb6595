//! 플랫폼 드라이버 — 분류기를 수신 경로에 설치하는 백엔드
//!
//! [`PlatformDriver`]는 라이프사이클 관리자가 보는 유일한 플랫폼 경계입니다.
//!
//! - [`AyaDriver`] (Linux): 컴파일된 BPF 오브젝트를 커널 XDP 훅에 설치
//! - [`SoftwareDriver`]: 프로세스 안에서 같은 분류기를 실행 (테스트/기준 호스트)
//!
//! 호출 순서는 항상 `compile_and_verify → attach → counters → detach`이며
//! 순서 보장은 [`FilterLifecycle`](crate::lifecycle::FilterLifecycle)이 맡습니다.

#[cfg(target_os = "linux")]
pub mod kernel;
pub mod software;

use udpfilter_core::error::DriverError;

pub use crate::config::{PassAction, ProgramSpec, XdpMode};
use crate::counters::CounterSource;

#[cfg(target_os = "linux")]
pub use self::kernel::{AyaDriver, KernelCounters};
pub use self::software::{SoftwareDriver, SoftwareHook};

/// 분류기 설치 백엔드
pub trait PlatformDriver: Send {
    /// 어태치된 동안 카운터를 읽는 핸들
    type Counters: CounterSource + 'static;

    /// 로그에 쓰는 드라이버 이름
    fn name(&self) -> &'static str;

    /// 프로그램을 준비하고 플랫폼 검증을 통과시킵니다.
    ///
    /// 컴파일/검증/권한 실패는 [`DriverError::Load`]로 보고합니다.
    fn compile_and_verify(&mut self, spec: &ProgramSpec) -> Result<(), DriverError>;

    /// 준비된 프로그램을 인터페이스 수신 경로에 설치합니다.
    fn attach(&mut self, interface: &str) -> Result<(), DriverError>;

    /// 설치된 프로그램을 제거합니다.
    fn detach(&mut self, interface: &str) -> Result<(), DriverError>;

    /// 카운터 읽기 핸들을 반환합니다. 어태치 이후에만 유효합니다.
    fn counters(&mut self) -> Result<Self::Counters, DriverError>;
}

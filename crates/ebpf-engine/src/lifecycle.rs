//! 필터 라이프사이클 — 어태치 핸들의 단일 소유자
//!
//! [`FilterLifecycle`]만 드라이버의 `attach`/`detach`를 호출합니다.
//!
//! # 상태 전이
//! ```text
//!            attach() ok                 detach()
//! Unattached ──────────▶ Attached ──────────▶ Detaching ──────────▶ Unattached (종료)
//!     │                                                               │
//!     └── attach() 실패: Unattached 유지                               └── 재어태치 불가
//! ```
//!
//! 어태치 상태로 drop되면 `Drop`에서 한 번 detach합니다. 에러나 조기 반환
//! 경로에서도 핸들은 정확히 한 번 해제됩니다.

use std::fmt;

use tracing::{error, info, warn};
use udpfilter_core::error::LifecycleError;

use crate::config::ProgramSpec;
use crate::driver::PlatformDriver;

/// 어태치 핸들 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// 설치되지 않음 (초기 또는 해제 완료)
    Unattached,
    /// 수신 경로에 설치됨
    Attached,
    /// 해제 진행 중
    Detaching,
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unattached => "unattached",
            Self::Attached => "attached",
            Self::Detaching => "detaching",
        };
        f.write_str(s)
    }
}

/// 분류기 설치/해제 관리자
pub struct FilterLifecycle<D: PlatformDriver> {
    driver: D,
    interface: String,
    spec: ProgramSpec,
    state: FilterState,
    /// 한 번 해제된 뒤에는 다시 어태치하지 않음
    finished: bool,
}

impl<D: PlatformDriver> FilterLifecycle<D> {
    pub fn new(driver: D, interface: impl Into<String>, spec: ProgramSpec) -> Self {
        Self {
            driver,
            interface: interface.into(),
            spec,
            state: FilterState::Unattached,
            finished: false,
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn is_attached(&self) -> bool {
        self.state == FilterState::Attached
    }

    /// 해제까지 끝나 더 이상 어태치할 수 없는지 여부
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// 분류기를 인터페이스에 설치하고 카운터 읽기 핸들을 반환합니다.
    ///
    /// 실패하면 상태는 `Unattached`로 남습니다.
    ///
    /// # 에러
    /// - `LifecycleError::Attachment`: 컴파일/검증/권한/바인딩 실패
    /// - `LifecycleError::InvalidState`: 이미 어태치되었거나 해제가 끝난 경우
    pub fn attach(&mut self) -> Result<D::Counters, LifecycleError> {
        if self.state != FilterState::Unattached || self.finished {
            let state = if self.finished {
                "finished".to_owned()
            } else {
                self.state.to_string()
            };
            return Err(LifecycleError::InvalidState {
                operation: "attach",
                state,
            });
        }

        info!(
            interface = self.interface.as_str(),
            driver = self.driver.name(),
            xdp_mode = %self.spec.xdp_mode,
            "attaching filter"
        );

        self.driver
            .compile_and_verify(&self.spec)
            .map_err(|source| self.attachment_error(source))?;
        self.driver
            .attach(&self.interface)
            .map_err(|source| self.attachment_error(source))?;

        match self.driver.counters() {
            Ok(counters) => {
                self.state = FilterState::Attached;
                info!(interface = self.interface.as_str(), "filter attached");
                Ok(counters)
            }
            Err(source) => {
                // 카운터 없이 설치된 채로 두지 않음
                if let Err(e) = self.driver.detach(&self.interface) {
                    warn!(error = %e, "rollback detach failed");
                }
                Err(self.attachment_error(source))
            }
        }
    }

    /// 설치된 분류기를 제거합니다.
    ///
    /// 처음 호출에서만 드라이버를 호출하고 `Ok(true)`를 반환합니다. 이미
    /// 해제되었거나 어태치된 적이 없으면 아무것도 하지 않고 `Ok(false)`입니다.
    /// 드라이버가 실패해도 핸들은 해제된 것으로 간주하여 재시도하지 않습니다.
    pub fn detach(&mut self) -> Result<bool, LifecycleError> {
        if self.state != FilterState::Attached {
            return Ok(false);
        }

        self.state = FilterState::Detaching;
        let result = self.driver.detach(&self.interface);
        self.state = FilterState::Unattached;
        self.finished = true;

        match result {
            Ok(()) => {
                info!(interface = self.interface.as_str(), "filter detached");
                Ok(true)
            }
            Err(source) => Err(LifecycleError::Detachment {
                interface: self.interface.clone(),
                source,
            }),
        }
    }

    fn attachment_error(&self, source: udpfilter_core::error::DriverError) -> LifecycleError {
        LifecycleError::Attachment {
            interface: self.interface.clone(),
            source,
        }
    }
}

impl<D: PlatformDriver> Drop for FilterLifecycle<D> {
    fn drop(&mut self) {
        if self.state == FilterState::Attached {
            warn!(
                interface = self.interface.as_str(),
                "filter still attached on drop, detaching"
            );
            if let Err(e) = self.detach() {
                error!(error = %e, "failed to detach filter on drop");
            }
        }
    }
}

impl<D: PlatformDriver> fmt::Debug for FilterLifecycle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterLifecycle")
            .field("driver", &self.driver.name())
            .field("interface", &self.interface)
            .field("state", &self.state)
            .field("finished", &self.finished)
            .finish()
    }
}

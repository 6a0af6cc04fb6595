//! 소프트웨어 드라이버 — 프로세스 안에서 분류기를 실행
//!
//! 커널 프로그램과 같은 `udpfilter_common::classify_and_count`를 사용하므로
//! 분류 결과와 카운터 의미가 커널 경로와 동일합니다. 프레임은
//! [`SoftwareHook::deliver`]로 주입합니다.
//!
//! 실패 주입(`fail_next_*`)으로 라이프사이클의 에러 경로를 시험할 수 있습니다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};
use udpfilter_common::{Classification, FilterConfig, classify_and_count};
use udpfilter_core::error::DriverError;

use super::{PlatformDriver, ProgramSpec};
use crate::counters::CounterTable;

#[derive(Default)]
struct HookState {
    /// 어태치된 인터페이스와 그 설정
    attached: Option<(String, FilterConfig)>,
    load_failure: Option<String>,
    attach_failure: Option<String>,
    detach_failure: Option<String>,
}

struct HookInner {
    state: Mutex<HookState>,
    counters: Arc<CounterTable>,
    attach_calls: AtomicUsize,
    detach_calls: AtomicUsize,
}

/// 소프트웨어 수신 경로 핸들
///
/// 드라이버와 상태를 공유하므로, 드라이버를 라이프사이클에 넘긴 뒤에도
/// 프레임 주입과 상태 관찰에 사용할 수 있습니다.
#[derive(Clone)]
pub struct SoftwareHook {
    inner: Arc<HookInner>,
}

impl SoftwareHook {
    fn new() -> Self {
        Self {
            inner: Arc::new(HookInner {
                state: Mutex::new(HookState::default()),
                counters: Arc::new(CounterTable::new()),
                attach_calls: AtomicUsize::new(0),
                detach_calls: AtomicUsize::new(0),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, HookState> {
        // 잠금 안에서 패닉할 코드가 없으므로 poison은 무시
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 수신 경로에 프레임 한 개를 전달합니다.
    ///
    /// 어태치되어 있지 않으면 `None`을 반환하고 프레임은 그대로 둡니다.
    pub fn deliver(&self, frame: &mut [u8]) -> Option<Classification> {
        let config = self.state().attached.as_ref().map(|(_, config)| *config)?;
        Some(classify_and_count(frame, &config, &*self.inner.counters))
    }

    pub fn counters(&self) -> Arc<CounterTable> {
        Arc::clone(&self.inner.counters)
    }

    pub fn is_attached(&self) -> bool {
        self.state().attached.is_some()
    }

    pub fn attached_interface(&self) -> Option<String> {
        self.state()
            .attached
            .as_ref()
            .map(|(interface, _)| interface.clone())
    }

    /// 성공/실패와 관계없이 `attach`가 호출된 횟수
    pub fn attach_calls(&self) -> usize {
        self.inner.attach_calls.load(Ordering::SeqCst)
    }

    /// 성공/실패와 관계없이 `detach`가 호출된 횟수
    pub fn detach_calls(&self) -> usize {
        self.inner.detach_calls.load(Ordering::SeqCst)
    }

    /// 다음 `compile_and_verify`를 실패시킵니다.
    pub fn fail_next_load(&self, reason: impl Into<String>) {
        self.state().load_failure = Some(reason.into());
    }

    /// 다음 `attach`를 실패시킵니다.
    pub fn fail_next_attach(&self, reason: impl Into<String>) {
        self.state().attach_failure = Some(reason.into());
    }

    /// 다음 `detach`를 실패시킵니다. 실패한 경우 훅은 어태치 상태로 남습니다.
    pub fn fail_next_detach(&self, reason: impl Into<String>) {
        self.state().detach_failure = Some(reason.into());
    }
}

impl std::fmt::Debug for SoftwareHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareHook")
            .field("attached", &self.attached_interface())
            .field("attach_calls", &self.attach_calls())
            .field("detach_calls", &self.detach_calls())
            .finish()
    }
}

/// 프로세스 내 드라이버
pub struct SoftwareDriver {
    hook: SoftwareHook,
    loaded: Option<FilterConfig>,
}

impl SoftwareDriver {
    pub fn new() -> Self {
        Self {
            hook: SoftwareHook::new(),
            loaded: None,
        }
    }

    /// 수신 경로 핸들을 반환합니다.
    pub fn hook(&self) -> SoftwareHook {
        self.hook.clone()
    }
}

impl Default for SoftwareDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformDriver for SoftwareDriver {
    type Counters = Arc<CounterTable>;

    fn name(&self) -> &'static str {
        "software"
    }

    fn compile_and_verify(&mut self, spec: &ProgramSpec) -> Result<(), DriverError> {
        if let Some(reason) = self.hook.state().load_failure.take() {
            return Err(DriverError::Load(reason));
        }
        self.loaded = Some(spec.filter_config());
        debug!(
            ingress_port = spec.ingress_port,
            egress_port = spec.egress_port,
            "software program prepared"
        );
        Ok(())
    }

    fn attach(&mut self, interface: &str) -> Result<(), DriverError> {
        self.hook.inner.attach_calls.fetch_add(1, Ordering::SeqCst);
        let config = self.loaded.ok_or(DriverError::NotLoaded)?;

        let mut state = self.hook.state();
        if let Some(reason) = state.attach_failure.take() {
            return Err(DriverError::Attach(reason));
        }
        if let Some((attached, _)) = &state.attached {
            return Err(DriverError::Attach(format!(
                "program already attached to {attached}"
            )));
        }
        state.attached = Some((interface.to_owned(), config));
        drop(state);

        info!(interface, "software hook attached");
        Ok(())
    }

    fn detach(&mut self, interface: &str) -> Result<(), DriverError> {
        self.hook.inner.detach_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.hook.state();
        if let Some(reason) = state.detach_failure.take() {
            return Err(DriverError::Detach(reason));
        }
        match &state.attached {
            Some((attached, _)) if attached == interface => {
                state.attached = None;
                drop(state);
                info!(interface, "software hook detached");
                Ok(())
            }
            _ => Err(DriverError::Detach(format!("nothing attached to {interface}"))),
        }
    }

    fn counters(&mut self) -> Result<Arc<CounterTable>, DriverError> {
        if self.loaded.is_none() {
            return Err(DriverError::NotLoaded);
        }
        Ok(self.hook.counters())
    }
}

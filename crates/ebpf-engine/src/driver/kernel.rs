//! aya 기반 커널 XDP 드라이버 (Linux 전용)
//!
//! ```text
//! compile_and_verify: Ebpf::load_file ─▶ FILTER_CONFIG[0] = FilterConfig ─▶ Xdp::load (verifier)
//! attach:             Xdp::attach(interface, XdpFlags) ─▶ XdpLinkId 보관
//! counters:           take_map(PROTO_COUNTERS) ─▶ KernelCounters (CPU별 값 합산)
//! detach:             Xdp::detach(XdpLinkId) ─▶ Ebpf 해제
//! ```

use aya::Ebpf;
use aya::maps::{Array, MapData, PerCpuArray};
use aya::programs::xdp::XdpLinkId;
use aya::programs::{Xdp, XdpFlags};
use tracing::{debug, info, warn};

use udpfilter_common::{FilterConfig, MAP_FILTER_CONFIG, MAP_PROTO_COUNTERS, PROGRAM_NAME};
use udpfilter_core::error::DriverError;

use super::{PlatformDriver, ProgramSpec, XdpMode};
use crate::counters::CounterSource;

/// 커널 XDP 드라이버
pub struct AyaDriver {
    ebpf: Option<Ebpf>,
    xdp_mode: XdpMode,
    link: Option<(String, XdpLinkId)>,
}

impl AyaDriver {
    pub fn new() -> Self {
        Self {
            ebpf: None,
            xdp_mode: XdpMode::default(),
            link: None,
        }
    }

    fn program_mut(&mut self) -> Result<&mut Xdp, DriverError> {
        let ebpf = self.ebpf.as_mut().ok_or(DriverError::NotLoaded)?;
        let program = ebpf.program_mut(PROGRAM_NAME).ok_or_else(|| {
            DriverError::Load(format!("program '{PROGRAM_NAME}' not found in object"))
        })?;
        program
            .try_into()
            .map_err(|e| DriverError::Load(format!("program '{PROGRAM_NAME}' is not XDP: {e}")))
    }
}

impl Default for AyaDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn xdp_flags(mode: XdpMode) -> XdpFlags {
    match mode {
        XdpMode::Skb => XdpFlags::SKB_MODE,
        XdpMode::Native => XdpFlags::DRV_MODE,
        XdpMode::Hw => XdpFlags::HW_MODE,
    }
}

fn write_filter_config(ebpf: &mut Ebpf, config: FilterConfig) -> Result<(), DriverError> {
    let map = ebpf
        .map_mut(MAP_FILTER_CONFIG)
        .ok_or_else(|| DriverError::Map(format!("map '{MAP_FILTER_CONFIG}' not found")))?;
    let mut array: Array<&mut MapData, FilterConfig> = Array::try_from(map)
        .map_err(|e| DriverError::Map(format!("{MAP_FILTER_CONFIG}: {e}")))?;
    array
        .set(0, config, 0)
        .map_err(|e| DriverError::Map(format!("{MAP_FILTER_CONFIG}[0]: {e}")))
}

impl PlatformDriver for AyaDriver {
    type Counters = KernelCounters;

    fn name(&self) -> &'static str {
        "aya"
    }

    fn compile_and_verify(&mut self, spec: &ProgramSpec) -> Result<(), DriverError> {
        info!(
            path = %spec.program_path.display(),
            ingress_port = spec.ingress_port,
            egress_port = spec.egress_port,
            "loading XDP object"
        );

        let mut ebpf = Ebpf::load_file(&spec.program_path)
            .map_err(|e| DriverError::Load(format!("{}: {e}", spec.program_path.display())))?;

        if let Err(e) = aya_log::EbpfLogger::init(&mut ebpf) {
            // 로그 호출이 모두 최적화로 제거된 빌드에서는 실패할 수 있음
            debug!(error = %e, "eBPF logger not available");
        }

        write_filter_config(&mut ebpf, spec.filter_config())?;

        self.ebpf = Some(ebpf);
        self.xdp_mode = spec.xdp_mode;

        let program = self.program_mut()?;
        program
            .load()
            .map_err(|e| DriverError::Load(format!("verifier rejected '{PROGRAM_NAME}': {e}")))?;

        info!("XDP program loaded");
        Ok(())
    }

    fn attach(&mut self, interface: &str) -> Result<(), DriverError> {
        if let Some((attached, _)) = &self.link {
            return Err(DriverError::Attach(format!(
                "program already attached to {attached}"
            )));
        }

        let mode = self.xdp_mode;
        let program = self.program_mut()?;
        let link = program
            .attach(interface, xdp_flags(mode))
            .map_err(|e| DriverError::Attach(format!("{interface} ({mode} mode): {e}")))?;

        info!(interface, xdp_mode = %mode, "XDP program attached");
        self.link = Some((interface.to_owned(), link));
        Ok(())
    }

    fn detach(&mut self, interface: &str) -> Result<(), DriverError> {
        let (attached, link) = self
            .link
            .take()
            .ok_or_else(|| DriverError::Detach(format!("nothing attached to {interface}")))?;
        if attached != interface {
            warn!(
                requested = interface,
                attached = attached.as_str(),
                "detach requested for a different interface"
            );
        }

        let result = self
            .program_mut()
            .and_then(|program| {
                program
                    .detach(link)
                    .map_err(|e| DriverError::Detach(format!("{attached}: {e}")))
            });

        // 링크 해제 실패와 관계없이 오브젝트를 내려 커널 참조를 정리
        self.ebpf = None;
        result
    }

    fn counters(&mut self) -> Result<KernelCounters, DriverError> {
        let ebpf = self.ebpf.as_mut().ok_or(DriverError::NotLoaded)?;
        let map = ebpf.take_map(MAP_PROTO_COUNTERS).ok_or_else(|| {
            DriverError::Map(format!("map '{MAP_PROTO_COUNTERS}' not found or already taken"))
        })?;
        let array = PerCpuArray::try_from(map)
            .map_err(|e| DriverError::Map(format!("{MAP_PROTO_COUNTERS}: {e}")))?;
        Ok(KernelCounters { array })
    }
}

/// 커널 `PROTO_COUNTERS` PerCpuArray 읽기 핸들
pub struct KernelCounters {
    array: PerCpuArray<MapData, u64>,
}

impl CounterSource for KernelCounters {
    fn read(&self, index: u8) -> Result<u64, DriverError> {
        let values = self
            .array
            .get(&u32::from(index), 0)
            .map_err(|e| DriverError::Map(format!("{MAP_PROTO_COUNTERS}[{index}]: {e}")))?;
        Ok(values
            .iter()
            .fold(0u64, |acc, &count| acc.wrapping_add(count)))
    }
}

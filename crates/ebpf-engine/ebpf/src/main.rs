#![no_std]
#![no_main]

use core::mem;

use aya_ebpf::bindings::xdp_action;
use aya_ebpf::macros::{map, xdp};
use aya_ebpf::maps::{Array, PerCpuArray};
use aya_ebpf::programs::XdpContext;
use aya_log_ebpf::debug;

use udpfilter_common::{
    COUNTER_TABLE_SIZE, CounterSink, FilterConfig, Frame, PASS_ACTION_TX, Truncated, Verdict,
    classify_and_count,
};

/// 프로토콜 번호별 패킷 수 (CPU별 슬롯, 유저스페이스에서 합산)
#[map(name = "PROTO_COUNTERS")]
static PROTO_COUNTERS: PerCpuArray<u64> = PerCpuArray::with_max_entries(COUNTER_TABLE_SIZE, 0);

/// 런타임 필터 설정 (0번 엔트리만 사용)
#[map(name = "FILTER_CONFIG")]
static FILTER_CONFIG: Array<FilterConfig> = Array::with_max_entries(1, 0);

/// XDP UDP 포트 재작성 필터
///
/// 모든 수신 프레임을 분류해 프로토콜 카운터를 올리고, ingress 포트로 향하는
/// 비단편화 IPv4/UDP 프레임의 목적지 포트를 egress 포트로 바꿉니다.
/// 단편화된 IPv4 프레임은 드롭합니다.
#[xdp]
pub fn udpfilter(ctx: XdpContext) -> u32 {
    let config = match FILTER_CONFIG.get(0) {
        Some(config) => *config,
        None => FilterConfig::DEFAULT,
    };

    let mut frame = XdpFrame { ctx: &ctx };
    let result = classify_and_count(&mut frame, &config, &KernelCounters);

    match result.verdict {
        Verdict::Drop => {
            debug!(&ctx, "dropped fragmented ipv4 frame, proto {}", result.index);
            xdp_action::XDP_DROP
        }
        Verdict::RewriteAndPass => {
            debug!(
                &ctx,
                "rewrote udp dport {} -> {}", config.ingress_port, config.egress_port
            );
            pass_action(&config)
        }
        Verdict::Pass => pass_action(&config),
    }
}

#[inline(always)]
fn pass_action(config: &FilterConfig) -> u32 {
    if config.pass_action == PASS_ACTION_TX {
        xdp_action::XDP_TX
    } else {
        xdp_action::XDP_PASS
    }
}

/// `PROTO_COUNTERS` 증가 핸들
struct KernelCounters;

impl CounterSink for KernelCounters {
    #[inline(always)]
    fn increment(&self, index: u8) {
        if let Some(slot) = PROTO_COUNTERS.get_ptr_mut(u32::from(index)) {
            // SAFETY: CPU별 슬롯이므로 같은 슬롯에 대한 동시 쓰기가 없음
            unsafe { *slot = (*slot).wrapping_add(1) };
        }
    }
}

/// `data`/`data_end` 사이의 패킷 바이트 뷰
struct XdpFrame<'a> {
    ctx: &'a XdpContext,
}

impl XdpFrame<'_> {
    /// 검증기가 요구하는 bounds check를 거친 포인터를 반환합니다.
    #[inline(always)]
    fn ptr_at<T>(&self, offset: usize) -> Result<*mut T, Truncated> {
        let start = self.ctx.data();
        let end = self.ctx.data_end();
        let len = mem::size_of::<T>();
        if start + offset + len > end {
            return Err(Truncated {
                offset,
                needed: len,
            });
        }
        Ok((start + offset) as *mut T)
    }
}

impl Frame for XdpFrame<'_> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.ctx.data_end() - self.ctx.data()
    }

    #[inline(always)]
    fn load_u8(&self, offset: usize) -> Result<u8, Truncated> {
        let ptr = self.ptr_at::<u8>(offset)?;
        // SAFETY: ptr_at이 [data, data_end) 범위를 확인함
        Ok(unsafe { *ptr })
    }

    #[inline(always)]
    fn load_be16(&self, offset: usize) -> Result<u16, Truncated> {
        let ptr = self.ptr_at::<[u8; 2]>(offset)?;
        // SAFETY: ptr_at이 범위를 확인했고 [u8; 2]는 정렬 요구가 없음
        Ok(u16::from_be_bytes(unsafe { *ptr }))
    }

    #[inline(always)]
    fn load_be32(&self, offset: usize) -> Result<u32, Truncated> {
        let ptr = self.ptr_at::<[u8; 4]>(offset)?;
        // SAFETY: ptr_at이 범위를 확인했고 [u8; 4]는 정렬 요구가 없음
        Ok(u32::from_be_bytes(unsafe { *ptr }))
    }

    #[inline(always)]
    fn store_be16(&mut self, offset: usize, value: u16) -> Result<(), Truncated> {
        let ptr = self.ptr_at::<[u8; 2]>(offset)?;
        // SAFETY: ptr_at이 범위를 확인했고 XDP 프레임은 쓰기 가능
        unsafe { *ptr = value.to_be_bytes() };
        Ok(())
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

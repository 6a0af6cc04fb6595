//! 분류기 — 파서 단계를 묶어 프레임당 `(프로토콜 인덱스, Verdict)`를 결정
//!
//! # 처리 순서
//! 1. Ethernet 헤더 — 잘리면 카운트 없이 기본 통과
//! 2. VLAN 태그 최대 2겹 제거 — 잘리면 카운트 없이 기본 통과
//! 3. ether type 분기: IPv4 / IPv6 / 그 외(인덱스 0)
//! 4. `counters[index]` 증가 (L3 분기에 도달한 모든 프레임)
//! 5. 단편화된 IPv4만 `Drop`, 나머지는 통과 계열
//!
//! 분류기는 재진입 가능하며 할당하거나 블로킹하지 않습니다.
//! 공유 상태는 [`CounterSink`] 뿐입니다.

use crate::frame::Frame;
use crate::parse::{Ipv4Outcome, PacketMeta, parse_ethernet, parse_ipv4, parse_ipv6, parse_vlan};
use crate::{ETH_P_IP, ETH_P_IPV6, FilterConfig};

/// 프레임 처리 판정
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 변경 없이 통과
    Pass = 0,
    /// 드롭 (단편화된 IPv4)
    Drop = 1,
    /// UDP 목적지 포트를 재작성한 뒤 통과
    RewriteAndPass = 2,
}

impl Verdict {
    /// 통과 계열 판정인지 확인합니다.
    #[inline(always)]
    pub fn is_pass(self) -> bool {
        !matches!(self, Self::Drop)
    }
}

/// 프로토콜 인덱스별 카운터에 대한 증가 전용 접근
///
/// 유저스페이스는 `AtomicU64` 배열, 커널은 PerCpuArray 맵으로 구현합니다.
/// 인덱스는 `u8`이므로 항상 `0..=255` 범위입니다.
pub trait CounterSink {
    /// `index` 카운터를 1 증가시킵니다.
    fn increment(&self, index: u8);
}

/// 프레임 한 개의 분류 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// 프로토콜 인덱스 (0 = 미분류)
    pub index: u8,
    /// 처리 판정
    pub verdict: Verdict,
    /// 카운터에 반영되는 프레임인지 여부 (L3 분기 도달 여부)
    pub counted: bool,
    /// IPv4 경로에서 추출한 메타데이터
    pub meta: Option<PacketMeta>,
}

impl Classification {
    #[inline(always)]
    const fn uncounted() -> Self {
        Self {
            index: 0,
            verdict: Verdict::Pass,
            counted: false,
            meta: None,
        }
    }
}

/// 프레임을 분류합니다 (카운터 미반영).
///
/// UDP 포트 재작성은 이 호출 안에서 제자리로 수행됩니다.
#[inline(always)]
pub fn classify<F: Frame + ?Sized>(frame: &mut F, config: &FilterConfig) -> Classification {
    let Ok(layer) = parse_ethernet(frame, 0) else {
        return Classification::uncounted();
    };

    // 이중 태그(QinQ) 프레임을 위해 의도적으로 두 번 호출
    let Ok(layer) = parse_vlan(frame, layer) else {
        return Classification::uncounted();
    };
    let Ok(layer) = parse_vlan(frame, layer) else {
        return Classification::uncounted();
    };

    let mut result = Classification {
        index: 0,
        verdict: Verdict::Pass,
        counted: true,
        meta: None,
    };

    match layer.ether_type {
        ETH_P_IP => match parse_ipv4(frame, layer.next, config) {
            Ok(Ipv4Outcome::Fragmented { protocol }) => {
                result.index = protocol;
                result.verdict = Verdict::Drop;
            }
            Ok(Ipv4Outcome::Classified {
                protocol,
                meta,
                rewritten,
            }) => {
                result.index = protocol;
                result.meta = Some(meta);
                if rewritten {
                    result.verdict = Verdict::RewriteAndPass;
                }
            }
            Err(_) => {}
        },
        ETH_P_IPV6 => {
            if let Ok(hdr) = parse_ipv6(frame, layer.next) {
                result.index = hdr.next_header;
            }
        }
        _ => {}
    }

    result
}

/// 프레임을 분류하고 카운터를 증가시킵니다.
///
/// 카운트는 판정과 무관하게 먼저 반영됩니다 (단편 드롭도 카운트).
#[inline(always)]
pub fn classify_and_count<F, C>(frame: &mut F, config: &FilterConfig, counters: &C) -> Classification
where
    F: Frame + ?Sized,
    C: CounterSink + ?Sized,
{
    let result = classify(frame, config);
    if result.counted {
        counters.increment(result.index);
    }
    result
}

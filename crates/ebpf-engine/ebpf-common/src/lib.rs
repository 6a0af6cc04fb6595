//! XDP 커널/유저스페이스 공유 타입과 분류 로직
//!
//! 이 크레이트는 `#![no_std]` 환경에서 사용 가능하며, 커널 XDP 프로그램과
//! 유저스페이스(소프트웨어 드라이버, 테스트, 퍼저)가 **같은 분류 코드**를
//! 사용하도록 합니다.
//!
//! # 모듈 구성
//! - [`frame`]: 프레임 버퍼 추상화 ([`Frame`] trait)
//! - [`parse`]: 헤더 파서 (Ethernet, VLAN, IPv4, IPv6, UDP)
//! - [`classify`]: 파서 단계를 묶어 `(프로토콜 인덱스, Verdict)`를 결정
//!
//! # 맵 구성
//! - **PerCpuArray** (`PROTO_COUNTERS`): 프로토콜 번호별 패킷 수, 256 엔트리
//! - **Array** (`FILTER_CONFIG`): 런타임 필터 설정, 1 엔트리

#![cfg_attr(not(test), no_std)]

pub mod classify;
pub mod frame;
pub mod parse;

pub use classify::{Classification, CounterSink, Verdict, classify, classify_and_count};
pub use frame::{Frame, Truncated};
pub use parse::PacketMeta;

// =============================================================================
// 맵 이름 상수
// =============================================================================

/// 프로토콜별 카운터 PerCpuArray 맵 이름
pub const MAP_PROTO_COUNTERS: &str = "PROTO_COUNTERS";
/// 필터 설정 Array 맵 이름
pub const MAP_FILTER_CONFIG: &str = "FILTER_CONFIG";
/// XDP 프로그램 이름
pub const PROGRAM_NAME: &str = "udpfilter";

/// 카운터 테이블 엔트리 수 (프로토콜 인덱스 0..=255)
pub const COUNTER_TABLE_SIZE: u32 = 256;

// =============================================================================
// 헤더 크기
// =============================================================================

/// Ethernet 헤더 크기 (dst MAC + src MAC + ether type)
pub const ETH_HDR_LEN: usize = 14;
/// 802.1Q/802.1AD VLAN 헤더 크기 (TCI + encapsulated proto)
pub const VLAN_HDR_LEN: usize = 4;
/// IPv4 고정 헤더 크기 (옵션 제외)
pub const IPV4_HDR_LEN: usize = 20;
/// IPv6 고정 헤더 크기
pub const IPV6_HDR_LEN: usize = 40;
/// UDP 헤더 크기
pub const UDP_HDR_LEN: usize = 8;

// =============================================================================
// EtherType / 프로토콜 상수
// =============================================================================

/// IPv4 EtherType
pub const ETH_P_IP: u16 = 0x0800;
/// IPv6 EtherType
pub const ETH_P_IPV6: u16 = 0x86DD;
/// 802.1Q VLAN 태그
pub const ETH_P_8021Q: u16 = 0x8100;
/// 802.1AD (QinQ) VLAN 태그
pub const ETH_P_8021AD: u16 = 0x88A8;

/// TCP 프로토콜 번호
pub const PROTO_TCP: u8 = 6;
/// UDP 프로토콜 번호
pub const PROTO_UDP: u8 = 17;

/// IPv4 MF 비트 + fragment offset 마스크 (호스트 바이트 오더)
///
/// DF 비트(0x4000)는 포함하지 않습니다.
pub const IP_FRAGMENT_MASK: u16 = 0x3FFF;

/// 기본 ingress UDP 포트 (Geneve)
pub const DEFAULT_INGRESS_PORT: u16 = 6081;
/// 기본 egress UDP 포트
pub const DEFAULT_EGRESS_PORT: u16 = 6082;

// =============================================================================
// 통과 액션
// =============================================================================

/// 통과 판정 시 XDP_PASS 반환
pub const PASS_ACTION_PASS: u8 = 0;
/// 통과 판정 시 XDP_TX 반환 (수신 인터페이스로 되돌려 보냄)
pub const PASS_ACTION_TX: u8 = 1;

// =============================================================================
// 공유 데이터 구조
// =============================================================================

/// 런타임 필터 설정
///
/// `Array<FilterConfig>` 맵의 0번 엔트리로 커널에 전달됩니다.
/// 맵이 비어 있으면 커널은 [`FilterConfig::DEFAULT`]를 사용합니다.
///
/// # 메모리 레이아웃 (8 바이트, 2바이트 정렬)
/// ```text
/// offset  field         size
/// 0       ingress_port  2
/// 2       egress_port   2
/// 4       pass_action   1
/// 5       _pad          3
/// ```
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(feature = "user", test), derive(Debug))]
pub struct FilterConfig {
    /// 재작성 대상 UDP 목적지 포트 (호스트 바이트 오더)
    pub ingress_port: u16,
    /// 재작성 후 UDP 목적지 포트 (호스트 바이트 오더)
    pub egress_port: u16,
    /// 통과 판정의 XDP 액션 (PASS_ACTION_PASS 또는 PASS_ACTION_TX)
    pub pass_action: u8,
    /// 정렬을 위한 패딩
    pub _pad: [u8; 3],
}

impl FilterConfig {
    /// 기본 설정: 6081 → 6082, XDP_PASS
    pub const DEFAULT: Self = Self {
        ingress_port: DEFAULT_INGRESS_PORT,
        egress_port: DEFAULT_EGRESS_PORT,
        pass_action: PASS_ACTION_PASS,
        _pad: [0; 3],
    };

    /// 포트 쌍과 통과 액션으로 설정을 생성합니다.
    pub const fn new(ingress_port: u16, egress_port: u16, pass_action: u8) -> Self {
        Self {
            ingress_port,
            egress_port,
            pass_action,
            _pad: [0; 3],
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// SAFETY: FilterConfig는 #[repr(C)]이며 모든 필드가 Plain Old Data입니다.
// 패딩도 명시적으로 정의되어 있습니다.
#[cfg(feature = "user")]
unsafe impl aya::Pod for FilterConfig {}

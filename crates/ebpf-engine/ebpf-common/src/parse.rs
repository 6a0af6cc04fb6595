//! 헤더 파서 — 고정 크기 헤더의 필드 추출
//!
//! 각 단계는 `(frame, offset)`을 받아 고정 헤더 전체가 프레임 안에 있는지
//! 먼저 확인하고, 필드와 다음 헤더의 오프셋을 반환합니다.
//! 헤더가 잘려 있으면 [`Truncated`]를 반환하며, 호출자는 "여기서 중단"으로 처리합니다.
//!
//! ```text
//! Ethernet ─▶ VLAN? ─▶ VLAN? ─┬─▶ IPv4 ─▶ UDP (포트 재작성)
//!                             └─▶ IPv6 (next header만)
//! ```

use crate::frame::{Frame, Truncated};
use crate::{
    ETH_HDR_LEN, ETH_P_8021AD, ETH_P_8021Q, FilterConfig, IP_FRAGMENT_MASK, IPV4_HDR_LEN,
    IPV6_HDR_LEN, PROTO_UDP, UDP_HDR_LEN, VLAN_HDR_LEN,
};

/// 프레임 한 개의 분류 중에만 존재하는 메타데이터
///
/// 주소와 포트는 호스트 바이트 오더로 저장합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketMeta {
    /// 출발지 IPv4 주소
    pub source_address: u32,
    /// 목적지 IPv4 주소
    pub dest_address: u32,
    /// 출발지 UDP 포트
    pub source_port: u16,
    /// 목적지 UDP 포트 (재작성 이전 값)
    pub dest_port: u16,
}

/// Ethernet 또는 VLAN 헤더를 지난 지점의 ether type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtherLayer {
    /// 캡슐화된 프로토콜
    pub ether_type: u16,
    /// 다음 헤더의 시작 오프셋
    pub next: usize,
}

/// IPv4 고정 헤더 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    /// IP 프로토콜 번호
    pub protocol: u8,
    /// total length 필드
    pub total_length: u16,
    /// flags + fragment offset 필드 (호스트 바이트 오더)
    pub fragment_flags: u16,
    /// 출발지 주소
    pub source_address: u32,
    /// 목적지 주소
    pub dest_address: u32,
    /// L4 헤더 시작 오프셋 (고정 헤더 길이만큼 전진)
    pub next: usize,
}

impl Ipv4Header {
    /// MF 비트 또는 fragment offset이 설정되어 있는지 확인합니다.
    #[inline(always)]
    pub fn is_fragmented(&self) -> bool {
        self.fragment_flags & IP_FRAGMENT_MASK != 0
    }
}

/// IPv4 파싱 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv4Outcome {
    /// 단편화된 패킷 — L4 헤더가 없을 수 있으므로 드롭 대상
    Fragmented {
        /// IP 프로토콜 번호
        protocol: u8,
    },
    /// 분류 완료
    Classified {
        /// IP 프로토콜 번호
        protocol: u8,
        /// 주소/포트 메타데이터
        meta: PacketMeta,
        /// UDP 목적지 포트가 재작성되었는지 여부
        rewritten: bool,
    },
}

/// IPv6 고정 헤더 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Header {
    /// next header 필드 (확장 헤더 체인은 따라가지 않음)
    pub next_header: u8,
    /// payload length 필드
    pub payload_length: u16,
    /// 다음 헤더의 시작 오프셋
    pub next: usize,
}

/// UDP 파싱 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpOutcome {
    /// 출발지 포트
    pub source_port: u16,
    /// 재작성 이전의 목적지 포트
    pub dest_port: u16,
    /// 목적지 포트를 egress 포트로 바꿨는지 여부
    pub rewritten: bool,
}

/// Ethernet 헤더를 파싱합니다.
#[inline(always)]
pub fn parse_ethernet<F: Frame + ?Sized>(
    frame: &F,
    offset: usize,
) -> Result<EtherLayer, Truncated> {
    ensure(frame, offset, ETH_HDR_LEN)?;
    // dst MAC(6) + src MAC(6) 뒤에 ether type
    let ether_type = frame.load_be16(offset + 12)?;
    Ok(EtherLayer {
        ether_type,
        next: offset + ETH_HDR_LEN,
    })
}

/// VLAN 태그 한 겹을 벗겨냅니다.
///
/// `layer.ether_type`이 802.1Q/802.1AD가 아니면 입력을 그대로 반환합니다.
/// 이중 태그 프레임을 처리하려면 두 번 연속 호출합니다.
#[inline(always)]
pub fn parse_vlan<F: Frame + ?Sized>(frame: &F, layer: EtherLayer) -> Result<EtherLayer, Truncated> {
    if !is_vlan_tag(layer.ether_type) {
        return Ok(layer);
    }
    ensure(frame, layer.next, VLAN_HDR_LEN)?;
    // TCI(2) 뒤에 encapsulated proto
    let ether_type = frame.load_be16(layer.next + 2)?;
    Ok(EtherLayer {
        ether_type,
        next: layer.next + VLAN_HDR_LEN,
    })
}

/// IPv4 고정 헤더 필드를 읽습니다.
#[inline(always)]
pub fn parse_ipv4_header<F: Frame + ?Sized>(
    frame: &F,
    offset: usize,
) -> Result<Ipv4Header, Truncated> {
    ensure(frame, offset, IPV4_HDR_LEN)?;
    Ok(Ipv4Header {
        total_length: frame.load_be16(offset + 2)?,
        fragment_flags: frame.load_be16(offset + 6)?,
        protocol: frame.load_u8(offset + 9)?,
        source_address: frame.load_be32(offset + 12)?,
        dest_address: frame.load_be32(offset + 16)?,
        next: offset + IPV4_HDR_LEN,
    })
}

/// IPv4 패킷을 파싱하고, UDP이면 포트 재작성까지 수행합니다.
///
/// 단편화된 패킷은 UDP 헤더를 보지 않고 [`Ipv4Outcome::Fragmented`]를 반환합니다.
/// UDP 헤더가 잘려 있으면 재작성 없이 프로토콜 번호(17)로 분류합니다.
#[inline(always)]
pub fn parse_ipv4<F: Frame + ?Sized>(
    frame: &mut F,
    offset: usize,
    config: &FilterConfig,
) -> Result<Ipv4Outcome, Truncated> {
    let header = parse_ipv4_header(frame, offset)?;
    if header.is_fragmented() {
        return Ok(Ipv4Outcome::Fragmented {
            protocol: header.protocol,
        });
    }

    let mut meta = PacketMeta {
        source_address: header.source_address,
        dest_address: header.dest_address,
        ..PacketMeta::default()
    };

    let mut rewritten = false;
    if header.protocol == PROTO_UDP {
        if let Ok(udp) = parse_udp(frame, header.next, &mut meta, config) {
            rewritten = udp.rewritten;
        }
    }

    Ok(Ipv4Outcome::Classified {
        protocol: header.protocol,
        meta,
        rewritten,
    })
}

/// IPv6 고정 헤더를 파싱합니다.
#[inline(always)]
pub fn parse_ipv6<F: Frame + ?Sized>(frame: &F, offset: usize) -> Result<Ipv6Header, Truncated> {
    ensure(frame, offset, IPV6_HDR_LEN)?;
    Ok(Ipv6Header {
        payload_length: frame.load_be16(offset + 4)?,
        next_header: frame.load_u8(offset + 6)?,
        next: offset + IPV6_HDR_LEN,
    })
}

/// UDP 헤더를 파싱하고 목적지 포트를 재작성합니다.
///
/// 목적지 포트가 `config.ingress_port`이면 제자리에서 `config.egress_port`로 바꿉니다.
/// 체크섬은 갱신하지 않습니다.
#[inline(always)]
pub fn parse_udp<F: Frame + ?Sized>(
    frame: &mut F,
    offset: usize,
    meta: &mut PacketMeta,
    config: &FilterConfig,
) -> Result<UdpOutcome, Truncated> {
    ensure(frame, offset, UDP_HDR_LEN)?;
    let source_port = frame.load_be16(offset)?;
    let dest_port = frame.load_be16(offset + 2)?;
    meta.source_port = source_port;
    meta.dest_port = dest_port;

    let rewritten = if dest_port == config.ingress_port {
        frame.store_be16(offset + 2, config.egress_port)?;
        true
    } else {
        false
    };

    Ok(UdpOutcome {
        source_port,
        dest_port,
        rewritten,
    })
}

#[inline(always)]
fn is_vlan_tag(ether_type: u16) -> bool {
    ether_type == ETH_P_8021Q || ether_type == ETH_P_8021AD
}

#[inline(always)]
fn ensure<F: Frame + ?Sized>(frame: &F, offset: usize, size: usize) -> Result<(), Truncated> {
    if frame.has(offset, size) {
        Ok(())
    } else {
        Err(Truncated {
            offset,
            needed: size,
        })
    }
}

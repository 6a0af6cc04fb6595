//! Synthetic Ethernet frame builders.

/// Ethernet header with optional VLAN tags in front of `ether_type`.
pub fn ether(tags: &[u16], ether_type: u16) -> Vec<u8> {
    let mut frame = vec![0u8; 12];
    let mut types = tags.to_vec();
    types.push(ether_type);
    frame.extend_from_slice(&types[0].to_be_bytes());
    for next in &types[1..] {
        frame.extend_from_slice(&[0, 0]);
        frame.extend_from_slice(&next.to_be_bytes());
    }
    frame
}

/// Untagged IPv4/UDP frame to `dport`.
pub fn ipv4_udp(dport: u16, frag_off: u16) -> Vec<u8> {
    let mut frame = ether(&[], 0x0800);
    let mut ip = vec![0u8; 20];
    ip[0] = 0x45;
    ip[6..8].copy_from_slice(&frag_off.to_be_bytes());
    ip[8] = 64;
    ip[9] = 17;
    ip[12..16].copy_from_slice(&[192, 168, 0, 1]);
    ip[16..20].copy_from_slice(&[192, 168, 0, 2]);
    frame.extend(ip);
    frame.extend_from_slice(&50000u16.to_be_bytes());
    frame.extend_from_slice(&dport.to_be_bytes());
    frame.extend_from_slice(&[0, 8, 0, 0]);
    frame
}

/// IPv6 frame with the given next header, behind optional VLAN tags.
pub fn ipv6(tags: &[u16], next_header: u8) -> Vec<u8> {
    let mut frame = ether(tags, 0x86DD);
    let mut header = vec![0u8; 40];
    header[0] = 0x60;
    header[6] = next_header;
    frame.extend(header);
    frame
}

/// Destination port of an untagged IPv4/UDP frame.
pub fn udp_dport(frame: &[u8]) -> u16 {
    u16::from_be_bytes([frame[36], frame[37]])
}

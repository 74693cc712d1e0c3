//! Frame parsing: Ethernet II → IPv4 → ICMP/TCP/UDP, just deep enough to
//! build a flow key.
//!
//! Anything the exporter does not track (non-IPv4 EtherTypes, transport
//! protocols other than ICMP/TCP/UDP, truncated headers) parses to `None`
//! and is dropped silently.

use nom::IResult;
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u32, u8 as any_u8};

use std::net::Ipv4Addr;

use crate::flow::{FlowKey, PROTO_ICMP, PROTO_TCP, PROTO_UDP};

/// Fixed Ethernet II header length. VLAN tags are not handled.
pub const ETHERNET_HEADER_LEN: usize = 14;

const ETHERTYPE_IPV4: u16 = 0x0800;

/// Flow-relevant fields of one captured packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPacket {
    pub key: FlowKey,
    /// Raw flag byte from the TCP header; 0 for ICMP and UDP.
    pub tcp_flags: u8,
}

/// True when the frame carries an IPv4 EtherType.
pub fn is_ipv4(frame: &[u8]) -> bool {
    matches!(ether_type(frame), Ok((_, ETHERTYPE_IPV4)))
}

/// Parse the headers of an IPv4 frame into a flow key and TCP flags.
pub fn parse_flow(frame: &[u8]) -> Option<ParsedPacket> {
    let (l3, ether) = ether_type(frame).ok()?;
    if ether != ETHERTYPE_IPV4 {
        return None;
    }

    let (_, ip) = ipv4_header(l3).ok()?;
    let transport = l3.get(ip.header_len..)?;

    let (src_port, dst_port, tcp_flags) = match ip.protocol {
        PROTO_ICMP => {
            let (_, (icmp_type, icmp_code)) = icmp_type_code(transport).ok()?;
            // ICMP has no ports; the destination port encodes type and code.
            (0, u16::from(icmp_type) * 256 + u16::from(icmp_code), 0)
        }
        PROTO_TCP => {
            let (_, (src, dst, flags)) = tcp_ports_flags(transport).ok()?;
            (src, dst, flags)
        }
        PROTO_UDP => {
            let (_, (src, dst)) = udp_ports(transport).ok()?;
            (src, dst, 0)
        }
        _ => return None,
    };

    Some(ParsedPacket {
        key: FlowKey {
            input: 0,
            src_addr: ip.src_addr,
            dst_addr: ip.dst_addr,
            prot: ip.protocol,
            src_port,
            dst_port,
            tos: ip.tos,
        },
        tcp_flags,
    })
}

struct Ipv4Header {
    header_len: usize,
    tos: u8,
    protocol: u8,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
}

fn ether_type(input: &[u8]) -> IResult<&[u8], u16> {
    let (input, _macs) = take(12usize)(input)?;
    be_u16(input)
}

fn ipv4_header(input: &[u8]) -> IResult<&[u8], Ipv4Header> {
    let (rest, version_ihl) = any_u8(input)?;
    let (rest, tos) = any_u8(rest)?;
    let (rest, _total_len) = be_u16(rest)?;
    let (rest, _id_flags_frag) = take(4usize)(rest)?;
    let (rest, _ttl) = any_u8(rest)?;
    let (rest, protocol) = any_u8(rest)?;
    let (rest, _checksum) = be_u16(rest)?;
    let (rest, src) = be_u32(rest)?;
    let (rest, dst) = be_u32(rest)?;

    let header_len = usize::from(version_ihl & 0x0f) * 4;
    if header_len < 20 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }

    Ok((
        rest,
        Ipv4Header {
            header_len,
            tos,
            protocol,
            src_addr: Ipv4Addr::from(src),
            dst_addr: Ipv4Addr::from(dst),
        },
    ))
}

fn icmp_type_code(input: &[u8]) -> IResult<&[u8], (u8, u8)> {
    let (rest, icmp_type) = any_u8(input)?;
    let (rest, icmp_code) = any_u8(rest)?;
    Ok((rest, (icmp_type, icmp_code)))
}

fn tcp_ports_flags(input: &[u8]) -> IResult<&[u8], (u16, u16, u8)> {
    let (rest, src_port) = be_u16(input)?;
    let (rest, dst_port) = be_u16(rest)?;
    // Sequence and acknowledgement numbers, then the data-offset byte.
    let (rest, _) = take(9usize)(rest)?;
    let (rest, flags) = any_u8(rest)?;
    Ok((rest, (src_port, dst_port, flags)))
}

fn udp_ports(input: &[u8]) -> IResult<&[u8], (u16, u16)> {
    let (rest, src_port) = be_u16(input)?;
    let (rest, dst_port) = be_u16(rest)?;
    Ok((rest, (src_port, dst_port)))
}

//! # NetFlow V5 wire codec
//!
//! References:
//! - <https://www.cisco.com/en/US/technologies/tk648/tk362/technologies_white_paper09186a00800a3db9.html>
//!
//! The datagram layout is fixed: a 24-octet header followed by 1 to 30
//! 48-octet flow records, every multibyte field big-endian. Encoding is a
//! field-by-field `to_be_bytes` pass; the `Nom` derives give the matching
//! decoder so produced datagrams can be read back.

use nom::number::complete::be_u32;
use nom_derive::*;
use serde::Serialize;

use std::net::Ipv4Addr;

use crate::ExportError;
use crate::flow::FlowRecord;
use crate::time::PacketTime;

/// Hard cap on records per datagram.
pub const MAX_FLOWS_NUMBER: usize = 30;

/// Encoded header size in octets.
pub const HEADER_LEN: usize = 24;

/// Encoded flow-record size in octets.
pub const RECORD_LEN: usize = 48;

const VERSION: u16 = 5;

#[derive(Nom, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Datagram {
    pub header: Header,
    #[nom(Count = "header.count")]
    pub records: Vec<Record>,
}

#[derive(Nom, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    /// NetFlow export format version number, always 5
    pub version: u16,
    /// Number of flows exported in this packet (1-30)
    pub count: u16,
    /// Milliseconds between the first and the last observed packet
    pub sysuptime_ms: u32,
    /// Seconds part of the last observed packet's timestamp
    pub unix_secs: u32,
    /// Microseconds part of the same timestamp, scaled to nanoseconds
    pub unix_nsecs: u32,
    /// Sequence counter of total flows sent before this datagram
    pub flow_sequence: u32,
    /// Type of flow-switching engine
    pub engine_type: u8,
    /// Slot number of the flow-switching engine
    pub engine_id: u8,
    /// Sampling mode and interval; this exporter never samples
    pub sampling_interval: u16,
}

#[derive(Nom, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Source IP address
    #[nom(Map = "Ipv4Addr::from", Parse = "be_u32")]
    pub src_addr: Ipv4Addr,
    /// Destination IP address
    #[nom(Map = "Ipv4Addr::from", Parse = "be_u32")]
    pub dst_addr: Ipv4Addr,
    /// IP address of next hop router (unknown, zero)
    #[nom(Map = "Ipv4Addr::from", Parse = "be_u32")]
    pub nexthop: Ipv4Addr,
    /// SNMP index of input interface
    pub input: u16,
    /// SNMP index of output interface
    pub output: u16,
    /// Packets in the flow
    pub packets: u32,
    /// Total number of Layer 3 bytes in the packets of the flow
    pub octets: u32,
    /// Sysuptime in milliseconds at the start of the flow
    pub first: u32,
    /// Sysuptime in milliseconds when the last packet of the flow was seen
    pub last: u32,
    /// TCP/UDP source port number or equivalent
    pub src_port: u16,
    /// TCP/UDP destination port number or equivalent
    pub dst_port: u16,
    /// Unused (zero) byte
    pub pad1: u8,
    /// Cumulative OR of TCP flags
    pub tcp_flags: u8,
    /// IP protocol type
    pub prot: u8,
    /// IP type of service
    pub tos: u8,
    /// Autonomous system number of the source
    pub src_as: u16,
    /// Autonomous system number of the destination
    pub dst_as: u16,
    /// Source address prefix mask bits
    pub src_mask: u8,
    /// Destination address prefix mask bits
    pub dst_mask: u8,
    /// Unused (zero) bytes
    pub pad2: u16,
}

impl Record {
    /// Render a cached flow as a wire record. `first`/`last` become
    /// millisecond offsets from the first packet of the run.
    pub fn from_flow(flow: &FlowRecord, origin: PacketTime) -> Self {
        Record {
            src_addr: flow.key.src_addr,
            dst_addr: flow.key.dst_addr,
            nexthop: Ipv4Addr::UNSPECIFIED,
            input: flow.key.input,
            output: 0,
            packets: flow.packets,
            octets: flow.octets,
            first: flow.first.millis_since(origin),
            last: flow.last.millis_since(origin),
            src_port: flow.key.src_port,
            dst_port: flow.key.dst_port,
            pad1: 0,
            tcp_flags: flow.tcp_flags,
            prot: flow.key.prot,
            tos: flow.key.tos,
            src_as: 0,
            dst_as: 0,
            src_mask: 0,
            dst_mask: 0,
            pad2: 0,
        }
    }
}

/// Assemble one datagram from an oldest-first batch of flows.
///
/// `origin` is the first-packet timestamp (the uptime origin), `now` the
/// last-packet timestamp, and `flow_sequence` the sequence counter value
/// before this datagram.
pub fn build_datagram(
    flows: &[FlowRecord],
    origin: PacketTime,
    now: PacketTime,
    flow_sequence: u32,
) -> Result<Datagram, ExportError> {
    if flows.is_empty() || flows.len() > MAX_FLOWS_NUMBER {
        return Err(ExportError::WireEncode(flows.len()));
    }

    let header = Header {
        version: VERSION,
        count: flows.len() as u16,
        sysuptime_ms: now.millis_since(origin),
        unix_secs: now.secs,
        unix_nsecs: now.micros.wrapping_mul(1_000),
        flow_sequence,
        engine_type: 0,
        engine_id: 0,
        sampling_interval: 0,
    };

    let records = flows
        .iter()
        .map(|flow| Record::from_flow(flow, origin))
        .collect();

    Ok(Datagram { header, records })
}

impl Datagram {
    /// Encode the datagram in network byte order.
    ///
    /// Fails with [`ExportError::WireEncode`] on an empty or oversized
    /// record list and with [`ExportError::Memory`] when the output
    /// buffer cannot be reserved.
    pub fn encode(&self) -> Result<Vec<u8>, ExportError> {
        let count = self.records.len();
        if count == 0 || count > MAX_FLOWS_NUMBER {
            return Err(ExportError::WireEncode(count));
        }
        debug_assert_eq!(count, usize::from(self.header.count));

        let mut packet = Vec::new();
        packet
            .try_reserve_exact(HEADER_LEN + count * RECORD_LEN)
            .map_err(|_| ExportError::Memory)?;

        packet.extend_from_slice(&self.header.version.to_be_bytes());
        packet.extend_from_slice(&self.header.count.to_be_bytes());
        packet.extend_from_slice(&self.header.sysuptime_ms.to_be_bytes());
        packet.extend_from_slice(&self.header.unix_secs.to_be_bytes());
        packet.extend_from_slice(&self.header.unix_nsecs.to_be_bytes());
        packet.extend_from_slice(&self.header.flow_sequence.to_be_bytes());
        packet.extend_from_slice(&self.header.engine_type.to_be_bytes());
        packet.extend_from_slice(&self.header.engine_id.to_be_bytes());
        packet.extend_from_slice(&self.header.sampling_interval.to_be_bytes());

        for record in &self.records {
            packet.extend_from_slice(&record.src_addr.octets());
            packet.extend_from_slice(&record.dst_addr.octets());
            packet.extend_from_slice(&record.nexthop.octets());
            packet.extend_from_slice(&record.input.to_be_bytes());
            packet.extend_from_slice(&record.output.to_be_bytes());
            packet.extend_from_slice(&record.packets.to_be_bytes());
            packet.extend_from_slice(&record.octets.to_be_bytes());
            packet.extend_from_slice(&record.first.to_be_bytes());
            packet.extend_from_slice(&record.last.to_be_bytes());
            packet.extend_from_slice(&record.src_port.to_be_bytes());
            packet.extend_from_slice(&record.dst_port.to_be_bytes());
            packet.extend_from_slice(&record.pad1.to_be_bytes());
            packet.extend_from_slice(&record.tcp_flags.to_be_bytes());
            packet.extend_from_slice(&record.prot.to_be_bytes());
            packet.extend_from_slice(&record.tos.to_be_bytes());
            packet.extend_from_slice(&record.src_as.to_be_bytes());
            packet.extend_from_slice(&record.dst_as.to_be_bytes());
            packet.extend_from_slice(&record.src_mask.to_be_bytes());
            packet.extend_from_slice(&record.dst_mask.to_be_bytes());
            packet.extend_from_slice(&record.pad2.to_be_bytes());
        }

        Ok(packet)
    }
}

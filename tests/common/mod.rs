//! Shared fixtures for the integration tests: frame builders, an
//! in-memory datagram sink, and a V5 decoder shorthand.

#![allow(dead_code)]

use etherparse::PacketBuilder;
use nom_derive::Parse;

use std::io;

use netflow_export::exporter::DatagramSink;
use netflow_export::v5::Datagram;

/// Collects every datagram the exporter sends.
#[derive(Default)]
pub struct VecSink {
    pub datagrams: Vec<Vec<u8>>,
}

impl DatagramSink for VecSink {
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize> {
        self.datagrams.push(datagram.to_vec());
        Ok(datagram.len())
    }
}

/// A sink whose sends always fail.
pub struct FailingSink;

impl DatagramSink for FailingSink {
    fn send(&mut self, _datagram: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "collector gone"))
    }
}

pub fn decode(bytes: &[u8]) -> Datagram {
    let (remaining, datagram) = Datagram::parse(bytes).expect("well-formed V5 datagram");
    assert!(remaining.is_empty(), "datagram carries trailing bytes");
    datagram
}

/// UDP frame with `payload_len` bytes of payload; the IP total length is
/// `28 + payload_len`.
pub fn udp_frame(
    src: [u8; 4],
    dst: [u8; 4],
    src_port: u16,
    dst_port: u16,
    payload_len: usize,
) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 1], [2, 0, 0, 0, 0, 2])
        .ipv4(src, dst, 64)
        .udp(src_port, dst_port);
    let payload = vec![0u8; payload_len];
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, &payload).unwrap();
    frame
}

/// TCP frame; `fin` controls the FIN flag, ACK is always set.
pub fn tcp_frame(
    src: [u8; 4],
    dst: [u8; 4],
    src_port: u16,
    dst_port: u16,
    fin: bool,
) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 1], [2, 0, 0, 0, 0, 2])
        .ipv4(src, dst, 64)
        .tcp(src_port, dst_port, 1, 8192);
    let builder = if fin { builder.fin().ack(1) } else { builder.ack(1) };
    let mut frame = Vec::with_capacity(builder.size(0));
    builder.write(&mut frame, &[]).unwrap();
    frame
}

/// ICMP echo-request frame (type 8, code 0).
pub fn icmp_echo_frame(src: [u8; 4], dst: [u8; 4]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 1], [2, 0, 0, 0, 0, 2])
        .ipv4(src, dst, 64)
        .icmpv4_echo_request(1, 1);
    let mut frame = Vec::with_capacity(builder.size(0));
    builder.write(&mut frame, &[]).unwrap();
    frame
}

/// Serialize frames into a legacy pcap byte stream (Ethernet link type).
pub fn legacy_pcap(frames: &[(u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // Ethernet
    for (secs, micros, data) in frames {
        out.extend_from_slice(&secs.to_le_bytes());
        out.extend_from_slice(&micros.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

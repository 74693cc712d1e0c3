//! Byte-level checks of the V5 codec: fixed offsets, big-endian fields,
//! and the encode/decode round trip.

mod common;

use common::*;

use std::net::Ipv4Addr;

use netflow_export::flow::{CacheId, FlowKey, FlowRecord, PROTO_TCP, PROTO_UDP};
use netflow_export::v5::{self, HEADER_LEN, MAX_FLOWS_NUMBER, RECORD_LEN};
use netflow_export::{ExportError, PacketTime};

fn flow(src_port: u16, first_secs: u32, id: u64) -> FlowRecord {
    let key = FlowKey {
        input: 0,
        src_addr: Ipv4Addr::new(10, 0, 0, 1),
        dst_addr: Ipv4Addr::new(10, 0, 0, 2),
        prot: PROTO_UDP,
        src_port,
        dst_port: 53,
        tos: 0,
    };
    FlowRecord::open(key, PacketTime::new(first_secs, 0), 60, 0, CacheId::new(id))
}

#[test]
fn known_datagram_encodes_to_known_bytes() {
    let key = FlowKey {
        input: 0,
        src_addr: Ipv4Addr::new(1, 2, 3, 4),
        dst_addr: Ipv4Addr::new(5, 6, 7, 8),
        prot: PROTO_TCP,
        src_port: 0x1234,
        dst_port: 0x0050,
        tos: 0xa0,
    };
    let mut record = FlowRecord::open(key, PacketTime::new(1000, 500_000), 0, 0x1b, CacheId::ZERO);
    record.packets = 3;
    record.octets = 0x100;
    record.last = PacketTime::new(1001, 0);

    let origin = PacketTime::new(1000, 0);
    let now = PacketTime::new(1001, 250_000);
    let datagram = v5::build_datagram(std::slice::from_ref(&record), origin, now, 7).unwrap();
    let bytes = datagram.encode().unwrap();

    let expected = hex::decode(concat!(
        // header: version, count, sysuptime, unix_secs, unix_nsecs,
        // flow_sequence, engine_type/id, sampling_interval
        "00050001",
        "000004e2",
        "000003e9",
        "0ee6b280",
        "00000007",
        "00000000",
        // record
        "01020304",
        "05060708",
        "00000000",
        "00000000",
        "00000003",
        "00000100",
        "000001f4",
        "000003e8",
        "12340050",
        "001b06a0",
        "00000000",
        "00000000",
    ))
    .unwrap();

    assert_eq!(bytes.len(), HEADER_LEN + RECORD_LEN);
    assert_eq!(bytes, expected);
}

#[test]
fn encode_decode_encode_is_identity() {
    let origin = PacketTime::new(500, 100);
    let now = PacketTime::new(540, 900_000);
    let flows: Vec<FlowRecord> = (0..MAX_FLOWS_NUMBER)
        .map(|i| {
            let mut record = flow(1000 + i as u16, 500 + i as u32, i as u64);
            record.update(PacketTime::new(510 + i as u32, 42), 1500, 0);
            record
        })
        .collect();

    let datagram = v5::build_datagram(&flows, origin, now, 999).unwrap();
    let bytes = datagram.encode().unwrap();

    let decoded = decode(&bytes);
    assert_eq!(decoded, datagram);
    assert_eq!(decoded.encode().unwrap(), bytes);
}

#[test]
fn count_limits_are_enforced() {
    let origin = PacketTime::new(100, 0);

    assert_eq!(
        v5::build_datagram(&[], origin, origin, 0),
        Err(ExportError::WireEncode(0))
    );

    let too_many: Vec<FlowRecord> = (0..MAX_FLOWS_NUMBER + 1)
        .map(|i| flow(i as u16, 100, i as u64))
        .collect();
    assert_eq!(
        v5::build_datagram(&too_many, origin, origin, 0),
        Err(ExportError::WireEncode(31))
    );

    let full: Vec<FlowRecord> = (0..MAX_FLOWS_NUMBER)
        .map(|i| flow(i as u16, 100, i as u64))
        .collect();
    let datagram = v5::build_datagram(&full, origin, origin, 0).unwrap();
    assert_eq!(
        datagram.encode().unwrap().len(),
        HEADER_LEN + MAX_FLOWS_NUMBER * RECORD_LEN
    );
}

#[test]
fn zeroed_fields_stay_zero_on_the_wire() {
    let origin = PacketTime::new(100, 0);
    let datagram = v5::build_datagram(&[flow(1, 100, 0)], origin, origin, 0).unwrap();
    let record = &datagram.records[0];

    assert_eq!(record.nexthop, Ipv4Addr::UNSPECIFIED);
    assert_eq!(record.input, 0);
    assert_eq!(record.output, 0);
    assert_eq!((record.src_as, record.dst_as), (0, 0));
    assert_eq!((record.src_mask, record.dst_mask), (0, 0));
    assert_eq!((record.pad1, record.pad2), (0, 0));

    let header = &datagram.header;
    assert_eq!(header.engine_type, 0);
    assert_eq!(header.engine_id, 0);
    assert_eq!(header.sampling_interval, 0);
}

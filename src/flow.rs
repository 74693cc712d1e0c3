//! Flow identity, the mutable flow record, and the age ordering used for
//! eviction and export sequencing.

use serde::Serialize;

use std::cmp::Ordering;
use std::net::Ipv4Addr;

use crate::time::PacketTime;

/// IANA protocol numbers the aggregator tracks.
pub const PROTO_ICMP: u8 = 1;
pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

/// TCP flag bits that terminate a flow.
pub const TCP_FIN: u8 = 0x01;
pub const TCP_RST: u8 = 0x04;

/// Identity of a unidirectional flow.
///
/// The derived `Ord` is the cache's key order: lexicographic over
/// `(input, src_addr, dst_addr, prot, src_port, dst_port, tos)`.
/// `Ipv4Addr` compares as its four raw octets, and ports are stored in
/// host byte order, so the derive gives exactly the comparison the cache
/// needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FlowKey {
    /// Ingress interface index. Always 0; the capture carries no
    /// interface information.
    pub input: u16,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub prot: u8,
    /// Source port in host byte order. 0 for ICMP.
    pub src_port: u16,
    /// Destination port in host byte order. For ICMP this is
    /// `type * 256 + code`.
    pub dst_port: u16,
    pub tos: u8,
}

/// Per-flow cache identifier living on a circle of size 2^63.
///
/// Ids break age-order ties between flows whose first packets share a
/// timestamp. The comparison is wrap-aware so that an old survivor still
/// orders before entries created after the counter wrapped past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CacheId(u64);

const ID_MODULUS: u64 = 1 << 63;
const ID_HALF_RANGE: u64 = 1 << 62;

impl CacheId {
    pub const ZERO: CacheId = CacheId(0);

    pub fn new(value: u64) -> Self {
        CacheId(value % ID_MODULUS)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// The id issued after this one, wrapping modulo 2^63.
    pub fn next(self) -> CacheId {
        CacheId((self.0 + 1) % ID_MODULUS)
    }

    /// Age comparison: `self` is older than `other` iff
    /// `(self - other) mod 2^63 > 2^62`.
    ///
    /// This is a strict total order as long as all live ids span less
    /// than a 2^62-wide window, which the bounded cache guarantees.
    pub fn age_cmp(self, other: CacheId) -> Ordering {
        let distance = self.0.wrapping_sub(other.0) & (ID_MODULUS - 1);
        if distance == 0 {
            Ordering::Equal
        } else if distance > ID_HALF_RANGE {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}

/// Position of a flow in age order: ascending `first` timestamp, ties
/// broken by the wrap-aware cache-id relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeKey {
    pub first: PacketTime,
    pub cache_id: CacheId,
}

impl Ord for AgeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.first
            .cmp(&other.first)
            .then_with(|| self.cache_id.age_cmp(other.cache_id))
    }
}

impl PartialOrd for AgeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Live state of one flow.
///
/// Carries its own key so an exported record is self-contained, the same
/// way a V5 wire record repeats the addresses and ports.
#[derive(Debug, Clone, Serialize)]
pub struct FlowRecord {
    pub key: FlowKey,
    pub packets: u32,
    pub octets: u32,
    /// OR-accumulation of every TCP flag byte seen on the flow.
    pub tcp_flags: u8,
    pub first: PacketTime,
    pub last: PacketTime,
    pub cache_id: CacheId,
}

impl FlowRecord {
    /// Open a new flow for its first packet.
    pub fn open(
        key: FlowKey,
        timestamp: PacketTime,
        octets: u32,
        tcp_flags: u8,
        cache_id: CacheId,
    ) -> Self {
        Self {
            key,
            packets: 1,
            octets,
            tcp_flags,
            first: timestamp,
            last: timestamp,
            cache_id,
        }
    }

    /// Fold another packet into the flow. `first` and `cache_id` never
    /// change after `open`, which keeps the age index valid.
    pub fn update(&mut self, timestamp: PacketTime, octets: u32, tcp_flags: u8) {
        self.packets = self.packets.wrapping_add(1);
        self.octets = self.octets.wrapping_add(octets);
        self.tcp_flags |= tcp_flags;
        self.last = timestamp;
    }

    /// True once a RST or FIN has been seen.
    pub fn is_terminated(&self) -> bool {
        self.tcp_flags & (TCP_FIN | TCP_RST) != 0
    }

    pub fn age_key(&self) -> AgeKey {
        AgeKey {
            first: self.first,
            cache_id: self.cache_id,
        }
    }
}

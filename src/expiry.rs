//! Flow expiry rules.
//!
//! A sweep inspects every cached flow against the current packet
//! timestamp and moves the expired ones into a transient export cache,
//! which preserves their age order for the exporter.

use tracing::trace;

use crate::cache::FlowCache;
use crate::flow::{FlowKey, FlowRecord};
use crate::time::PacketTime;

/// Active and inactive timeouts, in whole seconds.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryPolicy {
    pub active_secs: u64,
    pub inactive_secs: u64,
}

impl ExpiryPolicy {
    pub fn new(active_secs: u64, inactive_secs: u64) -> Self {
        Self {
            active_secs,
            inactive_secs,
        }
    }

    /// A flow is expired when it has lived longer than the active
    /// timeout, idled longer than the inactive timeout, or carries a
    /// FIN/RST. Both timer comparisons are strict: a flow exactly at the
    /// threshold is not yet expired.
    pub fn is_expired(&self, record: &FlowRecord, now: PacketTime) -> bool {
        now.seconds_since(record.first) > self.active_secs
            || now.seconds_since(record.last) > self.inactive_secs
            || record.is_terminated()
    }
}

/// Move every expired flow from `cache` into `expired`, preserving
/// timestamps, counters, flags and cache id.
pub fn sweep(cache: &mut FlowCache, now: PacketTime, policy: &ExpiryPolicy, expired: &mut FlowCache) {
    let keys: Vec<FlowKey> = cache
        .values()
        .filter(|record| policy.is_expired(record, now))
        .map(|record| record.key)
        .collect();

    for key in keys {
        if let Some(record) = cache.remove(&key) {
            trace!(
                src = %record.key.src_addr,
                dst = %record.key.dst_addr,
                prot = record.key.prot,
                packets = record.packets,
                "flow expired"
            );
            expired.insert(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{CacheId, FlowKey, PROTO_TCP, PROTO_UDP, TCP_FIN, TCP_RST};

    use std::net::Ipv4Addr;

    fn flow(src_port: u16, prot: u8, first: u32, last: u32, flags: u8, id: u64) -> FlowRecord {
        let key = FlowKey {
            input: 0,
            src_addr: Ipv4Addr::new(10, 1, 0, 1),
            dst_addr: Ipv4Addr::new(10, 1, 0, 2),
            prot,
            src_port,
            dst_port: 80,
            tos: 0,
        };
        let mut record = FlowRecord::open(key, PacketTime::new(first, 0), 60, flags, CacheId::new(id));
        record.last = PacketTime::new(last, 0);
        record
    }

    const POLICY: ExpiryPolicy = ExpiryPolicy {
        active_secs: 60,
        inactive_secs: 10,
    };

    #[test]
    fn active_timeout_is_strict() {
        let record = flow(1, PROTO_UDP, 100, 160, 0, 0);
        // Exactly 60 seconds old: not expired yet.
        assert!(!POLICY.is_expired(&record, PacketTime::new(160, 999_999)));
        assert!(POLICY.is_expired(&record, PacketTime::new(161, 0)));
    }

    #[test]
    fn inactive_timeout_is_strict() {
        let record = flow(1, PROTO_UDP, 100, 100, 0, 0);
        assert!(!POLICY.is_expired(&record, PacketTime::new(110, 0)));
        assert!(POLICY.is_expired(&record, PacketTime::new(111, 0)));
    }

    #[test]
    fn fin_and_rst_expire_immediately() {
        let fin = flow(1, PROTO_TCP, 100, 100, TCP_FIN, 0);
        let rst = flow(2, PROTO_TCP, 100, 100, TCP_RST, 1);
        let now = PacketTime::new(100, 1);
        assert!(POLICY.is_expired(&fin, now));
        assert!(POLICY.is_expired(&rst, now));
    }

    #[test]
    fn sweep_moves_only_expired_flows() {
        let mut cache = FlowCache::new();
        cache.insert(flow(1, PROTO_UDP, 100, 100, 0, 0)); // idle 20s: expired
        cache.insert(flow(2, PROTO_UDP, 115, 118, 0, 1)); // fresh
        cache.insert(flow(3, PROTO_TCP, 116, 119, TCP_FIN, 2)); // terminated

        let mut expired = FlowCache::new();
        sweep(&mut cache, PacketTime::new(120, 0), &POLICY, &mut expired);

        assert_eq!(cache.len(), 1);
        assert_eq!(expired.len(), 2);
        assert_eq!(expired.pop_oldest().unwrap().key.src_port, 1);
        assert_eq!(expired.pop_oldest().unwrap().key.src_port, 3);
    }

    #[test]
    fn sweep_copies_preserve_record_state() {
        let mut cache = FlowCache::new();
        let mut record = flow(9, PROTO_TCP, 100, 105, 0x18, 42);
        record.packets = 7;
        record.octets = 4200;
        cache.insert(record);

        let mut expired = FlowCache::new();
        sweep(&mut cache, PacketTime::new(200, 0), &POLICY, &mut expired);

        let exported = expired.pop_oldest().unwrap();
        assert_eq!(exported.packets, 7);
        assert_eq!(exported.octets, 4200);
        assert_eq!(exported.tcp_flags, 0x18);
        assert_eq!(exported.first, PacketTime::new(100, 0));
        assert_eq!(exported.last, PacketTime::new(105, 0));
        assert_eq!(exported.cache_id, CacheId::new(42));
    }
}

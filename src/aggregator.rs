//! Per-packet aggregation: timestamps, expiry sweeps, cache updates and
//! capacity eviction.

use tracing::{debug, trace};

use crate::ExportError;
use crate::cache::FlowCache;
use crate::expiry::{self, ExpiryPolicy};
use crate::exporter::{DatagramSink, Exporter};
use crate::flow::{CacheId, FlowRecord};
use crate::packet::{self, ETHERNET_HEADER_LEN};
use crate::time::PacketTime;

/// All flow-recording state of one exporter run.
///
/// Owned by the pipeline and touched only from its loop; the counters the
/// original kept as process-wide statics live here as plain fields.
pub struct RecordingSystem {
    cache: FlowCache,
    capacity: usize,
    policy: ExpiryPolicy,
    first_packet_time: Option<PacketTime>,
    last_packet_time: PacketTime,
    next_cache_id: CacheId,
}

impl RecordingSystem {
    pub fn new(capacity: usize, policy: ExpiryPolicy) -> Self {
        Self {
            cache: FlowCache::new(),
            capacity,
            policy,
            first_packet_time: None,
            last_packet_time: PacketTime::default(),
            next_cache_id: CacheId::ZERO,
        }
    }

    /// Number of flows currently cached.
    pub fn cached_flows(&self) -> usize {
        self.cache.len()
    }

    /// Timestamp of the first processed packet, the uptime origin.
    pub fn first_packet_time(&self) -> Option<PacketTime> {
        self.first_packet_time
    }

    /// Feed one captured frame through the aggregation pipeline.
    ///
    /// `wire_len` is the original frame length from the capture header;
    /// layer-3 octets are counted as `wire_len - 14`. Non-IPv4 frames are
    /// ignored entirely. IPv4 frames always update the run timestamps and
    /// trigger an expiry sweep, even when their transport protocol is not
    /// tracked.
    pub fn process_frame<S: DatagramSink>(
        &mut self,
        timestamp: PacketTime,
        wire_len: u32,
        frame: &[u8],
        exporter: &mut Exporter<S>,
    ) -> Result<(), ExportError> {
        if !packet::is_ipv4(frame) {
            return Ok(());
        }

        let origin = *self.first_packet_time.get_or_insert(timestamp);
        self.last_packet_time = timestamp;

        // Export everything the current timestamp expires before the
        // packet itself is looked up.
        let mut expired = FlowCache::new();
        expiry::sweep(&mut self.cache, timestamp, &self.policy, &mut expired);
        if !expired.is_empty() {
            let mut flows = Vec::with_capacity(expired.len());
            expired.drain_oldest_first(|record| flows.push(record));
            exporter.export(&flows, origin, timestamp)?;
        }

        let Some(parsed) = packet::parse_flow(frame) else {
            return Ok(());
        };
        let layer3_octets = wire_len.saturating_sub(ETHERNET_HEADER_LEN as u32);

        match self.cache.lookup_mut(&parsed.key) {
            Some(record) => {
                record.update(timestamp, layer3_octets, parsed.tcp_flags);
                trace!(src_port = parsed.key.src_port, packets = record.packets, "flow updated");
            }
            None => {
                if self.cache.len() >= self.capacity {
                    // Full cache: the oldest flow makes room and goes out
                    // as its own datagram.
                    if let Some(oldest) = self.cache.pop_oldest() {
                        debug!(evicted_src = %oldest.key.src_addr, "cache full, evicting oldest flow");
                        exporter.export(&[oldest], origin, timestamp)?;
                    }
                }

                let cache_id = self.next_cache_id;
                self.next_cache_id = cache_id.next();
                self.cache.insert(FlowRecord::open(
                    parsed.key,
                    timestamp,
                    layer3_octets,
                    parsed.tcp_flags,
                    cache_id,
                ));
            }
        }

        Ok(())
    }

    /// End-of-stream flush: drain the cache oldest-first, each flow going
    /// out as its own datagram. The expiry timers play no role here; the
    /// header keeps the last-packet timestamp unchanged.
    pub fn flush<S: DatagramSink>(&mut self, exporter: &mut Exporter<S>) -> Result<(), ExportError> {
        // A non-empty cache implies at least one processed packet.
        let origin = self.first_packet_time.unwrap_or_default();
        let last = self.last_packet_time;

        while let Some(record) = self.cache.pop_oldest() {
            exporter.export(std::slice::from_ref(&record), origin, last)?;
        }
        Ok(())
    }
}

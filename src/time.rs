//! Packet timestamps as captured, plus the arithmetic the exporter needs.

use serde::Serialize;

/// Timestamp of a captured packet, straight from the pcap record header.
///
/// Seconds and microseconds are kept separate because every wire field
/// derived from a timestamp (sysuptime, `unix_secs`, `unix_nsecs`) is
/// defined over one of the two parts, and the expiry timers compare whole
/// seconds only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct PacketTime {
    pub secs: u32,
    pub micros: u32,
}

impl PacketTime {
    pub fn new(secs: u32, micros: u32) -> Self {
        Self { secs, micros }
    }

    /// Total microseconds since the epoch.
    pub fn as_micros(self) -> u64 {
        u64::from(self.secs) * 1_000_000 + u64::from(self.micros)
    }

    /// Milliseconds elapsed since `origin`, truncated to the u32 the V5
    /// header and record fields carry.
    pub fn millis_since(self, origin: PacketTime) -> u32 {
        (self.as_micros().saturating_sub(origin.as_micros()) / 1_000) as u32
    }

    /// Whole seconds elapsed since `origin`. The sub-second parts do not
    /// participate; the expiry timers are defined over the seconds fields.
    pub fn seconds_since(self, origin: PacketTime) -> u64 {
        u64::from(self.secs).saturating_sub(u64::from(origin.secs))
    }
}

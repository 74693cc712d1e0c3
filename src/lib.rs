#![doc = include_str!("../README.md")]

pub mod aggregator;
pub mod cache;
pub mod capture;
pub mod expiry;
pub mod exporter;
pub mod flow;
pub mod options;
pub mod packet;
pub mod pipeline;
pub mod resolver;
pub mod time;
pub mod v5;

// Re-export the types a typical embedding touches.
pub use aggregator::RecordingSystem;
pub use cache::FlowCache;
pub use capture::Capture;
pub use expiry::ExpiryPolicy;
pub use exporter::{DatagramSink, Exporter, UdpSink};
pub use flow::{FlowKey, FlowRecord};
pub use options::{Invocation, Options};
pub use pipeline::RunReport;
pub use time::PacketTime;

/// Everything that can go wrong over an exporter run.
///
/// Each variant is a distinct failure kind; all of them are fatal. The
/// binary prints the message to stderr behind an `Error: ` prefix and,
/// for the option-shaped kinds, re-prints the usage text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// Unknown flag, missing flag argument, or a malformed collector port.
    InvalidOption,
    /// The capture file cannot be opened or is not an Ethernet capture.
    InvalidInputFile(String),
    /// A flag was given more than once.
    MultipleOption,
    /// Active timeout outside 60..=3600 seconds.
    ActiveRange,
    /// Inactive timeout outside 10..=600 seconds.
    InactiveRange,
    /// Flow-cache size outside 1024..=524288 entries.
    EntriesNumber,
    /// An allocation the exporter needs was refused.
    Memory,
    /// Collector resolution or socket setup failed.
    Socket(String),
    /// The capture stream could not be read.
    Pcap(String),
    /// A datagram could not be handed to the collector.
    PacketSend(String),
    /// A datagram was requested with zero or more than 30 records.
    WireEncode(usize),
}

impl ExportError {
    /// Kinds after which the usage text is printed again.
    pub fn wants_usage(&self) -> bool {
        matches!(
            self,
            ExportError::InvalidOption
                | ExportError::MultipleOption
                | ExportError::ActiveRange
                | ExportError::InactiveRange
        )
    }
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::InvalidOption => write!(f, "invalid option"),
            ExportError::InvalidInputFile(detail) => {
                write!(f, "invalid input file: {detail}")
            }
            ExportError::MultipleOption => write!(f, "multi entry of an option"),
            ExportError::ActiveRange => write!(f, "active timeout not in range <60,3600>"),
            ExportError::InactiveRange => {
                write!(f, "inactive timeout not in range <10,600>")
            }
            ExportError::EntriesNumber => {
                write!(f, "flow-cache size not in range <1024,524288>")
            }
            ExportError::Memory => write!(f, "error while handling memory"),
            ExportError::Socket(detail) => write!(f, "socket error: {detail}"),
            ExportError::Pcap(detail) => write!(f, "pcap processing error: {detail}"),
            ExportError::PacketSend(detail) => {
                write!(f, "packet sending failed: {detail}")
            }
            ExportError::WireEncode(count) => {
                write!(f, "cannot encode a datagram with {count} flow records")
            }
        }
    }
}

impl std::error::Error for ExportError {}

//! Batching exporter and the datagram sink it writes through.

use tracing::debug;

use std::io;
use std::net::{SocketAddr, UdpSocket};

use crate::ExportError;
use crate::flow::FlowRecord;
use crate::time::PacketTime;
use crate::v5::{self, MAX_FLOWS_NUMBER};

/// Destination for encoded datagrams.
///
/// The exporter treats the collector as an opaque byte sink; tests
/// substitute an in-memory implementation.
pub trait DatagramSink {
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize>;
}

impl<S: DatagramSink + ?Sized> DatagramSink for &mut S {
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize> {
        (**self).send(datagram)
    }
}

/// Connected UDP socket towards the collector.
pub struct UdpSink {
    socket: UdpSocket,
}

impl UdpSink {
    /// Bind an ephemeral local socket and connect it to the collector, so
    /// every datagram goes out with a plain `send`.
    pub fn connect(collector: SocketAddr) -> Result<Self, ExportError> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .map_err(|err| ExportError::Socket(err.to_string()))?;
        socket
            .connect(collector)
            .map_err(|err| ExportError::Socket(err.to_string()))?;
        Ok(Self { socket })
    }
}

impl DatagramSink for UdpSink {
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize> {
        self.socket.send(datagram)
    }
}

/// Sends flow batches as V5 datagrams and owns the sequence counter.
pub struct Exporter<S> {
    sink: S,
    flow_sequence: u32,
    flows_exported: u64,
    datagrams_sent: u64,
}

impl<S: DatagramSink> Exporter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            flow_sequence: 0,
            flows_exported: 0,
            datagrams_sent: 0,
        }
    }

    /// Emit `flows` (already in age order) in batches of up to 30 records
    /// per datagram. A send failure is fatal for the whole run.
    pub fn export(
        &mut self,
        flows: &[FlowRecord],
        origin: PacketTime,
        now: PacketTime,
    ) -> Result<(), ExportError> {
        for batch in flows.chunks(MAX_FLOWS_NUMBER) {
            let datagram = v5::build_datagram(batch, origin, now, self.flow_sequence)?;
            let bytes = datagram.encode()?;

            let sent = self
                .sink
                .send(&bytes)
                .map_err(|err| ExportError::PacketSend(err.to_string()))?;
            if sent != bytes.len() {
                return Err(ExportError::PacketSend(format!(
                    "short send: {sent} of {} bytes",
                    bytes.len()
                )));
            }

            self.flow_sequence = self.flow_sequence.wrapping_add(batch.len() as u32);
            self.flows_exported += batch.len() as u64;
            self.datagrams_sent += 1;

            debug!(
                records = batch.len(),
                sequence = datagram.header.flow_sequence,
                "datagram sent"
            );
        }

        Ok(())
    }

    /// Sequence counter value for the next datagram.
    pub fn flow_sequence(&self) -> u32 {
        self.flow_sequence
    }

    /// Total flows exported over the run.
    pub fn flows_exported(&self) -> u64 {
        self.flows_exported
    }

    /// Total datagrams handed to the sink.
    pub fn datagrams_sent(&self) -> u64 {
        self.datagrams_sent
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

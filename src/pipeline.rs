//! The run loop: capture in, datagrams out.

use tracing::{debug, info, warn};

use crate::ExportError;
use crate::aggregator::RecordingSystem;
use crate::capture::Capture;
use crate::exporter::{DatagramSink, Exporter};

/// Totals reported to the operator after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Flow records exported over the run.
    pub flows: u64,
    /// Datagrams handed to the collector.
    pub datagrams: u64,
}

/// Pull every frame out of the capture, aggregate it, and flush the cache
/// oldest-first on loop exit.
///
/// The first error ends the loop, but the cached flows are still flushed
/// before it surfaces — unless the error is a failed send, in which case
/// the collector socket itself is the broken resource and the flush is
/// skipped.
pub fn run<S: DatagramSink>(
    capture: &mut Capture,
    records: &mut RecordingSystem,
    exporter: &mut Exporter<S>,
) -> Result<RunReport, ExportError> {
    let mut frames: u64 = 0;

    let outcome = loop {
        let frame = match capture.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        };
        frames += 1;
        debug!(frame = frames, len = frame.wire_len, "processing frame");
        if let Err(err) =
            records.process_frame(frame.timestamp, frame.wire_len, &frame.data, exporter)
        {
            break Err(err);
        }
    };

    match outcome {
        Ok(()) => records.flush(exporter)?,
        Err(err @ ExportError::PacketSend(_)) => return Err(err),
        Err(err) => {
            if let Err(flush_err) = records.flush(exporter) {
                warn!(%flush_err, "flush after fatal error failed");
            }
            return Err(err);
        }
    }

    let report = RunReport {
        flows: exporter.flows_exported(),
        datagrams: exporter.datagrams_sent(),
    };
    info!(
        frames,
        flows = report.flows,
        datagrams = report.datagrams,
        "capture drained"
    );
    Ok(report)
}

//! Capture ingestion: timestamped Ethernet frames out of a legacy pcap
//! stream, from a file or stdin.

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, Linktype, PcapBlockOwned, PcapError};

use std::cell::Cell;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::rc::Rc;

use crate::ExportError;
use crate::time::PacketTime;

const READER_BUFFER_SIZE: usize = 65536;

/// One captured frame: the pcap record timestamp, the original wire
/// length, and the captured bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    pub timestamp: PacketTime,
    pub wire_len: u32,
    pub data: Vec<u8>,
}

/// Marks end-of-input so an incomplete trailing record cannot put the
/// refill loop to sleep forever on a truncated capture.
struct TrackEof<R> {
    inner: R,
    eof: Rc<Cell<bool>>,
}

impl<R: Read> Read for TrackEof<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            self.eof.set(true);
        }
        Ok(n)
    }
}

/// Streaming reader over a legacy pcap capture.
pub struct Capture {
    reader: LegacyPcapReader<TrackEof<Box<dyn Read>>>,
    eof: Rc<Cell<bool>>,
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capture").finish_non_exhaustive()
    }
}

impl Capture {
    /// Open a capture file, or stdin when `path` is absent or `-`.
    pub fn open(path: Option<&str>) -> Result<Self, ExportError> {
        let input: Box<dyn Read> = match path {
            None | Some("-") => Box::new(io::stdin()),
            Some(path) => {
                let file = File::open(path)
                    .map_err(|err| ExportError::InvalidInputFile(format!("{path}: {err}")))?;
                Box::new(file)
            }
        };
        Self::from_reader(input)
    }

    /// Wrap any byte stream carrying a legacy pcap capture.
    pub fn from_reader(input: Box<dyn Read>) -> Result<Self, ExportError> {
        let eof = Rc::new(Cell::new(false));
        let tracked = TrackEof {
            inner: input,
            eof: Rc::clone(&eof),
        };
        let reader = LegacyPcapReader::new(READER_BUFFER_SIZE, tracked)
            .map_err(|err| ExportError::InvalidInputFile(format!("{err:?}")))?;
        Ok(Self { reader, eof })
    }

    /// Next frame of the capture, or `None` at end of stream.
    ///
    /// The file header is validated on the way through: only the Ethernet
    /// link type is accepted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, ExportError> {
        loop {
            match self.reader.next() {
                Ok((offset, block)) => {
                    let frame = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            if header.network != Linktype::ETHERNET {
                                return Err(ExportError::InvalidInputFile(format!(
                                    "unsupported link type {:?}, expected Ethernet",
                                    header.network
                                )));
                            }
                            None
                        }
                        PcapBlockOwned::Legacy(record) => Some(Frame {
                            timestamp: PacketTime::new(record.ts_sec, record.ts_usec),
                            wire_len: record.origlen,
                            data: record.data.to_vec(),
                        }),
                        // A legacy reader never yields pcapng blocks.
                        PcapBlockOwned::NG(_) => None,
                    };
                    self.reader.consume(offset);
                    if let Some(frame) = frame {
                        return Ok(Some(frame));
                    }
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    if self.eof.get() {
                        return Err(ExportError::Pcap(
                            "capture truncated mid-record".to_string(),
                        ));
                    }
                    self.reader
                        .refill()
                        .map_err(|err| ExportError::Pcap(format!("{err:?}")))?;
                }
                Err(err) => return Err(ExportError::Pcap(format!("{err:?}"))),
            }
        }
    }
}

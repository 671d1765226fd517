//! Serial Source - line-delimited sensor records
//!
//! One record per line, 6 comma-separated ASCII fields. Lines that do not
//! parse are dropped without notifying the operator (debug log + counter).
//! A line longer than `MAX_LINE_BYTES` is dropped the same way and the reader
//! resyncs at the next newline.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use std::time::Duration;

use super::{ReadingSource, SourceCounters, SourceKind, SourceStats};
use crate::logic::error::SourceError;
use crate::logic::reading::{parse_line, Reading};

/// Longest accepted line (without the newline)
pub const MAX_LINE_BYTES: usize = 256;

pub struct SerialSource<B: BufRead + Send> {
    reader: B,
    /// Bytes of a line interrupted by a read timeout
    pending: Vec<u8>,
    /// Skipping the rest of an overlong line
    resyncing: bool,
    counters: SourceCounters,
}

impl SerialSource<BufReader<Box<dyn serialport::SerialPort>>> {
    /// Open a serial device. Reads time out after `timeout`.
    pub fn open(port: &str, baud: u32, timeout: Duration) -> Result<Self, SourceError> {
        log::info!("[Serial] Opening {} @ {} baud", port, baud);

        let device = serialport::new(port, baud)
            .timeout(timeout)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| SourceError::SerialConnect {
                port: port.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self::new(BufReader::new(device)))
    }
}

impl SerialSource<BufReader<File>> {
    /// Replay a captured serial log
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        log::info!("[Serial] Replaying {:?}", path);
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<B: BufRead + Send> SerialSource<B> {
    pub fn new(reader: B) -> Self {
        Self {
            reader,
            pending: Vec::with_capacity(MAX_LINE_BYTES),
            resyncing: false,
            counters: SourceCounters::default(),
        }
    }

    fn drop_overlong(&mut self) {
        log::debug!("[Serial] Discarded line longer than {} bytes", MAX_LINE_BYTES);
        self.pending.clear();
        self.resyncing = true;
        self.counters.discarded();
    }

    fn take_line(&mut self) -> Option<Reading> {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();

        match parse_line(&line) {
            Ok(reading) => {
                self.counters.reading();
                Some(reading)
            }
            Err(reason) => {
                log::debug!("[Serial] Discarded line {:?}: {}", line.trim_end(), reason);
                self.counters.discarded();
                None
            }
        }
    }
}

impl<B: BufRead + Send> ReadingSource for SerialSource<B> {
    fn next_reading(&mut self) -> Result<Option<Reading>, SourceError> {
        loop {
            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                    self.counters.timeout();
                    return Ok(None);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(None),
                Err(e) => return Err(SourceError::Io(e)),
            };

            if available.is_empty() {
                // End of stream: flush an unterminated tail once
                self.resyncing = false;
                if self.pending.is_empty() {
                    return Err(SourceError::Exhausted);
                }
                return Ok(self.take_line());
            }

            match available.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    let fits = self.pending.len() + end <= MAX_LINE_BYTES;
                    if !self.resyncing && fits {
                        self.pending.extend_from_slice(&available[..end]);
                    }
                    self.reader.consume(end + 1);

                    if self.resyncing {
                        self.resyncing = false;
                        return Ok(None);
                    }
                    if !fits {
                        self.drop_overlong();
                        self.resyncing = false;
                        return Ok(None);
                    }
                    return Ok(self.take_line());
                }
                None => {
                    let len = available.len();
                    let fits = self.pending.len() + len <= MAX_LINE_BYTES;
                    if !self.resyncing && fits {
                        self.pending.extend_from_slice(available);
                    }
                    self.reader.consume(len);

                    if !self.resyncing && !fits {
                        // Hand control back so the worker can check for stop
                        self.drop_overlong();
                        return Ok(None);
                    }
                }
            }
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Serial
    }

    fn stats(&self) -> SourceStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn source(data: &str) -> SerialSource<Cursor<Vec<u8>>> {
        SerialSource::new(Cursor::new(data.as_bytes().to_vec()))
    }

    #[test]
    fn test_reads_records_and_skips_noise() {
        let mut src = source(
            "timestamp,v,t,t,t,t\n\
             1700000000,0,1.65,0.4,0,0\n\
             1700000000,0,1.65\n\
             1700000001,0,2.70,0.5,0,0\n",
        );

        assert!(src.next_reading().unwrap().is_none());
        let first = src.next_reading().unwrap().unwrap();
        assert_eq!(first.voltage(), 1.65);
        assert!(src.next_reading().unwrap().is_none());
        let second = src.next_reading().unwrap().unwrap();
        assert_eq!(second.timestamp(), 1700000001);
        assert!(matches!(src.next_reading(), Err(SourceError::Exhausted)));

        let stats = src.stats();
        assert_eq!(stats.readings, 2);
        assert_eq!(stats.discarded, 2);
    }

    #[test]
    fn test_overlong_line_is_bounded_and_resyncs() {
        let mut data = "x".repeat(50_000);
        data.push_str("\n1700000000,0,1.0,0.4,0,0\n");
        let mut src = source(&data);

        let mut reading = None;
        for _ in 0..10 {
            assert!(src.pending.len() <= MAX_LINE_BYTES);
            if let Some(r) = src.next_reading().unwrap() {
                reading = Some(r);
                break;
            }
        }

        assert_eq!(reading.unwrap().timestamp(), 1700000000);
        assert!(src.pending.capacity() <= 2 * MAX_LINE_BYTES);
        let stats = src.stats();
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.readings, 1);
    }

    #[test]
    fn test_overlong_line_split_across_reads() {
        let port = FlakyPort {
            chunks: vec![
                Some(vec![b'7'; MAX_LINE_BYTES]),
                Some(b"777".to_vec()),
                None,
                Some(b"777\n1700000000,0,2.0,0.5,0,0\n".to_vec()),
            ],
        };
        let mut src = SerialSource::new(BufReader::new(port));

        // noise fills the limit exactly, the next chunk overflows it
        assert!(src.next_reading().unwrap().is_none());
        assert!(src.next_reading().unwrap().is_none());
        assert!(src.next_reading().unwrap().is_none());
        let reading = src.next_reading().unwrap().unwrap();
        assert_eq!(reading.voltage(), 2.0);

        let stats = src.stats();
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.timeouts, 1);
    }

    #[test]
    fn test_unterminated_tail() {
        let mut src = source("1700000000,0,1.0,0.4,0,0");
        assert!(src.next_reading().unwrap().is_some());
        assert!(matches!(src.next_reading(), Err(SourceError::Exhausted)));
    }

    /// Replays chunks in order; `None` is a read timeout
    struct FlakyPort {
        chunks: Vec<Option<Vec<u8>>>,
    }

    impl Read for FlakyPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            match self.chunks.remove(0) {
                Some(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                None => Err(std::io::Error::new(ErrorKind::TimedOut, "timeout")),
            }
        }
    }

    #[test]
    fn test_timeout_keeps_partial_line() {
        let port = FlakyPort {
            chunks: vec![Some(b"1700000000,0,1.".to_vec()), None, Some(b"5,0.4,0,0\n".to_vec())],
        };
        let mut src = SerialSource::new(BufReader::new(port));

        assert!(src.next_reading().unwrap().is_none());
        let reading = src.next_reading().unwrap().unwrap();
        assert_eq!(reading.voltage(), 1.5);
        assert_eq!(src.stats().timeouts, 1);
    }
}

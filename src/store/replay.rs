//! Log replay
//!
//! Sequentially decodes a log from offset 0 and rebuilds the key directory.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::{DriftError, Result};
use crate::record::{decode_body, decode_header, Record, HEADER_SIZE};

use super::index::{IndexEntry, KeyDir};

/// Statistics gathered while replaying a log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Records decoded (live values and tombstones)
    pub records: u64,

    /// Records with a zero-length value
    pub tombstones: u64,

    /// Keys left in the index once replay finished
    pub live_keys: usize,

    /// Bytes consumed, i.e. the next append offset
    pub bytes: u64,
}

/// Sequential record reader over a log of known length
///
/// Generic over any `Read` implementor so tests can feed in-memory buffers.
/// Any malformed record is reported as `LogCorruption` carrying the offset
/// where that record starts; I/O errors pass through untouched.
pub struct LogReader<R: Read> {
    rdr: BufReader<R>,
    /// Offset of the next record
    position: u64,
    /// Total bytes the log holds
    len: u64,
    /// Set once an error was returned; iteration stops there
    failed: bool,
}

impl LogReader<File> {
    /// Open an existing log file for replay
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self::new(file, len))
    }
}

impl<R: Read> LogReader<R> {
    /// Construct a reader over `len` bytes of `reader`
    pub fn new(reader: R, len: u64) -> Self {
        Self {
            rdr: BufReader::new(reader),
            position: 0,
            len,
            failed: false,
        }
    }

    /// Offset of the next record (after a full replay: end of the log)
    pub fn offset(&self) -> u64 {
        self.position
    }

    /// Read the next record and the offset it starts at
    ///
    /// Returns `Ok(None)` once the end of the log is reached exactly on a
    /// record boundary.
    pub fn next_record(&mut self) -> Result<Option<(u64, Record)>> {
        if self.failed || self.position >= self.len {
            return Ok(None);
        }

        let offset = self.position;
        match self.read_record() {
            Ok(record) => Ok(Some((offset, record))),
            Err(e) => {
                self.failed = true;
                match e {
                    DriftError::Io(_) => Err(e),
                    other => Err(DriftError::LogCorruption {
                        offset,
                        source: Box::new(other),
                    }),
                }
            }
        }
    }

    fn read_record(&mut self) -> Result<Record> {
        let remaining = self.len - self.position;

        // Step 1: fixed header
        let mut header_buf = [0u8; HEADER_SIZE];
        let filled = read_full(&mut self.rdr, &mut header_buf)?;
        let header = decode_header(&header_buf[..filled])?;

        // Step 2: body, never allocating past what the log actually holds
        if header.record_len() > remaining {
            return Err(DriftError::TruncatedRecord {
                expected: header.record_len(),
                actual: remaining,
            });
        }

        let mut body = vec![0u8; header.body_len() as usize];
        let filled = read_full(&mut self.rdr, &mut body)?;
        if filled < body.len() {
            return Err(DriftError::TruncatedRecord {
                expected: header.record_len(),
                actual: (HEADER_SIZE + filled) as u64,
            });
        }

        // Step 3: checksum
        let (key, value) = body.split_at(header.key_size as usize);
        let record = decode_body(&header, key, value)?;

        self.position += header.record_len();
        Ok(record)
    }
}

impl<R: Read> Iterator for LogReader<R> {
    type Item = Result<(u64, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Fill as much of `buf` as the reader allows, returning the byte count
pub(super) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Replay every record into a fresh key directory
///
/// Later records for a key overwrite earlier ones; a tombstone removes the
/// key. The first malformed record aborts the whole replay.
pub fn replay<R: Read>(reader: &mut LogReader<R>) -> Result<(KeyDir, ReplayStats)> {
    let mut index = KeyDir::new();
    let mut stats = ReplayStats::default();

    while let Some((offset, record)) = reader.next_record()? {
        stats.records += 1;

        if record.is_tombstone() {
            stats.tombstones += 1;
            index.remove(&record.key);
        } else {
            let entry = IndexEntry::for_record(
                offset,
                record.key.len(),
                record.value.len() as u32,
                record.timestamp,
            );
            index.insert(record.key, entry);
        }
    }

    stats.live_keys = index.len();
    stats.bytes = reader.offset();

    Ok((index, stats))
}

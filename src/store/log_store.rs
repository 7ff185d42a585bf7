//! Log Store
//!
//! Owns the log file and the key directory; serves set/get/delete.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};

use crate::config::{Config, SyncStrategy};
use crate::error::{DriftError, Result};
use crate::record::{encode, verify_frame, HEADER_SIZE};

use super::index::{IndexEntry, KeyDir};
use super::replay::{read_full, replay, LogReader, ReplayStats};

/// A log-structured key-value store backed by a single append-only file
///
/// ## Lifecycle
/// `open` creates the file if needed and replays it into the key directory.
/// `close` syncs and releases the file; every data operation afterwards
/// fails with `InvalidState`.
///
/// ## Concurrency
/// Single owner. Mutations and reads take `&mut self` because reads move
/// the file cursor. Use `SharedStore` to share one store across threads.
pub struct LogStore {
    /// Store configuration
    config: Config,

    /// Open file + write cursor, or nothing once closed
    state: State,

    /// In-memory hash index: key → latest value location
    index: KeyDir,

    /// What replay found when the store was opened
    replay_stats: ReplayStats,
}

enum State {
    Open(ActiveLog),
    Closed,
}

/// The open log file and its append cursor
struct ActiveLog {
    file: File,
    /// End of the log; the next append lands here
    write_position: u64,
    /// Appends since the last fsync
    unsynced: usize,
}

impl ActiveLog {
    /// Append one encoded frame, returning the offset it was written at
    ///
    /// On failure the file is cut back to the previous end so a partial
    /// frame never sits in front of later appends, and the pending-sync
    /// count is restored.
    fn append(&mut self, frame: &[u8], strategy: SyncStrategy) -> Result<u64> {
        let offset = self.write_position;
        let unsynced = self.unsynced;

        if let Err(e) = self.write_and_sync(frame, strategy) {
            self.rollback(offset);
            self.unsynced = unsynced;
            return Err(e.into());
        }

        self.write_position += frame.len() as u64;
        Ok(offset)
    }

    fn write_and_sync(&mut self, frame: &[u8], strategy: SyncStrategy) -> io::Result<()> {
        self.file.write_all(frame)?;
        self.file.flush()?;

        self.unsynced += 1;
        let due = match strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
            SyncStrategy::OnClose => false,
        };
        if due {
            self.sync()?;
        }

        Ok(())
    }

    fn rollback(&mut self, offset: u64) {
        match self.file.set_len(offset) {
            Ok(()) => warn!(offset, "Append failed; log truncated back to last good record"),
            Err(e) => warn!(offset, error = %e, "Append failed and log could not be truncated"),
        }
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Read the `len` bytes starting at `offset`
    ///
    /// A log that ends early is reported as `CorruptRecord`: the index only
    /// points at records that were fully written.
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.file.seek(SeekFrom::Start(offset))?;
        let filled = read_full(&mut self.file, &mut buf)?;
        if filled < len {
            return Err(DriftError::CorruptRecord {
                offset,
                reason: format!("log ends {} bytes into a {}-byte record", filled, len),
            });
        }
        Ok(buf)
    }
}

impl LogStore {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Open/create the log file
    /// 2. Replay every record from offset 0 into a fresh key directory
    /// 3. Place the write cursor at the end of the log
    ///
    /// Any malformed record fails the whole open with `LogCorruption`.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Open the log for reading and appending
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&config.path)?;

        // Step 2: Replay existing content
        let len = file.metadata()?.len();
        let (index, replay_stats) = {
            let mut reader = LogReader::new(&file, len);
            replay(&mut reader)?
        };

        info!(
            path = %config.path.display(),
            records = replay_stats.records,
            tombstones = replay_stats.tombstones,
            live_keys = replay_stats.live_keys,
            bytes = replay_stats.bytes,
            "Log store opened"
        );

        // Step 3: Appends continue from the end of the replayed log
        Ok(Self {
            config,
            state: State::Open(ActiveLog {
                file,
                write_position: replay_stats.bytes,
                unsynced: 0,
            }),
            index,
            replay_stats,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified log file
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config {
            path: path.as_ref().to_path_buf(),
            ..Config::default()
        };
        Self::open(config)
    }

    /// Replay a log file without opening it for writes
    ///
    /// Fails exactly where `open` would.
    pub fn verify(path: impl AsRef<Path>) -> Result<ReplayStats> {
        let mut reader = LogReader::open(path.as_ref())?;
        let (_, stats) = replay(&mut reader)?;
        Ok(stats)
    }

    // =========================================================================
    // Data Operations
    // =========================================================================

    /// Set a key to a value
    ///
    /// Steps:
    /// 1. Check size limits
    /// 2. Encode and append at the write cursor
    /// 3. Point the index at the new value
    ///
    /// An empty value is written as a zero-length record, which replay reads
    /// back as a tombstone: the key is gone after the next open.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.active("set")?;

        // Step 1: Size limits
        self.check_size("key", key.len(), self.config.max_key_size)?;
        self.check_size("value", value.len(), self.config.max_value_size)?;

        if value.is_empty() {
            warn!(
                key_len = key.len(),
                "Empty value is indistinguishable from a tombstone; key will not survive reopen"
            );
        }

        // Step 2: Append
        let timestamp = unix_timestamp();
        let offset = self.append(key, value, timestamp)?;

        // Step 3: Index
        let entry = IndexEntry::for_record(offset, key.len(), value.len() as u32, timestamp);
        self.index.insert(key.to_vec(), entry);

        debug!(offset, key_len = key.len(), value_len = value.len(), "set");
        Ok(())
    }

    /// Get the current value of a key
    ///
    /// Reads back the whole record the index points at and verifies its
    /// checksum. Returns `KeyNotFound` for unknown keys, `Corruption` if the
    /// stored bytes no longer match their checksum, and `CorruptRecord` if the
    /// record is cut short or is not the one the index points at.
    pub fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        let entry = {
            self.active("get")?;
            *self.index.get(key).ok_or(DriftError::KeyNotFound)?
        };

        let record_offset = entry.record_offset(key.len());
        let record_len = (entry.record_end() - record_offset) as usize;

        let log = self.active("get")?;
        let value = log
            .read_at(record_offset, record_len)
            .and_then(|frame| indexed_value(&frame, key, &entry, record_offset));

        value.map_err(|e| {
            if e.is_corruption() {
                error!(offset = record_offset, error = %e, "Corrupt record on read");
            }
            e
        })
    }

    /// Delete a key
    ///
    /// Appends a tombstone and drops the index entry. Deleting a key that is
    /// not present writes nothing and succeeds.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.active("delete")?;

        if !self.index.contains_key(key) {
            debug!(key_len = key.len(), "delete of absent key ignored");
            return Ok(());
        }

        let offset = self.append(key, &[], unix_timestamp())?;
        self.index.remove(key);

        debug!(offset, key_len = key.len(), "delete");
        Ok(())
    }

    /// Force an fsync of the log
    pub fn sync(&mut self) -> Result<()> {
        self.active("sync")?.sync()?;
        Ok(())
    }

    /// Close the store
    ///
    /// Syncs the log and releases the file handle. Closing an already
    /// closed store does nothing.
    pub fn close(&mut self) -> Result<()> {
        let log = match std::mem::replace(&mut self.state, State::Closed) {
            State::Open(log) => log,
            State::Closed => return Ok(()),
        };

        let live_keys = self.index.len();
        self.index.clear();

        let mut file = log.file;
        file.flush()?;
        file.sync_all()?;

        info!(
            path = %self.config.path.display(),
            bytes = log.write_position,
            live_keys,
            "Log store closed"
        );
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn active(&mut self, op: &str) -> Result<&mut ActiveLog> {
        match &mut self.state {
            State::Open(log) => Ok(log),
            State::Closed => Err(DriftError::InvalidState(format!(
                "{} called on a closed store",
                op
            ))),
        }
    }

    fn check_size(&self, what: &str, len: usize, limit: u32) -> Result<()> {
        if len > limit as usize {
            return Err(DriftError::Encoding(format!(
                "{} of {} bytes exceeds the configured limit of {} bytes",
                what, len, limit
            )));
        }
        Ok(())
    }

    /// Encode and append one record, returning its offset
    fn append(&mut self, key: &[u8], value: &[u8], timestamp: u32) -> Result<u64> {
        let frame = encode(timestamp, key, value)?;
        let strategy = self.config.sync_strategy;
        self.active("append")?.append(&frame, strategy)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the log file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    /// Live keys, in no particular order
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.index.keys().cloned().collect()
    }

    /// Where the current value of `key` lives in the log
    pub fn index_entry(&self, key: &[u8]) -> Option<IndexEntry> {
        self.index.get(key).copied()
    }

    /// Current end of the log (0 once closed)
    pub fn write_position(&self) -> u64 {
        match &self.state {
            State::Open(log) => log.write_position,
            State::Closed => 0,
        }
    }

    /// What replay found when this store was opened
    pub fn replay_stats(&self) -> ReplayStats {
        self.replay_stats
    }
}

impl Drop for LogStore {
    fn drop(&mut self) {
        if let State::Open(log) = &mut self.state {
            if let Err(e) = log.sync() {
                warn!(path = %self.config.path.display(), error = %e, "Failed to sync log on drop");
            }
        }
    }
}

/// Check a frame read at an index entry and slice out its value
fn indexed_value(frame: &[u8], key: &[u8], entry: &IndexEntry, offset: u64) -> Result<Vec<u8>> {
    let header = verify_frame(frame)?;

    let value_start = HEADER_SIZE + key.len();
    if header.key_size as usize != key.len()
        || header.value_size != entry.value_size
        || &frame[HEADER_SIZE..value_start] != key
    {
        return Err(DriftError::CorruptRecord {
            offset,
            reason: "record on disk does not match its index entry".to_string(),
        });
    }

    Ok(frame[value_start..].to_vec())
}

/// Seconds since the Unix epoch, saturated into the header's u32
fn unix_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

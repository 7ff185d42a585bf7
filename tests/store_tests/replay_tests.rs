//! Tests for log replay
//!
//! These tests verify:
//! - Replay of a clean log (values, overwrites, tombstones)
//! - Replay of an empty log
//! - Truncated tails and corrupted records abort the open
//! - Verify mode (stats only, nothing kept open)

use std::fs::{self, File, OpenOptions};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use driftkv::config::{Config, SyncStrategy};
use driftkv::record::{encode, HEADER_SIZE};
use driftkv::store::{replay, LogReader, ReplayStats};
use driftkv::{DriftError, LogStore};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.db");
    (temp_dir, path)
}

fn open(path: &Path) -> driftkv::Result<LogStore> {
    let config = Config::builder()
        .path(path)
        .sync_strategy(SyncStrategy::EveryWrite)
        .build()
        .unwrap();
    LogStore::open(config)
}

/// Write raw frames directly to a file (for crafting logs by hand)
fn write_raw_records(path: &Path, records: &[(u32, &str, &str)]) -> Vec<u64> {
    let mut file = File::create(path).unwrap();
    let mut offsets = Vec::new();
    let mut offset = 0u64;
    for (timestamp, key, value) in records {
        let frame = encode(*timestamp, key.as_bytes(), value.as_bytes()).unwrap();
        offsets.push(offset);
        offset += frame.len() as u64;
        file.write_all(&frame).unwrap();
    }
    file.sync_all().unwrap();
    offsets
}

fn append_raw(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

fn assert_log_corruption_at(err: DriftError, expected_offset: u64) -> DriftError {
    match err {
        DriftError::LogCorruption { offset, source } => {
            assert_eq!(offset, expected_offset);
            *source
        }
        other => panic!("expected LogCorruption, got {:?}", other),
    }
}

// =============================================================================
// Clean Log Tests
// =============================================================================

#[test]
fn test_replay_empty_file() {
    let (_temp, path) = setup_temp_log();
    File::create(&path).unwrap();

    let store = open(&path).unwrap();

    assert!(store.is_empty());
    assert_eq!(store.write_position(), 0);
    assert_eq!(store.replay_stats(), ReplayStats::default());
}

#[test]
fn test_replay_restores_values() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(
        &path,
        &[(1, "a", "alpha"), (2, "b", "beta"), (3, "c", "gamma")],
    );

    let mut store = open(&path).unwrap();

    assert_eq!(store.len(), 3);
    assert_eq!(store.get(b"a").unwrap(), b"alpha");
    assert_eq!(store.get(b"b").unwrap(), b"beta");
    assert_eq!(store.get(b"c").unwrap(), b"gamma");
}

#[test]
fn test_replay_last_writer_wins() {
    let (_temp, path) = setup_temp_log();
    let offsets = write_raw_records(&path, &[(1, "k", "old"), (2, "k", "new")]);

    let mut store = open(&path).unwrap();

    assert_eq!(store.get(b"k").unwrap(), b"new");
    let entry = store.index_entry(b"k").unwrap();
    assert_eq!(entry.value_offset, offsets[1] + (HEADER_SIZE + 1) as u64);
    assert_eq!(entry.timestamp, 2);
}

#[test]
fn test_replay_tombstone_removes_key() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(
        &path,
        &[(1, "k", "v"), (2, "other", "x"), (3, "k", "")],
    );

    let mut store = open(&path).unwrap();

    assert!(store.get(b"k").unwrap_err().is_not_found());
    assert_eq!(store.get(b"other").unwrap(), b"x");
}

#[test]
fn test_replay_tombstone_for_unknown_key() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(&path, &[(1, "ghost", ""), (2, "k", "v")]);

    let store = open(&path).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.replay_stats().tombstones, 1);
}

#[test]
fn test_replay_value_after_tombstone() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(&path, &[(1, "k", "v1"), (2, "k", ""), (3, "k", "v2")]);

    let mut store = open(&path).unwrap();

    assert_eq!(store.get(b"k").unwrap(), b"v2");
}

#[test]
fn test_replay_stats() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(
        &path,
        &[
            (1, "a", "1"),
            (2, "b", "2"),
            (3, "a", "3"),
            (4, "b", ""),
        ],
    );
    let file_len = fs::metadata(&path).unwrap().len();

    let store = open(&path).unwrap();

    assert_eq!(
        store.replay_stats(),
        ReplayStats {
            records: 4,
            tombstones: 1,
            live_keys: 1,
            bytes: file_len,
        }
    );
    assert_eq!(store.write_position(), file_len);
}

#[test]
fn test_appends_continue_after_replayed_log() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(&path, &[(1, "a", "1")]);
    let before = fs::metadata(&path).unwrap().len();

    {
        let mut store = open(&path).unwrap();
        store.set(b"b", b"2").unwrap();
        let entry = store.index_entry(b"b").unwrap();
        assert_eq!(entry.value_offset, before + (HEADER_SIZE + 1) as u64);
        store.close().unwrap();
    }

    let mut store = open(&path).unwrap();
    assert_eq!(store.get(b"a").unwrap(), b"1");
    assert_eq!(store.get(b"b").unwrap(), b"2");
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncated_header_fails_open() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(&path, &[(1, "k1", "v1"), (2, "k2", "v2")]);
    let good_len = fs::metadata(&path).unwrap().len();

    append_raw(&path, &[0x20, 0x00, 0x00, 0x00]);

    let err = open(&path).err().unwrap();
    let source = assert_log_corruption_at(err, good_len);
    assert!(matches!(
        source,
        DriftError::TruncatedRecord {
            expected: 16,
            actual: 4
        }
    ));
}

#[test]
fn test_truncated_body_fails_open() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(&path, &[(1, "k1", "v1")]);
    let good_len = fs::metadata(&path).unwrap().len();

    let partial = encode(2, b"k2", b"a longer value").unwrap();
    append_raw(&path, &partial[..partial.len() - 3]);

    let err = open(&path).err().unwrap();
    let source = assert_log_corruption_at(err, good_len);
    assert!(matches!(source, DriftError::TruncatedRecord { .. }));
}

#[test]
fn test_absurd_declared_size_fails_without_allocating() {
    let (_temp, path) = setup_temp_log();

    // Header claiming a 4 GiB value followed by nothing
    let mut header = Vec::new();
    header.extend_from_slice(&1u32.to_le_bytes());
    header.extend_from_slice(&1u32.to_le_bytes());
    header.extend_from_slice(&u32::MAX.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.push(b'k');
    fs::write(&path, &header).unwrap();

    let err = open(&path).err().unwrap();
    let source = assert_log_corruption_at(err, 0);
    assert!(matches!(
        source,
        DriftError::TruncatedRecord { actual: 17, .. }
    ));
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_corrupt_middle_record_fails_open() {
    let (_temp, path) = setup_temp_log();
    let offsets = write_raw_records(
        &path,
        &[(1, "k1", "v1"), (2, "k2", "v2"), (3, "k3", "v3")],
    );

    let mut bytes = fs::read(&path).unwrap();
    let value_byte = offsets[1] as usize + HEADER_SIZE + 2;
    bytes[value_byte] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let err = open(&path).err().unwrap();
    let source = assert_log_corruption_at(err, offsets[1]);
    assert!(matches!(source, DriftError::Corruption { .. }));
}

#[test]
fn test_any_flipped_byte_fails_open() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(&path, &[(7, "name", "jojo")]);
    let original = fs::read(&path).unwrap();

    for i in 0..original.len() {
        let mut bytes = original.clone();
        bytes[i] ^= 0x01;
        fs::write(&path, &bytes).unwrap();

        let result = open(&path);
        assert!(
            matches!(&result, Err(DriftError::LogCorruption { offset: 0, .. })),
            "flip at byte {} was not detected",
            i
        );
    }
}

#[test]
fn test_failed_open_leaves_file_untouched() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(&path, &[(1, "k", "v")]);
    append_raw(&path, b"garbage");
    let before = fs::read(&path).unwrap();

    assert!(open(&path).is_err());

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_log_corruption_counts_as_corruption() {
    let (_temp, path) = setup_temp_log();
    fs::write(&path, b"not a log").unwrap();

    let err = open(&path).err().unwrap();

    assert!(err.is_corruption());
    assert!(!err.is_not_found());
}

// =============================================================================
// LogReader Tests
// =============================================================================

#[test]
fn test_reader_yields_offsets_and_records() {
    let mut log = Vec::new();
    log.extend_from_slice(&encode(1, b"a", b"1").unwrap());
    let second = log.len() as u64;
    log.extend_from_slice(&encode(2, b"bb", b"22").unwrap());

    let len = log.len() as u64;
    let records: Vec<_> = LogReader::new(Cursor::new(log), len)
        .collect::<driftkv::Result<Vec<_>>>()
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].0, 0);
    assert_eq!(records[0].1.key, b"a");
    assert_eq!(records[1].0, second);
    assert_eq!(records[1].1.value, b"22");
}

#[test]
fn test_reader_stops_after_error() {
    let mut log = encode(1, b"a", b"1").unwrap().to_vec();
    log.extend_from_slice(b"junk");
    let len = log.len() as u64;

    let mut reader = LogReader::new(Cursor::new(log), len);

    assert!(reader.next().unwrap().is_ok());
    assert!(reader.next().unwrap().is_err());
    assert!(reader.next().is_none());
}

#[test]
fn test_replay_from_memory() {
    let mut log = Vec::new();
    log.extend_from_slice(&encode(1, b"x", b"1").unwrap());
    log.extend_from_slice(&encode(2, b"x", b"").unwrap());
    log.extend_from_slice(&encode(3, b"y", b"2").unwrap());
    let len = log.len() as u64;

    let mut reader = LogReader::new(Cursor::new(log), len);
    let (index, stats) = replay(&mut reader).unwrap();

    assert!(!index.contains_key(b"x"));
    assert!(index.contains_key(b"y"));
    assert_eq!(stats.records, 3);
    assert_eq!(stats.bytes, len);
}

#[test]
fn test_replay_bytes_match_reader_offset() {
    let mut log = encode(1, b"k", b"v").unwrap().to_vec();
    log.extend_from_slice(&encode(2, b"key", b"value").unwrap());
    let len = log.len() as u64;

    let mut reader = LogReader::new(Cursor::new(log), len);
    assert_eq!(reader.offset(), 0);

    let (_, stats) = replay(&mut reader).unwrap();

    assert_eq!(reader.offset(), len);
    assert_eq!(stats.bytes, reader.offset());
    assert_eq!(stats.bytes, 2 * HEADER_SIZE as u64 + 2 + 8);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_reports_stats() {
    let (_temp, path) = setup_temp_log();
    {
        let mut store = open(&path).unwrap();
        store.set(b"a", b"1").unwrap();
        store.set(b"b", b"2").unwrap();
        store.delete(b"a").unwrap();
        store.close().unwrap();
    }

    let stats = LogStore::verify(&path).unwrap();

    assert_eq!(stats.records, 3);
    assert_eq!(stats.tombstones, 1);
    assert_eq!(stats.live_keys, 1);
    assert_eq!(stats.bytes, fs::metadata(&path).unwrap().len());
}

#[test]
fn test_verify_detects_corruption() {
    let (_temp, path) = setup_temp_log();
    write_raw_records(&path, &[(1, "k", "v")]);
    append_raw(&path, &[1, 2, 3]);

    assert!(matches!(
        LogStore::verify(&path),
        Err(DriftError::LogCorruption { .. })
    ));
}

#[test]
fn test_verify_missing_file_is_io_error() {
    let (_temp, path) = setup_temp_log();

    assert!(matches!(LogStore::verify(&path), Err(DriftError::Io(_))));
}

//! Key directory
//!
//! In-memory hash index: key → location of its latest value in the log.

use std::collections::HashMap;

use crate::record::HEADER_SIZE;

/// Where a key's current value lives in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Length of the value payload
    pub value_size: u32,
    /// Byte offset of the value payload in the log
    pub value_offset: u64,
    /// Timestamp of the record that produced this entry
    pub timestamp: u32,
}

impl IndexEntry {
    /// Build the entry for a record written at `record_offset`
    pub fn for_record(record_offset: u64, key_len: usize, value_size: u32, timestamp: u32) -> Self {
        Self {
            value_size,
            value_offset: record_offset + (HEADER_SIZE + key_len) as u64,
            timestamp,
        }
    }

    /// Offset of the header of the record holding this value
    ///
    /// `key_len` must be the length of the key this entry was built for.
    pub fn record_offset(&self, key_len: usize) -> u64 {
        self.value_offset - (HEADER_SIZE + key_len) as u64
    }

    /// Offset one past the last byte of the record
    pub fn record_end(&self) -> u64 {
        self.value_offset + self.value_size as u64
    }
}

/// Hash index with exactly one entry per live key
#[derive(Debug, Default)]
pub struct KeyDir {
    entries: HashMap<Vec<u8>, IndexEntry>,
}

impl KeyDir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Insert or overwrite; returns the previous entry
    pub fn insert(&mut self, key: Vec<u8>, entry: IndexEntry) -> Option<IndexEntry> {
        self.entries.insert(key, entry)
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<IndexEntry> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live keys, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &Vec<u8>> {
        self.entries.keys()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

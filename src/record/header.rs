//! Record header
//!
//! The fixed-width prefix of every record.

use bytes::{Buf, BufMut};

use crate::error::{DriftError, Result};

use super::{CHECKSUMMED_HEADER_SIZE, HEADER_SIZE};

/// Fixed 16-byte record prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Seconds since the Unix epoch
    pub timestamp: u32,
    /// Length of the key payload
    pub key_size: u32,
    /// Length of the value payload (0 = tombstone)
    pub value_size: u32,
    /// CRC32 over the other three fields, the key and the value
    pub checksum: u32,
}

impl RecordHeader {
    /// Parse the header from the front of `bytes`
    ///
    /// Fails with `TruncatedRecord` if fewer than `HEADER_SIZE` bytes are given.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DriftError::TruncatedRecord {
                expected: HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        let mut buf = &bytes[..HEADER_SIZE];
        Ok(Self {
            timestamp: buf.get_u32_le(),
            key_size: buf.get_u32_le(),
            value_size: buf.get_u32_le(),
            checksum: buf.get_u32_le(),
        })
    }

    /// Write all 16 header bytes
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.checksummed_bytes());
        buf.put_u32_le(self.checksum);
    }

    /// The header bytes covered by the checksum (everything but the checksum)
    pub(crate) fn checksummed_bytes(&self) -> [u8; CHECKSUMMED_HEADER_SIZE] {
        let mut out = [0u8; CHECKSUMMED_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.timestamp.to_le_bytes());
        out[4..8].copy_from_slice(&self.key_size.to_le_bytes());
        out[8..12].copy_from_slice(&self.value_size.to_le_bytes());
        out
    }

    /// Key + value length
    pub fn body_len(&self) -> u64 {
        self.key_size as u64 + self.value_size as u64
    }

    /// Full record length including this header
    pub fn record_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.body_len()
    }

    pub fn is_tombstone(&self) -> bool {
        self.value_size == 0
    }
}

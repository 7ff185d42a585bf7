//! Record Module
//!
//! The on-disk unit of the log and its binary codec.
//!
//! ## Responsibilities
//! - Serialize a (timestamp, key, value) triple into one contiguous frame
//! - CRC32 checksums for corruption detection
//! - Split decoding: fixed header first, body second, so a reader learns how
//!   many bytes to fetch before touching the payload
//!
//! ## Record Format
//! All integers are u32 little-endian.
//! ```text
//! ┌───────────────┬──────────────┬────────────────┬──────────────┬─────┬───────┐
//! │ Timestamp (4) │ KeySize (4)  │ ValueSize (4)  │ CRC32 (4)    │ Key │ Value │
//! └───────────────┴──────────────┴────────────────┴──────────────┴─────┴───────┘
//! ```
//!
//! The CRC covers the first 12 header bytes, then the key, then the value.
//! `ValueSize == 0` marks a tombstone: an empty value and a deletion share
//! the same encoding.

mod codec;
mod header;

use bytes::Bytes;

use crate::error::Result;

pub use codec::{checksum, decode, decode_body, decode_header, encode};
pub(crate) use codec::verify_frame;
pub use header::RecordHeader;

// =============================================================================
// Shared Constants
// =============================================================================

/// Header size: Timestamp (4) + KeySize (4) + ValueSize (4) + CRC32 (4) = 16 bytes
pub const HEADER_SIZE: usize = 16;

/// Number of leading header bytes covered by the checksum
pub(crate) const CHECKSUMMED_HEADER_SIZE: usize = 12;

// =============================================================================
// Record
// =============================================================================

/// A decoded log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Seconds since the Unix epoch when the write happened
    pub timestamp: u32,

    /// The lookup key
    pub key: Vec<u8>,

    /// The payload value (empty for a tombstone)
    pub value: Vec<u8>,
}

impl Record {
    pub fn new(timestamp: u32, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp,
            key: key.into(),
            value: value.into(),
        }
    }

    /// A deletion marker for `key`
    pub fn tombstone(timestamp: u32, key: impl Into<Vec<u8>>) -> Self {
        Self::new(timestamp, key, Vec::new())
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }

    /// Size of this record on disk
    pub fn encoded_len(&self) -> u64 {
        (HEADER_SIZE + self.key.len() + self.value.len()) as u64
    }

    /// Serialize into a single frame
    pub fn encode(&self) -> Result<Bytes> {
        encode(self.timestamp, &self.key, &self.value)
    }
}

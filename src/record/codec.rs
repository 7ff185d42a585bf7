//! Record codec
//!
//! Encoding and decoding functions for log records.

use bytes::{BufMut, Bytes, BytesMut};
use crc32fast::Hasher;

use crate::error::{DriftError, Result};

use super::{Record, RecordHeader, CHECKSUMMED_HEADER_SIZE, HEADER_SIZE};

// =============================================================================
// Checksum
// =============================================================================

/// CRC32 over the checksummed header fields, the key and the value
///
/// The size fields are part of the checksummed bytes, so this fails with
/// `Encoding` when key or value length does not fit a `u32`.
pub fn checksum(timestamp: u32, key: &[u8], value: &[u8]) -> Result<u32> {
    let header = RecordHeader {
        timestamp,
        key_size: size_field("key", key.len())?,
        value_size: size_field("value", value.len())?,
        checksum: 0,
    };
    Ok(compute_checksum(&header, key, value))
}

fn compute_checksum(header: &RecordHeader, key: &[u8], value: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&header.checksummed_bytes());
    hasher.update(key);
    hasher.update(value);
    hasher.finalize()
}

/// Convert a payload length into a header size field
fn size_field(what: &str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        DriftError::Encoding(format!(
            "{} of {} bytes exceeds the {}-byte header limit",
            what,
            len,
            u32::MAX
        ))
    })
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a record to bytes
///
/// Format: header (16) + key + value
pub fn encode(timestamp: u32, key: &[u8], value: &[u8]) -> Result<Bytes> {
    let mut header = RecordHeader {
        timestamp,
        key_size: size_field("key", key.len())?,
        value_size: size_field("value", value.len())?,
        checksum: 0,
    };
    header.checksum = compute_checksum(&header, key, value);

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + key.len() + value.len());
    header.encode_into(&mut buf);
    buf.put_slice(key);
    buf.put_slice(value);

    Ok(buf.freeze())
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode the fixed-width header from the front of `bytes`
pub fn decode_header(bytes: &[u8]) -> Result<RecordHeader> {
    RecordHeader::decode(bytes)
}

/// Decode and verify a record body against its header
///
/// Only the first `key_size` / `value_size` bytes of the supplied slices are
/// used; shorter slices fail with `TruncatedRecord`. A checksum mismatch fails
/// with `Corruption`.
pub fn decode_body(header: &RecordHeader, key: &[u8], value: &[u8]) -> Result<Record> {
    let key_size = header.key_size as usize;
    let value_size = header.value_size as usize;

    if key.len() < key_size {
        return Err(DriftError::TruncatedRecord {
            expected: header.key_size as u64,
            actual: key.len() as u64,
        });
    }
    if value.len() < value_size {
        return Err(DriftError::TruncatedRecord {
            expected: header.value_size as u64,
            actual: value.len() as u64,
        });
    }

    let key = &key[..key_size];
    let value = &value[..value_size];

    let actual = compute_checksum(header, key, value);
    if actual != header.checksum {
        return Err(DriftError::Corruption {
            expected: header.checksum,
            actual,
        });
    }

    Ok(Record {
        timestamp: header.timestamp,
        key: key.to_vec(),
        value: value.to_vec(),
    })
}

/// Verify the checksum of one complete frame exactly as it sits on disk
///
/// `frame` must hold exactly one record. The checksum is recomputed over the
/// stored header bytes themselves, so a flipped size field is caught even
/// when the caller already knows the true sizes.
pub(crate) fn verify_frame(frame: &[u8]) -> Result<RecordHeader> {
    let header = decode_header(frame)?;

    let mut hasher = Hasher::new();
    hasher.update(&frame[..CHECKSUMMED_HEADER_SIZE]);
    hasher.update(&frame[HEADER_SIZE..]);
    let actual = hasher.finalize();

    if actual != header.checksum {
        return Err(DriftError::Corruption {
            expected: header.checksum,
            actual,
        });
    }

    Ok(header)
}

/// Decode one full record from the front of `bytes`
///
/// Returns the record and the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(Record, usize)> {
    let header = decode_header(bytes)?;

    let record_len = header.record_len();
    if (bytes.len() as u64) < record_len {
        return Err(DriftError::TruncatedRecord {
            expected: record_len,
            actual: bytes.len() as u64,
        });
    }

    let key_end = HEADER_SIZE + header.key_size as usize;
    let value_end = key_end + header.value_size as usize;
    let record = decode_body(&header, &bytes[HEADER_SIZE..key_end], &bytes[key_end..value_end])?;

    Ok((record, value_end))
}

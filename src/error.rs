//! Error types for DriftKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using DriftError
pub type Result<T> = std::result::Result<T, DriftError>;

/// Unified error type for DriftKV operations
#[derive(Debug, Error)]
pub enum DriftError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Codec Errors
    // -------------------------------------------------------------------------
    /// Key or value does not fit the header's size fields (or a configured cap)
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Fewer bytes were available than the record declares
    #[error("Truncated record: expected {expected} bytes, got {actual}")]
    TruncatedRecord { expected: u64, actual: u64 },

    /// Stored checksum disagrees with the recomputed one
    #[error("Checksum mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    Corruption { expected: u32, actual: u32 },

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// Replay hit a malformed record; the whole open is aborted
    #[error("Log corruption at offset {offset}: {source}")]
    LogCorruption {
        offset: u64,
        source: Box<DriftError>,
    },

    /// A record read back by `get` is short, or is intact but not the one
    /// the index points at
    #[error("Corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    #[error("Key not found")]
    KeyNotFound,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DriftError {
    /// True for a lookup miss, which callers handle as ordinary control flow
    pub fn is_not_found(&self) -> bool {
        matches!(self, DriftError::KeyNotFound)
    }

    /// True for any integrity failure, whether found by `get` or by replay
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            DriftError::Corruption { .. }
                | DriftError::TruncatedRecord { .. }
                | DriftError::LogCorruption { .. }
                | DriftError::CorruptRecord { .. }
        )
    }
}

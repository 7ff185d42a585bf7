//! Store Module
//!
//! Durable append-only storage with an in-memory hash index.
//!
//! ## Responsibilities
//! - Append encoded records at the end of a single log file
//! - Keep one index entry per live key (last writer wins)
//! - Rebuild the index by replaying the whole log on open
//! - Delete via tombstones; stale records stay on disk (no compaction)
//!
//! ## Control Flow
//! ```text
//!   set ──► encode ──► append @ write_position ──► index[key] = entry
//!   get ──► index[key] ──► read record ──► verify CRC ──► value
//!   del ──► append tombstone ──► index.remove(key)
//! ```
//!
//! No file locking: two processes opening the same log is undefined.

mod index;
mod log_store;
mod replay;
mod shared;

pub use index::{IndexEntry, KeyDir};
pub use log_store::LogStore;
pub use replay::{replay, LogReader, ReplayStats};
pub use shared::SharedStore;

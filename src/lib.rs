//! # DriftKV
//!
//! A log-structured key-value store with:
//! - A single append-only log file of checksummed records
//! - An in-memory hash index pointing at each key's latest value
//! - Full log replay on open to rebuild the index
//! - Tombstone-based deletion
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        LogStore                             │
//! │              open / set / get / delete / close              │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │                               │
//!                ▼                               ▼
//!         ┌─────────────┐                 ┌─────────────┐
//!         │   KeyDir    │                 │   Record    │
//!         │ (HashMap)   │                 │   Codec     │
//!         └─────────────┘                 └──────┬──────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │  Log File   │
//!                                         │  (Append)   │
//!                                         └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use driftkv::LogStore;
//!
//! let mut store = LogStore::open_path("books.db").unwrap();
//! store.set(b"othello", b"shakespeare").unwrap();
//! assert_eq!(store.get(b"othello").unwrap(), b"shakespeare");
//! store.delete(b"othello").unwrap();
//! assert!(store.get(b"othello").unwrap_err().is_not_found());
//! store.close().unwrap();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod record;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, SyncStrategy};
pub use error::{DriftError, Result};
pub use store::{LogStore, SharedStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of DriftKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Shared store handle
//!
//! A cloneable, thread-safe wrapper around one `LogStore`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

use super::LogStore;

/// Thread-safe handle to a single `LogStore`
///
/// ## Concurrency Model
/// Every operation, reads included, takes the same mutex. The write cursor,
/// the key directory and the file cursor used by `get` all live behind that
/// one boundary, so no two operations ever interleave.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<LogStore>>,
}

impl SharedStore {
    pub fn new(store: LogStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.lock().set(key, value)
    }

    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.inner.lock().get(key)
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner.lock().delete(key)
    }

    pub fn sync(&self) -> Result<()> {
        self.inner.lock().sync()
    }

    /// Close the underlying store; every clone sees it closed
    pub fn close(&self) -> Result<()> {
        self.inner.lock().close()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.inner.lock().contains_key(key)
    }

    /// Run `f` with exclusive access to the store
    pub fn with_store<T>(&self, f: impl FnOnce(&mut LogStore) -> T) -> T {
        f(&mut self.inner.lock())
    }
}

impl From<LogStore> for SharedStore {
    fn from(store: LogStore) -> Self {
        Self::new(store)
    }
}

//! Transactional key-value store interface and implementations.
//!
//! Provides a trait-based KV store with scoped write transactions, an
//! in-memory implementation for testing and a redb-based implementation
//! for persistence.
//!
//! A [`KVTxn`] is all-or-nothing: writes are visible to other readers only
//! after [`KVTxn::commit`]. Dropping a transaction without committing rolls
//! it back, so an early `?` return never leaves partial writes behind.

pub mod memory;
pub mod redb;

use std::fmt;
use thiserror::Error;

/// Errors that can occur in KV store operations.
#[derive(Error, Debug)]
pub enum KVError {
    #[error("kv: not found")]
    NotFound,

    #[error("kv: storage error: {0}")]
    Storage(String),

    #[error("kv: serialization error: {0}")]
    Serialization(String),
}

/// Result type for KV operations.
pub type KVResult<T> = Result<T, KVError>;

/// Read access to a store or to a transaction's view of it.
pub trait KVReader {
    /// Get a value by key.
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>>;

    /// Scan for keys with a given prefix, sorted ascending by key.
    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>>;
}

/// A write transaction.
///
/// Reads through a transaction observe its own staged writes.
pub trait KVTxn: KVReader {
    /// Set a key-value pair.
    fn set(&mut self, key: &str, value: &[u8]) -> KVResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&mut self, key: &str) -> KVResult<()>;

    /// Insert only if the key is absent.
    ///
    /// Returns `None` when the value was inserted, or the existing value
    /// when the key was already taken (nothing is written in that case).
    fn insert_if_absent(&mut self, key: &str, value: &[u8]) -> KVResult<Option<Vec<u8>>>;

    /// Commit all staged writes atomically.
    fn commit(self: Box<Self>) -> KVResult<()>;
}

/// Key-value store trait.
pub trait KVStore: KVReader + Send + Sync {
    /// Begin a write transaction.
    fn begin(&self) -> KVResult<Box<dyn KVTxn + '_>>;

    /// Open a consistent point-in-time read view.
    fn read(&self) -> KVResult<Box<dyn KVReader + '_>>;

    /// Set a single key in its own transaction.
    fn set(&self, key: &str, value: &[u8]) -> KVResult<()> {
        let mut tx = self.begin()?;
        tx.set(key, value)?;
        tx.commit()
    }

    /// Delete a single key in its own transaction.
    fn delete(&self, key: &str) -> KVResult<()> {
        let mut tx = self.begin()?;
        tx.delete(key)?;
        tx.commit()
    }
}

impl fmt::Debug for dyn KVStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KVStore {{ ... }}")
    }
}

/// A boxed KV store for use in trait objects.
pub type BoxedKVStore = Box<dyn KVStore>;

// Re-export the implementations
pub use memory::MemoryStore;
pub use redb::RedbStore;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};
use visage_facedb::{FaceDb, FaceDbError, KnownEncoding};

/// An immutable copy of every matchable encoding.
pub struct Snapshot {
    dim: usize,
    entries: Vec<KnownEncoding>,
    loaded_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    fn empty(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
            loaded_at: None,
        }
    }

    /// Builds a snapshot, dropping entries whose length is not `dim`.
    pub fn new(dim: usize, entries: Vec<KnownEncoding>) -> Self {
        let mut kept = Vec::with_capacity(entries.len());
        for k in entries {
            if k.vector.len() != dim {
                warn!(
                    identity_id = k.identity_id,
                    encoding_id = k.encoding_id,
                    name = %k.name,
                    len = k.vector.len(),
                    expected = dim,
                    "skipping encoding with wrong dimension"
                );
                continue;
            }
            kept.push(k);
        }
        Self {
            dim,
            entries: kept,
            loaded_at: Some(Utc::now()),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Entries in identity id, then encoding id order.
    pub fn entries(&self) -> &[KnownEncoding] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When the snapshot was read; `None` before the first refresh.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("dim", &self.dim)
            .field("len", &self.entries.len())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

/// Holds the current [`Snapshot`] and swaps it on refresh.
///
/// Readers clone the `Arc` and keep a whole snapshot for as long as they
/// need it; a refresh builds the replacement off-lock and only takes the
/// write lock for the pointer swap.
pub struct EncodingStore {
    dim: usize,
    current: RwLock<Arc<Snapshot>>,
}

impl EncodingStore {
    /// Creates a store holding an empty snapshot. Panics if `dim` is 0.
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "faceid: dim must be positive");
        Self {
            dim,
            current: RwLock::new(Arc::new(Snapshot::empty(dim))),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Re-reads all matchable encodings from `db` and swaps the snapshot.
    /// Returns the number of loaded entries.
    ///
    /// Encodings whose length is not `dim` are skipped. On error the
    /// previous snapshot stays in place.
    pub fn refresh(&self, db: &FaceDb) -> Result<usize, FaceDbError> {
        let known = db.matchable_encodings()?;
        let total = known.len();
        let next = Arc::new(Snapshot::new(self.dim, known));
        let loaded = next.len();
        let skipped = total - loaded;
        *self.current.write() = next;

        info!(loaded, skipped, "encoding snapshot refreshed");
        Ok(loaded)
    }
}

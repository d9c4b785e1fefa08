use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use visage_kv::{KVReader, KVStore, KVTxn, RedbStore};

use crate::error::FaceDbError;
use crate::keys::{group_id_key, member_prefix, person_key, seq_key, trailing_id};
use crate::types::{Identity, PersonRecord};

/// Output size of the face encoder the store is normally paired with.
pub const DEFAULT_DIM: usize = 128;

/// Persistence manager for identities, groups, encodings, reference
/// images and detection logs.
///
/// Every mutating operation runs in exactly one KV transaction. The
/// transaction is committed on success and dropped (rolled back) on any
/// error, so callers never observe partial writes.
pub struct FaceDb {
    pub(crate) store: Box<dyn KVStore>,
    pub(crate) prefix: String,
    pub(crate) dim: usize,
}

impl FaceDb {
    /// Creates a FaceDb over an existing store. Panics if `dim` is 0.
    pub fn new(store: Box<dyn KVStore>, prefix: impl Into<String>, dim: usize) -> Self {
        assert!(dim > 0, "facedb: dim must be positive");
        Self {
            store,
            prefix: prefix.into(),
            dim,
        }
    }

    /// Opens (or creates) a redb-backed FaceDb at `path`.
    pub fn open<P: AsRef<Path>>(
        path: P,
        prefix: impl Into<String>,
        dim: usize,
    ) -> Result<Self, FaceDbError> {
        let store = RedbStore::open(path)?;
        Ok(Self::new(Box::new(store), prefix, dim))
    }

    /// Encoding dimensionality every stored vector must have.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Runs `f` inside one write transaction.
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&mut dyn KVTxn) -> Result<T, FaceDbError>,
    ) -> Result<T, FaceDbError> {
        let mut tx = self.store.begin()?;
        let out = f(tx.as_mut())?;
        tx.commit()?;
        Ok(out)
    }

    /// Allocates the next id of `table`. Ids start at 1.
    pub(crate) fn next_id(&self, tx: &mut dyn KVTxn, table: &str) -> Result<u64, FaceDbError> {
        let key = seq_key(&self.prefix, table);
        let current = match tx.get(&key)? {
            Some(data) => String::from_utf8(data)
                .map_err(|e| FaceDbError::Serialization(e.to_string()))?
                .parse::<u64>()
                .map_err(|e| FaceDbError::Serialization(e.to_string()))?,
            None => 0,
        };
        let next = current + 1;
        tx.set(&key, next.to_string().as_bytes())?;
        debug!(table, id = next, "allocated id");
        Ok(next)
    }

    pub(crate) fn load_person<R: KVReader + ?Sized>(
        &self,
        r: &R,
        id: u64,
    ) -> Result<Option<PersonRecord>, FaceDbError> {
        match r.get(&person_key(&self.prefix, id))? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Loads an active person or fails with [`FaceDbError::NotFound`].
    pub(crate) fn require_active<R: KVReader + ?Sized>(
        &self,
        r: &R,
        id: u64,
    ) -> Result<PersonRecord, FaceDbError> {
        match self.load_person(r, id)? {
            Some(p) if p.is_active => Ok(p),
            _ => Err(FaceDbError::NotFound(id)),
        }
    }

    /// Group names of identity `id`, in group id order.
    pub(crate) fn group_names<R: KVReader + ?Sized>(
        &self,
        r: &R,
        id: u64,
    ) -> Result<Vec<String>, FaceDbError> {
        let prefix = member_prefix(&self.prefix, id);
        let mut names = Vec::new();
        for (key, _) in r.scan(&prefix)? {
            let gid = match trailing_id(&key, &prefix) {
                Some(gid) => gid,
                None => continue,
            };
            if let Some(name) = r.get(&group_id_key(&self.prefix, gid))? {
                names.push(
                    String::from_utf8(name)
                        .map_err(|e| FaceDbError::Serialization(e.to_string()))?,
                );
            }
        }
        Ok(names)
    }

    pub(crate) fn to_identity<R: KVReader + ?Sized>(
        &self,
        r: &R,
        rec: PersonRecord,
    ) -> Result<Identity, FaceDbError> {
        let groups = self.group_names(r, rec.id)?;
        Ok(rec.into_identity(groups))
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, FaceDbError> {
    rmp_serde::to_vec_named(value).map_err(|e| FaceDbError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, FaceDbError> {
    rmp_serde::from_slice(data).map_err(|e| FaceDbError::Serialization(e.to_string()))
}

/// Rejects scores outside `[0, 1]`.
pub(crate) fn check_unit(field: &'static str, value: f32) -> Result<(), FaceDbError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FaceDbError::OutOfRange { field, value })
    }
}

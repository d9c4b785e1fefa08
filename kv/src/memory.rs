//! In-memory key-value store implementation for testing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{KVError, KVReader, KVResult, KVStore, KVTxn};

type Map = BTreeMap<String, Vec<u8>>;

/// An in-memory key-value store backed by an ordered map.
///
/// Write transactions hold the store lock until they are committed or
/// dropped, so writers are serialized the same way redb serializes them.
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<Mutex<Map>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    fn lock(&self) -> KVResult<MutexGuard<'_, Map>> {
        self.data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn scan_map(data: &Map, prefix: &str) -> Vec<(String, Vec<u8>)> {
    data.range(prefix.to_string()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

impl KVReader for MemoryStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        let data = self.lock()?;
        Ok(scan_map(&data, prefix))
    }
}

impl KVStore for MemoryStore {
    fn begin(&self) -> KVResult<Box<dyn KVTxn + '_>> {
        Ok(Box::new(MemoryTxn {
            data: self.lock()?,
            staged: BTreeMap::new(),
        }))
    }

    fn read(&self) -> KVResult<Box<dyn KVReader + '_>> {
        Ok(Box::new(MemoryView {
            data: self.lock()?.clone(),
        }))
    }
}

/// A frozen copy of the map taken when the view was opened.
struct MemoryView {
    data: Map,
}

impl KVReader for MemoryView {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        Ok(scan_map(&self.data, prefix))
    }
}

/// Staged writes over the locked map. `None` marks a deletion.
struct MemoryTxn<'a> {
    data: MutexGuard<'a, Map>,
    staged: BTreeMap<String, Option<Vec<u8>>>,
}

impl KVReader for MemoryTxn<'_> {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        match self.staged.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => Ok(self.data.get(key).cloned()),
        }
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        let mut merged: Map = scan_map(&self.data, prefix).into_iter().collect();
        for (k, v) in self
            .staged
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match v {
                Some(v) => {
                    merged.insert(k.clone(), v.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

impl KVTxn for MemoryTxn<'_> {
    fn set(&mut self, key: &str, value: &[u8]) -> KVResult<()> {
        self.staged.insert(key.to_string(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> KVResult<()> {
        self.staged.insert(key.to_string(), None);
        Ok(())
    }

    fn insert_if_absent(&mut self, key: &str, value: &[u8]) -> KVResult<Option<Vec<u8>>> {
        if let Some(existing) = self.get(key)? {
            return Ok(Some(existing));
        }
        self.set(key, value)?;
        Ok(None)
    }

    fn commit(self: Box<Self>) -> KVResult<()> {
        let MemoryTxn { mut data, staged } = *self;
        for (k, v) in staged {
            match v {
                Some(v) => {
                    data.insert(k, v);
                }
                None => {
                    data.remove(&k);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemoryStore::new();

        // Set and get
        store.set("key1", b"value1").unwrap();
        assert_eq!(store.get("key1").unwrap(), Some(b"value1".to_vec()));

        // Non-existent key
        assert_eq!(store.get("nonexistent").unwrap(), None);

        // Delete
        store.delete("key1").unwrap();
        assert_eq!(store.get("key1").unwrap(), None);
    }

    #[test]
    fn test_scan_is_prefix_bounded_and_sorted() {
        let store = MemoryStore::new();
        store.set("prefix:b", b"2").unwrap();
        store.set("prefix:a", b"1").unwrap();
        store.set("other:c", b"3").unwrap();
        store.set("prefiy", b"4").unwrap();

        let results = store.scan("prefix:").unwrap();
        let keys: Vec<&str> = results.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["prefix:a", "prefix:b"]);
    }

    #[test]
    fn test_dropped_txn_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().unwrap();
            tx.set("a", b"1").unwrap();
            tx.set("b", b"2").unwrap();
            // dropped without commit
        }
        assert_eq!(store.get("a").unwrap(), None);
        assert!(store.scan("").unwrap().is_empty());
    }

    #[test]
    fn test_txn_sees_own_writes() {
        let store = MemoryStore::new();
        store.set("k:1", b"old").unwrap();
        store.set("k:2", b"gone").unwrap();

        let mut tx = store.begin().unwrap();
        tx.set("k:1", b"new").unwrap();
        tx.delete("k:2").unwrap();
        tx.set("k:3", b"added").unwrap();

        assert_eq!(tx.get("k:1").unwrap(), Some(b"new".to_vec()));
        assert_eq!(tx.get("k:2").unwrap(), None);
        let keys: Vec<String> = tx.scan("k:").unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["k:1", "k:3"]);
        tx.commit().unwrap();

        assert_eq!(store.get("k:1").unwrap(), Some(b"new".to_vec()));
        assert_eq!(store.get("k:2").unwrap(), None);
    }

    #[test]
    fn test_insert_if_absent() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        assert_eq!(tx.insert_if_absent("g", b"first").unwrap(), None);
        assert_eq!(
            tx.insert_if_absent("g", b"second").unwrap(),
            Some(b"first".to_vec())
        );
        tx.commit().unwrap();
        assert_eq!(store.get("g").unwrap(), Some(b"first".to_vec()));
    }

    #[test]
    fn test_read_view_is_frozen() {
        let store = MemoryStore::new();
        store.set("a", b"1").unwrap();
        let view = store.read().unwrap();
        store.set("a", b"2").unwrap();
        assert_eq!(view.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get("a").unwrap(), Some(b"2".to_vec()));
    }
}

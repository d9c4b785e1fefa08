//! Redb-based persistent key-value store implementation.

use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};

use crate::{KVError, KVReader, KVResult, KVStore, KVTxn};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

fn storage<E: Display>(e: E) -> KVError {
    KVError::Storage(e.to_string())
}

/// A persistent key-value store backed by redb.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a redb store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> KVResult<Self> {
        let db = Database::create(path).map_err(storage)?;

        // Create the table if it doesn't exist
        let tx = db.begin_write().map_err(storage)?;
        {
            let _ = tx.open_table(TABLE).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        Ok(Self { db })
    }
}

fn collect_prefix<T>(table: &T, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let mut results = Vec::new();
    for item in table.range(prefix..).map_err(storage)? {
        let (key, value) = item.map_err(storage)?;
        let key_str = key.value();
        if !key_str.starts_with(prefix) {
            break;
        }
        results.push((key_str.to_string(), value.value().to_vec()));
    }
    Ok(results)
}

impl KVReader for RedbStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        RedbView {
            tx: self.db.begin_read().map_err(storage)?,
        }
        .get(key)
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        RedbView {
            tx: self.db.begin_read().map_err(storage)?,
        }
        .scan(prefix)
    }
}

impl KVStore for RedbStore {
    fn begin(&self) -> KVResult<Box<dyn KVTxn + '_>> {
        let tx = self.db.begin_write().map_err(storage)?;
        Ok(Box::new(RedbTxn { tx }))
    }

    fn read(&self) -> KVResult<Box<dyn KVReader + '_>> {
        let tx = self.db.begin_read().map_err(storage)?;
        Ok(Box::new(RedbView { tx }))
    }
}

/// A read transaction; sees the database as of the moment it began.
struct RedbView {
    tx: ReadTransaction,
}

impl KVReader for RedbView {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let table = self.tx.open_table(TABLE).map_err(storage)?;
        let value = match table.get(key).map_err(storage)? {
            Some(value) => Some(value.value().to_vec()),
            None => None,
        };
        Ok(value)
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        let table = self.tx.open_table(TABLE).map_err(storage)?;
        collect_prefix(&table, prefix)
    }
}

/// A write transaction. redb aborts it on drop unless committed.
struct RedbTxn {
    tx: WriteTransaction,
}

impl KVReader for RedbTxn {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let table = self.tx.open_table(TABLE).map_err(storage)?;
        let value = table.get(key).map_err(storage)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        let table = self.tx.open_table(TABLE).map_err(storage)?;
        collect_prefix(&table, prefix)
    }
}

impl KVTxn for RedbTxn {
    fn set(&mut self, key: &str, value: &[u8]) -> KVResult<()> {
        let mut table = self.tx.open_table(TABLE).map_err(storage)?;
        table.insert(key, value).map_err(storage)?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> KVResult<()> {
        let mut table = self.tx.open_table(TABLE).map_err(storage)?;
        table.remove(key).map_err(storage)?;
        Ok(())
    }

    fn insert_if_absent(&mut self, key: &str, value: &[u8]) -> KVResult<Option<Vec<u8>>> {
        let mut table = self.tx.open_table(TABLE).map_err(storage)?;
        let existing = table
            .get(key)
            .map_err(storage)?
            .map(|v| v.value().to_vec());
        if existing.is_none() {
            table.insert(key, value).map_err(storage)?;
        }
        Ok(existing)
    }

    fn commit(self: Box<Self>) -> KVResult<()> {
        self.tx.commit().map_err(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_redb_basic() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();

        store.set("key1", b"value1").unwrap();
        assert_eq!(store.get("key1").unwrap(), Some(b"value1".to_vec()));

        store.delete("key1").unwrap();
        assert_eq!(store.get("key1").unwrap(), None);
    }

    #[test]
    fn test_redb_scan() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();

        store.set("prefix:b", b"2").unwrap();
        store.set("prefix:a", b"1").unwrap();
        store.set("other:c", b"3").unwrap();

        let results = store.scan("prefix:").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "prefix:a");
    }

    #[test]
    fn test_redb_uncommitted_txn_is_rolled_back() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("test.redb")).unwrap();

        {
            let mut tx = store.begin().unwrap();
            tx.set("a", b"1").unwrap();
            assert_eq!(tx.get("a").unwrap(), Some(b"1".to_vec()));
        }
        assert_eq!(store.get("a").unwrap(), None);

        let mut tx = store.begin().unwrap();
        tx.set("a", b"1").unwrap();
        tx.commit().unwrap();
        assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_redb_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            let mut tx = store.begin().unwrap();
            assert_eq!(tx.insert_if_absent("g", b"x").unwrap(), None);
            tx.commit().unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        let mut tx = store.begin().unwrap();
        assert_eq!(tx.insert_if_absent("g", b"y").unwrap(), Some(b"x".to_vec()));
    }
}

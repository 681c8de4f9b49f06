//! Redb (Rust embedded database) backend for document storage.
//!
//! Every collection lives in its own redb table named `coll:<name>`, keyed
//! by the identifier's hex form. Tables are created by the first write
//! transaction that touches them; reading a table that was never written
//! yields an empty collection.
//!
//! ```text
//! DOCGATE_STORE_URI=redb:///var/lib/docgate/docs.redb
//! ```

use crate::{StorageBackend, StoreError};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition, TableError,
    TableHandle,
};
use std::path::Path;
use std::sync::Arc;

const TABLE_PREFIX: &str = "coll:";

fn table_name(collection: &str) -> String {
    format!("{TABLE_PREFIX}{collection}")
}

fn definition(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

/// Redb backend implementation for persistent document storage.
///
/// Each operation runs in its own transaction; redb provides its own
/// locking and MVCC, so the handle is shared freely across threads.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create a Redb database at the given path.
    ///
    /// ```no_run
    /// use store::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/docgate.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(StoreError::backend)?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl StorageBackend for RedbBackend {
    fn insert(&self, collection: &str, key: &str, value: &[u8]) -> Result<bool, StoreError> {
        let name = table_name(collection);
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn
                .open_table(definition(&name))
                .map_err(StoreError::backend)?;
            if table.get(key).map_err(StoreError::backend)?.is_some() {
                return Ok(false);
            }
            table.insert(key, value).map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(true)
    }

    fn replace(&self, collection: &str, key: &str, value: &[u8]) -> Result<bool, StoreError> {
        let name = table_name(collection);
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn
                .open_table(definition(&name))
                .map_err(StoreError::backend)?;
            if table.get(key).map_err(StoreError::backend)?.is_none() {
                return Ok(false);
            }
            table.insert(key, value).map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(true)
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let name = table_name(collection);
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = match read_txn.open_table(definition(&name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StoreError::backend(e)),
        };

        let value = table.get(key).map_err(StoreError::backend)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn delete(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let name = table_name(collection);
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        let removed = {
            let mut table = write_txn
                .open_table(definition(&name))
                .map_err(StoreError::backend)?;
            let removed = table.remove(key).map_err(StoreError::backend)?.is_some();
            removed
        };
        if !removed {
            // Dropping the transaction aborts it, so no empty table is left behind.
            return Ok(false);
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(true)
    }

    fn scan(
        &self,
        collection: &str,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let name = table_name(collection);
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = match read_txn.open_table(definition(&name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(()),
            Err(e) => return Err(StoreError::backend(e)),
        };

        for item in table.iter().map_err(StoreError::backend)? {
            let (_, value) = item.map_err(StoreError::backend)?;
            visitor(value.value())?;
        }
        Ok(())
    }

    fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let name = table_name(collection);
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        match read_txn.open_table(definition(&name)) {
            Ok(table) => table.len().map_err(StoreError::backend),
            Err(TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    fn collections(&self) -> Result<Vec<String>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let mut names = Vec::new();
        for handle in read_txn.list_tables().map_err(StoreError::backend)? {
            let Some(collection) = handle.name().strip_prefix(TABLE_PREFIX) else {
                continue;
            };
            let table = read_txn
                .open_table(definition(handle.name()))
                .map_err(StoreError::backend)?;
            if !table.is_empty().map_err(StoreError::backend)? {
                names.push(collection.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn flush(&self) -> Result<(), StoreError> {
        // Commits are durable when they return.
        Ok(())
    }
}

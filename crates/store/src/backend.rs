use crate::StoreError;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Trait for a keyed storage backend holding encoded documents, partitioned
/// by collection name. Collections spring into existence on first insert;
/// reads against an unknown collection behave as if it were empty.
pub trait StorageBackend: Send + Sync {
    /// Store `value` under `key` unless the key already exists.
    /// Returns `false` if the key was taken.
    fn insert(&self, collection: &str, key: &str, value: &[u8]) -> Result<bool, StoreError>;
    /// Overwrite the value under an existing key. Returns `false` if absent.
    fn replace(&self, collection: &str, key: &str, value: &[u8]) -> Result<bool, StoreError>;
    /// Retrieve a value by key.
    fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Delete a key. Returns `false` if it was absent.
    fn delete(&self, collection: &str, key: &str) -> Result<bool, StoreError>;
    /// Visit every value of a collection in key order.
    fn scan(
        &self,
        collection: &str,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
    /// Number of entries in a collection.
    fn count(&self, collection: &str) -> Result<u64, StoreError>;
    /// Names of the collections currently holding at least one entry.
    fn collections(&self) -> Result<Vec<String>, StoreError>;
    /// Flush any buffered writes to the backend.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Configuration for selecting and building a backend.
///
/// ```
/// use store::BackendConfig;
///
/// let config = BackendConfig::from_uri("memory://").unwrap();
/// assert_eq!(config, BackendConfig::InMemory);
///
/// let config = BackendConfig::from_uri("redb:///data/docgate.redb").unwrap();
/// assert_eq!(config, BackendConfig::redb("/data/docgate.redb"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// Use Redb for storage. The `path` is the file path for the database.
    ///
    /// Requires the `backend-redb` feature (enabled by default).
    Redb { path: String },
    /// Process-local storage that is lost on shutdown. Useful for testing.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    /// Parse a store connection string.
    ///
    /// - empty, `memory://` or `mem://` selects the in-memory backend
    /// - `redb://<path>` selects a redb database file at `<path>`
    pub fn from_uri(uri: &str) -> Result<Self, StoreError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Ok(BackendConfig::InMemory);
        }

        let Some((scheme, rest)) = uri.split_once("://") else {
            return Err(StoreError::Config(format!(
                "connection string '{uri}' has no scheme, expected memory:// or redb://<path>"
            )));
        };

        match scheme.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(BackendConfig::InMemory),
            "redb" if !rest.is_empty() => Ok(BackendConfig::redb(rest)),
            "redb" => Err(StoreError::Config(
                "redb connection string needs a file path".to_string(),
            )),
            other => Err(StoreError::Config(format!(
                "unsupported store scheme '{other}'"
            ))),
        }
    }

    /// Build the backend described by this configuration.
    pub fn build(&self) -> Result<Box<dyn StorageBackend>, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(StoreError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

type CollectionMap = BTreeMap<String, Vec<u8>>;

/// An in-memory backend: one ordered map per collection behind a `RwLock`.
pub struct InMemoryBackend {
    collections: RwLock<HashMap<String, CollectionMap>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::backend("poisoned lock")
}

impl StorageBackend for InMemoryBackend {
    fn insert(&self, collection: &str, key: &str, value: &[u8]) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        let entries = guard.entry(collection.to_string()).or_default();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn replace(&self, collection: &str, key: &str, value: &[u8]) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        match guard.get_mut(collection).and_then(|c| c.get_mut(key)) {
            Some(slot) => {
                *slot = value.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self.collections.read().map_err(poisoned)?;
        Ok(guard.get(collection).and_then(|c| c.get(key)).cloned())
    }

    fn delete(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().map_err(poisoned)?;
        let Some(entries) = guard.get_mut(collection) else {
            return Ok(false);
        };
        let removed = entries.remove(key).is_some();
        if entries.is_empty() {
            guard.remove(collection);
        }
        Ok(removed)
    }

    fn scan(
        &self,
        collection: &str,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        // A read lock is held for the duration of the scan.
        let guard = self.collections.read().map_err(poisoned)?;
        if let Some(entries) = guard.get(collection) {
            for value in entries.values() {
                visitor(value)?;
            }
        }
        Ok(())
    }

    fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let guard = self.collections.read().map_err(poisoned)?;
        Ok(guard.get(collection).map_or(0, |c| c.len() as u64))
    }

    fn collections(&self) -> Result<Vec<String>, StoreError> {
        let guard = self.collections.read().map_err(poisoned)?;
        let mut names: Vec<String> = guard
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

/// The Redb backend implementation: one table per collection.
#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use redb::RedbBackend;

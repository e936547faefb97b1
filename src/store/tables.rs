//! Table implementations
//!
//! HashMap-based partitions with parking_lot RwLocks.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

/// Flat key → value table. Last write wins.
#[derive(Debug, Default)]
pub struct StringTable {
    data: RwLock<HashMap<Bytes, Bytes>>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key (write lock)
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.data.write().insert(key, value);
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.data.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy of the whole table, for comparing states in tests and diagnostics
    pub fn snapshot(&self) -> HashMap<Bytes, Bytes> {
        self.data.read().clone()
    }
}

/// Hash name → (field → value) table
///
/// Inner maps are created on first write to a hash and never removed.
#[derive(Debug, Default)]
pub struct HashTable {
    data: RwLock<HashMap<Bytes, HashMap<Bytes, Bytes>>>,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, creating the hash if needed (write lock)
    ///
    /// Creation and the first field write happen under the same guard.
    pub fn set(&self, hash: Bytes, field: Bytes, value: Bytes) {
        self.data
            .write()
            .entry(hash)
            .or_default()
            .insert(field, value);
    }

    /// Get one field (read lock). `None` if the hash or the field is absent.
    pub fn get(&self, hash: &[u8], field: &[u8]) -> Option<Bytes> {
        self.data
            .read()
            .get(hash)
            .and_then(|fields| fields.get(field))
            .cloned()
    }

    /// All (field, value) pairs of a hash in map iteration order (read lock)
    ///
    /// The order is unspecified. `None` if the hash does not exist.
    pub fn get_all(&self, hash: &[u8]) -> Option<Vec<(Bytes, Bytes)>> {
        self.data.read().get(hash).map(|fields| {
            fields
                .iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect()
        })
    }

    /// Number of hashes
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn snapshot(&self) -> HashMap<Bytes, HashMap<Bytes, Bytes>> {
        self.data.read().clone()
    }
}

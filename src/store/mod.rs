//! Store Module
//!
//! In-memory state for the server.
//!
//! ## Responsibilities
//! - Hold the flat string table and the nested hash table
//! - Shared reads / exclusive writes, per partition
//! - No I/O while any lock is held
//!
//! ## Concurrency
//! Each partition has its own `RwLock`. No operation ever holds both, so
//! there is no lock ordering to get wrong and no cross-partition atomicity.

mod tables;

pub use tables::{HashTable, StringTable};

/// Both partitions, owned together and shared by reference
#[derive(Debug, Default)]
pub struct Store {
    strings: StringTable,
    hashes: HashTable,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The flat key → value partition
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// The hash name → (field → value) partition
    pub fn hashes(&self) -> &HashTable {
        &self.hashes
    }
}

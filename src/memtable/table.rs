//! MemTable implementation
//!
//! BTreeMap-based memtable with incremental size accounting.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;

use super::Record;

/// Fixed per-entry cost added to key and value bytes when sizing the table
pub const ENTRY_OVERHEAD: usize = 32;

/// In-memory table for recent writes
#[derive(Debug, Default)]
pub struct MemTable {
    data: BTreeMap<Vec<u8>, Record>,
    /// Approximate size in bytes
    size: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key; tombstones are returned as `Record::Tombstone`
    pub fn get(&self, key: &[u8]) -> Option<&Record> {
        self.data.get(key)
    }

    /// Put a key-value pair, returning the new approximate size
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, Record::Live(value))
    }

    /// Delete a key by inserting a tombstone, returning the new approximate size
    pub fn delete(&mut self, key: Vec<u8>) -> usize {
        self.insert(key, Record::Tombstone)
    }

    fn insert(&mut self, key: Vec<u8>, record: Record) -> usize {
        let key_len = key.len();
        self.size += entry_size(key_len, &record);
        if let Some(old) = self.data.insert(key, record) {
            self.size -= entry_size(key_len, &old);
        }
        self.size
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get entry count (tombstones included)
    pub fn entry_count(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check whether either configured limit has been reached
    pub fn should_flush(&self, size_limit: usize, entry_limit: Option<usize>) -> bool {
        self.size >= size_limit || entry_limit.is_some_and(|limit| self.data.len() >= limit)
    }

    /// All entries in sorted key order
    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, Record> {
        self.data.iter()
    }

    /// Entries with key >= `from`, in sorted key order
    pub fn range_from(&self, from: &[u8]) -> btree_map::Range<'_, Vec<u8>, Record> {
        self.data
            .range::<[u8], _>((Bound::Included(from), Bound::Unbounded))
    }

    /// Clear all entries (after a successful flush)
    pub fn clear(&mut self) {
        self.data.clear();
        self.size = 0;
    }
}

fn entry_size(key_len: usize, record: &Record) -> usize {
    key_len + record.value().map_or(0, <[u8]>::len) + ENTRY_OVERHEAD
}

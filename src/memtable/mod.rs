//! MemTable Module
//!
//! In-memory buffer of writes that have not been flushed yet.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Track approximate size and entry count for the flush trigger
//! - Ordered iteration for flush and range scans
//!
//! ## Data Structure Choice
//! A plain `BTreeMap` owned by the engine: keys stay sorted, and the engine
//! is single-threaded so no lock is needed around it.

mod table;

pub use table::{MemTable, ENTRY_OVERHEAD};

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A live value (may be empty)
    Live(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}

impl Record {
    /// The live value, or `None` for a tombstone
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Record::Live(value) => Some(value),
            Record::Tombstone => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Record::Tombstone)
    }
}

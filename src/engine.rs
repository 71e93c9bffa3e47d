//! Engine Module
//!
//! The storage engine that coordinates the MemTable and the on-disk table.
//!
//! ## Responsibilities
//! - Route reads: MemTable first, then the on-disk table
//! - Buffer writes and flush when the MemTable reaches its limits
//! - Merge both sources for range scans
//! - Flush everything on close

use std::path::Path;

use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{EmberError, Result};
use crate::iterator::RangeIter;
use crate::memtable::{MemTable, Record};
use crate::storage::OnDiskTable;

/// The main storage engine
///
/// ## Concurrency Model: single-threaded
///
/// - Writes and flushes take `&mut self`; a flush triggered by a write runs
///   inline before the write returns
/// - Reads take `&self` but share one blob handle, so the engine is `!Sync`
/// - The engine owns its data directory while open; nothing else may write
///   the index or blob files
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// In-memory table for writes not yet flushed
    memtable: MemTable,

    /// Durable index + blob pair
    table: OnDiskTable,

    /// Set by `close` so `Drop` does not flush a second time
    closed: bool,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Create the data directory if missing, then load the existing
    ///    index + blob pair or create an empty one
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let table = OnDiskTable::open(
            &config.data_dir,
            config.index_format,
            config.sync_on_flush,
        )?;

        info!(
            dir = %config.data_dir.display(),
            entries = table.len(),
            generation = table.generation(),
            "engine opened"
        );

        Ok(Self {
            config,
            memtable: MemTable::new(),
            table,
            closed: false,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (a tombstone here means deleted)
    /// 2. On-disk table
    ///
    /// Returns `Err(KeyNotFound)` when the key has no live value.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        match self.memtable.get(key) {
            Some(Record::Live(value)) => Ok(value.clone()),
            Some(Record::Tombstone) => Err(EmberError::KeyNotFound),
            None => self.table.get(key),
        }
    }

    /// Insert or overwrite a key; may flush before returning
    pub fn upsert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.memtable.put(key.to_vec(), value.to_vec());
        self.maybe_flush()
    }

    /// Delete a key by buffering a tombstone; may flush before returning
    ///
    /// Deleting an absent key is not an error.
    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        self.memtable.delete(key.to_vec());
        self.maybe_flush()
    }

    /// Live records with key >= `from`, ascending
    ///
    /// The iterator borrows the engine, so no write can run while it is alive.
    pub fn range(&self, from: &[u8]) -> RangeIter<'_> {
        RangeIter::new(self.memtable.range_from(from), &self.table, from)
    }

    /// Flush memtable to disk (public API)
    ///
    /// Forces a flush regardless of memtable size. A no-op if nothing is
    /// buffered.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_internal()
    }

    /// Close the engine, flushing anything still buffered
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.flush_internal()?;
        info!(dir = %self.config.data_dir.display(), "engine closed");
        Ok(())
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.memtable.should_flush(
            self.config.memtable_size_limit,
            self.config.memtable_entry_limit,
        ) {
            debug!(
                size = self.memtable.size(),
                entries = self.memtable.entry_count(),
                "memtable limit reached"
            );
            self.flush_internal()?;
        }
        Ok(())
    }

    fn flush_internal(&mut self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        // Only drop buffered writes once the new files are published
        self.table.flush(&self.memtable)?;
        self.memtable.clear();
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Path of the published index file
    pub fn index_path(&self) -> std::path::PathBuf {
        self.table.index_path()
    }

    /// Path of the current blob file
    pub fn blob_path(&self) -> &Path {
        self.table.blob_path()
    }

    /// Get the current memtable size
    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    /// Get the memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    /// Number of live entries in the on-disk table
    pub fn disk_entry_count(&self) -> usize {
        self.table.len()
    }

    /// Blob generation currently published
    pub fn generation(&self) -> u64 {
        self.table.generation()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.closed || self.memtable.is_empty() {
            return;
        }
        if let Err(e) = self.flush_internal() {
            error!(
                dir = %self.config.data_dir.display(),
                error = %e,
                "flush on drop failed, buffered writes lost"
            );
        }
    }
}

//! Configuration for emberkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{EmberError, Result};
use crate::storage::IndexFormat;

/// Main configuration for an emberkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the index and blob files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── index.db            (sorted key → (offset, length))
    ///     └── blob-{gen:06}.db    (raw value bytes)
    pub data_dir: PathBuf,

    /// Body format used when writing the index file
    pub index_format: IndexFormat,

    /// fsync staged files and the directory before publishing a flush
    pub sync_on_flush: bool,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Approximate MemTable size (in bytes) that triggers a flush
    pub memtable_size_limit: usize,

    /// Optional MemTable entry count that triggers a flush
    pub memtable_entry_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./emberkv_data"),
            index_format: IndexFormat::Binary,
            sync_on_flush: true,
            memtable_size_limit: 4 * 1024 * 1024, // 4 MB
            memtable_entry_limit: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject limits that would flush on every write or never make sense
    pub fn validate(&self) -> Result<()> {
        if self.memtable_size_limit == 0 {
            return Err(EmberError::Config(
                "memtable_size_limit must be greater than zero".to_string(),
            ));
        }
        if self.memtable_entry_limit == Some(0) {
            return Err(EmberError::Config(
                "memtable_entry_limit must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the index body format for future flushes
    pub fn index_format(mut self, format: IndexFormat) -> Self {
        self.config.index_format = format;
        self
    }

    /// Enable or disable fsync before publishing a flush
    pub fn sync_on_flush(mut self, sync: bool) -> Self {
        self.config.sync_on_flush = sync;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    /// Flush once the memtable holds this many entries
    pub fn memtable_entry_limit(mut self, count: usize) -> Self {
        self.config.memtable_entry_limit = Some(count);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

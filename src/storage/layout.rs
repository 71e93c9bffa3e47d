//! Data directory layout
//!
//! Names the files of a data directory and sorts out what an existing
//! directory holds before the table is opened.
//!
//! ```text
//! {data_dir}/
//!   ├── index.db            published index (names its blob generation)
//!   ├── index.db.tmp        staging index, only during a flush
//!   └── blob-{gen:06}.db    value bytes of generation `gen`
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{EmberError, Result};

pub const INDEX_FILENAME: &str = "index.db";
pub const STAGING_SUFFIX: &str = ".tmp";
const BLOB_PREFIX: &str = "blob-";
const BLOB_SUFFIX: &str = ".db";

/// Path of the published index file
pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILENAME)
}

/// Path of the staging index written during a flush
pub fn staging_index_path(dir: &Path) -> PathBuf {
    dir.join(format!("{INDEX_FILENAME}{STAGING_SUFFIX}"))
}

/// Path of the blob file for a generation
pub fn blob_path(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("{BLOB_PREFIX}{generation:06}{BLOB_SUFFIX}"))
}

/// Parse the generation from a blob filename
/// "blob-000042.db" → Some(42)
///
/// Only the exact name `blob_path` produces is accepted, so "blob-42.db" or
/// "blob-+42.db" are not blob files.
pub fn parse_blob_generation(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let id = name.strip_prefix(BLOB_PREFIX)?.strip_suffix(BLOB_SUFFIX)?;
    let generation: u64 = id.parse().ok()?;
    (format!("{generation:06}") == id).then_some(generation)
}

/// What a data directory holds
#[derive(Debug, Default)]
pub struct DirListing {
    pub has_index: bool,
    /// Every blob file found, sorted by generation
    pub blobs: Vec<u64>,
    /// `index.db.tmp` left by an interrupted flush
    pub has_staging: bool,
}

impl DirListing {
    /// List the engine's files in `dir`; unrelated files are ignored
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut listing = DirListing::default();
        let staging_name = format!("{INDEX_FILENAME}{STAGING_SUFFIX}");
        let entries = fs::read_dir(dir)
            .map_err(|e| EmberError::file_op(format!("list {}", dir.display()), e))?;

        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str());

            if name == Some(staging_name.as_str()) {
                listing.has_staging = true;
            } else if name == Some(INDEX_FILENAME) {
                listing.has_index = true;
            } else if let Some(generation) = parse_blob_generation(&path) {
                listing.blobs.push(generation);
            }
        }

        listing.blobs.sort_unstable();
        Ok(listing)
    }

    /// True if neither an index nor any blob is present
    pub fn is_empty(&self) -> bool {
        !self.has_index && self.blobs.is_empty()
    }

    /// True if the directory can be (re)created from scratch
    ///
    /// Besides an empty directory this covers a create that stopped before
    /// publishing its index: no index, and at most an empty generation-0 blob.
    pub fn is_fresh(&self, dir: &Path) -> Result<bool> {
        if self.is_empty() {
            return Ok(true);
        }
        if self.has_index || self.blobs != [0] {
            return Ok(false);
        }
        let path = blob_path(dir, 0);
        let len = fs::metadata(&path)
            .map_err(|e| EmberError::file_op(format!("stat {}", path.display()), e))?
            .len();
        Ok(len == 0)
    }
}

/// Delete a file, mapping failure to a file operation error
pub fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path)
        .map_err(|e| EmberError::file_op(format!("delete {}", path.display()), e))
}

/// Delete files left behind by an interrupted flush
///
/// Blob generations other than `keep` and the staging index are removed.
pub fn remove_leftovers(dir: &Path, listing: &DirListing, keep: Option<u64>) -> Result<()> {
    if listing.has_staging {
        let path = staging_index_path(dir);
        warn!(path = %path.display(), "removing leftover staging file");
        remove_file(&path)?;
    }
    for &generation in listing.blobs.iter().filter(|&&g| Some(g) != keep) {
        let path = blob_path(dir, generation);
        warn!(path = %path.display(), generation, "removing unreferenced blob file");
        remove_file(&path)?;
    }
    Ok(())
}

/// fsync a directory so renames inside it are durable
pub fn sync_dir(dir: &Path) -> Result<()> {
    let dir_fd = fs::File::open(dir)
        .map_err(|e| EmberError::file_op(format!("open dir {}", dir.display()), e))?;
    dir_fd.sync_all()?;
    Ok(())
}

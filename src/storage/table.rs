//! On-Disk Table
//!
//! Durable sorted mapping key → (offset, length) into the current blob file.
//!
//! ## Flush (merge) protocol
//! 1. Plan the new contents: current index, minus tombstoned keys, with
//!    MemTable values marked pending
//! 2. Write every planned value, in key order, to `blob-{g+1}.db`
//! 3. Stage the new index as `index.db.tmp` and fsync both files
//! 4. Rename `index.db.tmp` over `index.db` (the commit point), fsync the dir
//! 5. Swap the in-memory state and delete `blob-{g}.db`
//!
//! A failure before step 4 leaves the previous index and blob untouched.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{EmberError, Result};
use crate::memtable::{MemTable, Record};

use super::blob::{BlobStore, BlobWriter};
use super::layout::{self, DirListing};
use super::record::{self, IndexEntry, IndexFormat, IndexHeader};

/// Where a planned entry's value comes from during a flush
enum Source<'a> {
    /// Buffered in the MemTable, not yet on disk
    Pending(&'a [u8]),
    /// Already in the current blob file
    Stored(IndexEntry),
}

/// Outcome of a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    /// Live entries in the new index
    pub entries: usize,
    /// Size of the new blob file
    pub bytes: u64,
    /// Generation now published
    pub generation: u64,
}

/// Durable index plus the blob file it points into
#[derive(Debug)]
pub struct OnDiskTable {
    dir: PathBuf,
    /// Body format for future index writes
    format: IndexFormat,
    sync: bool,
    generation: u64,
    index: BTreeMap<Vec<u8>, IndexEntry>,
    blob: BlobStore,
}

impl OnDiskTable {
    /// Open the table in `dir`, creating the directory if missing and an
    /// empty table if it holds no index and no blob
    ///
    /// An index without a blob, or blobs without an index, is an error. The
    /// one exception is an unpublished create: an empty generation-0 blob
    /// with no index is started over.
    pub fn open(dir: &Path, format: IndexFormat, sync: bool) -> Result<Self> {
        fs::create_dir_all(dir)
            .map_err(|e| EmberError::file_op(format!("create dir {}", dir.display()), e))?;

        let listing = DirListing::scan(dir)?;

        if listing.is_fresh(dir)? {
            layout::remove_leftovers(dir, &listing, None)?;
            return Self::create(dir, format, sync);
        }

        if !listing.has_index {
            return Err(EmberError::layout(format!(
                "{} holds blob files but no {}",
                dir.display(),
                layout::INDEX_FILENAME
            )));
        }
        if listing.blobs.is_empty() {
            return Err(EmberError::layout(format!(
                "{} holds {} but no blob file",
                dir.display(),
                layout::INDEX_FILENAME
            )));
        }

        let table = Self::load(dir, format, sync, &listing)?;
        layout::remove_leftovers(dir, &listing, Some(table.generation))?;
        Ok(table)
    }

    /// Load path: parse the published index and open the blob it names
    fn load(dir: &Path, format: IndexFormat, sync: bool, listing: &DirListing) -> Result<Self> {
        let index_path = layout::index_path(dir);
        let bytes = fs::read(&index_path).map_err(|e| {
            EmberError::file_op(format!("read index {}", index_path.display()), e)
        })?;

        let newline = bytes
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| EmberError::Parse("index header line is missing".to_string()))?;
        let header_line = std::str::from_utf8(&bytes[..newline])
            .map_err(|_| EmberError::Parse("index header is not UTF-8".to_string()))?;
        let header = IndexHeader::decode(header_line)?;
        let body = &bytes[newline + 1..];

        if !listing.blobs.contains(&header.generation) {
            return Err(EmberError::layout(format!(
                "index names {} which does not exist",
                layout::blob_path(dir, header.generation).display()
            )));
        }

        let crc = crc32fast::hash(body);
        if crc != header.crc {
            return Err(EmberError::Corruption(format!(
                "index body checksum mismatch: header {:08x}, computed {crc:08x}",
                header.crc
            )));
        }

        let records = record::decode_body(header.format, body)?;
        if records.len() as u64 != header.count {
            return Err(EmberError::Parse(format!(
                "index header announces {} records, body holds {}",
                header.count,
                records.len()
            )));
        }

        let blob = BlobStore::open(&layout::blob_path(dir, header.generation))?;
        let mut index = BTreeMap::new();
        for (key, entry) in records {
            if !blob.contains(&entry) {
                return Err(EmberError::Corruption(format!(
                    "entry at offset {} (length {}) lies outside blob of {} bytes",
                    entry.offset,
                    entry.length,
                    blob.len()
                )));
            }
            if index.insert(key, entry).is_some() {
                return Err(EmberError::Parse("duplicate key in index".to_string()));
            }
        }

        debug!(
            dir = %dir.display(),
            entries = index.len(),
            generation = header.generation,
            format = %header.format,
            "loaded index"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            format,
            sync,
            generation: header.generation,
            index,
            blob,
        })
    }

    /// Create path: an empty generation-0 blob and an empty index
    fn create(dir: &Path, format: IndexFormat, sync: bool) -> Result<Self> {
        let blob_path = layout::blob_path(dir, 0);
        BlobWriter::create(&blob_path)?.finish(sync)?;
        let blob = BlobStore::open(&blob_path)?;

        let index = BTreeMap::new();
        stage_index(dir, format, 0, &index, sync)?;
        commit_index(dir)?;
        if sync {
            layout::sync_dir(dir)?;
        }

        debug!(dir = %dir.display(), format = %format, "created empty table");

        Ok(Self {
            dir: dir.to_path_buf(),
            format,
            sync,
            generation: 0,
            index,
            blob,
        })
    }

    /// Get a value by key
    ///
    /// Returns `Err(KeyNotFound)` if the key is not in the index.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let entry = self.index.get(key).ok_or(EmberError::KeyNotFound)?;
        self.blob.read(entry)
    }

    /// Index entries with key >= `from`, ascending; values are not read
    pub fn iter(&self, from: &[u8]) -> btree_map::Range<'_, Vec<u8>, IndexEntry> {
        self.index
            .range::<[u8], _>((Bound::Included(from), Bound::Unbounded))
    }

    /// Resolve an entry obtained from `iter`
    pub fn read_value(&self, entry: &IndexEntry) -> Result<Vec<u8>> {
        self.blob.read(entry)
    }

    /// Merge the MemTable into a freshly written index + blob pair
    ///
    /// The caller clears the MemTable once this returns `Ok`.
    pub fn flush(&mut self, memtable: &MemTable) -> Result<FlushStats> {
        let started = Instant::now();
        let next = self.generation + 1;
        let next_blob_path = layout::blob_path(&self.dir, next);
        if next_blob_path.exists() {
            return Err(EmberError::layout(format!(
                "{} already exists",
                next_blob_path.display()
            )));
        }

        let (index, bytes, blob) = match self.stage_generation(memtable, next) {
            Ok(staged) => staged,
            Err(e) => {
                self.discard_staged(&next_blob_path);
                return Err(e);
            }
        };

        if let Err(e) = commit_index(&self.dir) {
            self.discard_staged(&next_blob_path);
            return Err(e);
        }

        // Published: memory must follow the disk even if a later step fails
        let old_blob = std::mem::replace(&mut self.blob, blob);
        let old_blob_path = old_blob.path().to_path_buf();
        drop(old_blob);
        self.index = index;
        self.generation = next;

        if self.sync {
            layout::sync_dir(&self.dir)?;
        }
        layout::remove_file(&old_blob_path)?;

        let stats = FlushStats {
            entries: self.index.len(),
            bytes,
            generation: next,
        };
        info!(
            entries = stats.entries,
            bytes = stats.bytes,
            generation = stats.generation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "flushed table"
        );
        Ok(stats)
    }

    /// Steps 1-3: write the new blob and staging index, nothing published yet
    fn stage_generation(
        &self,
        memtable: &MemTable,
        generation: u64,
    ) -> Result<(BTreeMap<Vec<u8>, IndexEntry>, u64, BlobStore)> {
        let plan = self.plan(memtable);
        let blob_path = layout::blob_path(&self.dir, generation);
        let mut writer = BlobWriter::create(&blob_path)?;
        let mut index = BTreeMap::new();

        for (key, source) in plan {
            let entry = match source {
                Source::Pending(value) => writer.append(value)?,
                Source::Stored(old) => {
                    let value = self.blob.read(&old)?;
                    writer.append(&value)?
                }
            };
            index.insert(key.to_vec(), entry);
        }

        let bytes = writer.finish(self.sync)?;
        let blob = BlobStore::open(&blob_path)?;
        stage_index(&self.dir, self.format, generation, &index, self.sync)?;
        Ok((index, bytes, blob))
    }

    /// Current index with the MemTable applied, in key order
    fn plan<'a>(&'a self, memtable: &'a MemTable) -> BTreeMap<&'a [u8], Source<'a>> {
        let mut plan: BTreeMap<&[u8], Source<'_>> = self
            .index
            .iter()
            .map(|(key, entry)| (key.as_slice(), Source::Stored(*entry)))
            .collect();

        for (key, record) in memtable.iter() {
            match record {
                Record::Live(value) => {
                    plan.insert(key.as_slice(), Source::Pending(value));
                }
                Record::Tombstone => {
                    plan.remove(key.as_slice());
                }
            }
        }
        plan
    }

    /// Best-effort removal of a failed flush's files
    fn discard_staged(&self, blob_path: &Path) {
        let staging = layout::staging_index_path(&self.dir);
        for path in [blob_path, staging.as_path()] {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "could not remove staged file");
                }
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of live entries on disk
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Generation of the published blob
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn index_path(&self) -> PathBuf {
        layout::index_path(&self.dir)
    }

    pub fn blob_path(&self) -> &Path {
        self.blob.path()
    }

    /// Body format used for the next index write
    pub fn format(&self) -> IndexFormat {
        self.format
    }
}

/// Write the index for `generation` under the staging name
fn stage_index(
    dir: &Path,
    format: IndexFormat,
    generation: u64,
    index: &BTreeMap<Vec<u8>, IndexEntry>,
    sync: bool,
) -> Result<()> {
    let body = record::encode_body(format, index.iter().map(|(k, e)| (k.as_slice(), e)))?;
    let header = IndexHeader {
        format,
        generation,
        count: index.len() as u64,
        crc: crc32fast::hash(&body),
    };

    let path = layout::staging_index_path(dir);
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .map_err(|e| EmberError::file_op(format!("create {}", path.display()), e))?;
    file.write_all(header.encode().as_bytes())?;
    file.write_all(&body)?;
    if sync {
        file.sync_all()?;
    }
    Ok(())
}

/// Publish the staging index over the live one
///
/// The rename is the single atomic step of a flush.
fn commit_index(dir: &Path) -> Result<()> {
    let staging = layout::staging_index_path(dir);
    let live = layout::index_path(dir);
    fs::rename(&staging, &live).map_err(|e| {
        EmberError::file_op(
            format!("rename {} to {}", staging.display(), live.display()),
            e,
        )
    })
}

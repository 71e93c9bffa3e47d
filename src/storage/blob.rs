//! Blob Store
//!
//! Append-only file of raw value bytes. A value only has meaning through the
//! `IndexEntry` that points at it.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{EmberError, Result};

use super::record::IndexEntry;

/// Read side of a blob file
///
/// The handle sits in a `RefCell` because every read seeks; this also keeps
/// the store (and the engine around it) `!Sync`.
#[derive(Debug)]
pub struct BlobStore {
    path: PathBuf,
    file: RefCell<File>,
    len: u64,
}

impl BlobStore {
    /// Open an existing blob file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            EmberError::file_op(format!("open blob {}", path.display()), e)
        })?;
        let len = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file: RefCell::new(file),
            len,
        })
    }

    /// Read exactly the bytes addressed by `entry`
    ///
    /// A seek that does not land on `entry.offset` or a short read is an
    /// error; nothing is truncated or zero-filled.
    pub fn read(&self, entry: &IndexEntry) -> Result<Vec<u8>> {
        let blob_err = |source: io::Error| EmberError::BlobRead {
            offset: entry.offset,
            length: entry.length,
            source,
        };

        let mut file = self.file.borrow_mut();
        let pos = file.seek(SeekFrom::Start(entry.offset)).map_err(blob_err)?;
        if pos != entry.offset {
            return Err(blob_err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("seek landed at {pos}"),
            )));
        }

        let mut value = vec![0u8; entry.length as usize];
        file.read_exact(&mut value).map_err(blob_err)?;
        Ok(value)
    }

    /// True if `entry` lies entirely inside the file
    pub fn contains(&self, entry: &IndexEntry) -> bool {
        entry.end().is_some_and(|end| end <= self.len)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File length in bytes at open time
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Append side of a blob file, used while staging a flush
pub struct BlobWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// Next free offset
    position: u64,
}

impl BlobWriter {
    /// Create a new, empty blob file; fails if the file already exists
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| EmberError::file_op(format!("create blob {}", path.display()), e))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            position: 0,
        })
    }

    /// Append a value and return where it landed
    pub fn append(&mut self, value: &[u8]) -> Result<IndexEntry> {
        let length = u32::try_from(value.len()).map_err(|_| {
            EmberError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("value of {} bytes exceeds u32::MAX", value.len()),
            ))
        })?;
        self.writer.write_all(value)?;
        let entry = IndexEntry::new(self.position, length);
        self.position += u64::from(length);
        Ok(entry)
    }

    /// Bytes written so far
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered bytes, optionally fsync, and close the file
    pub fn finish(self, sync: bool) -> Result<u64> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        if sync {
            file.sync_all()?;
        }
        Ok(self.position)
    }
}

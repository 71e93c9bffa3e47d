//! Storage Module
//!
//! Persistent storage: a sorted index file pointing into a blob file of raw
//! values.
//!
//! ## Responsibilities
//! - Persist flushed data as an index + blob pair
//! - Point lookups and ordered scans through the in-memory copy of the index
//! - Rewrite both files on every flush, publishing them atomically
//!
//! ## Files
//! ```text
//! ┌────────────────────────────────────────┐
//! │ index.db                               │
//! │ ┌────────────────────────────────────┐ │
//! │ │ Header line (format, gen, crc)     │ │
//! │ ├────────────────────────────────────┤ │
//! │ │ key → (offset, length) records     │ │
//! │ └────────────────────────────────────┘ │
//! └───────────────────┬────────────────────┘
//!                     │ offset, length
//! ┌───────────────────▼────────────────────┐
//! │ blob-{gen}.db                          │
//! │ value bytes, contiguous, in key order  │
//! └────────────────────────────────────────┘
//! ```
//!
//! Every flush copies all live values forward, so the blob never fragments
//! but each flush costs O(total live bytes).

mod blob;
pub mod layout;
pub mod record;
mod table;

pub use blob::{BlobStore, BlobWriter};
pub use record::{IndexEntry, IndexFormat, IndexHeader};
pub use table::{FlushStats, OnDiskTable};

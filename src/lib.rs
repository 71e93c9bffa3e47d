//! # emberkv
//!
//! An embedded, single-process key-value store with:
//! - Ordered get / upsert / remove / range over opaque byte keys and values
//! - An in-memory write buffer flushed on a size or entry-count limit
//! - A durable sorted index pointing into an append-only blob file
//! - Atomic publication of every flush through a single rename
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                              │
//! │          get / upsert / remove / range / flush / close       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐  flush   ┌─────────────┐
//!   │  MemTable   │ ───────▶ │ OnDiskTable │
//!   │  (BTreeMap) │          │ (index.db)  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ offset, length
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  BlobStore  │
//!                           │ (blob-N.db) │
//!                           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use emberkv::Engine;
//!
//! let mut engine = Engine::open_path(std::path::Path::new("./data"))?;
//! engine.upsert(b"hello", b"world")?;
//! assert_eq!(engine.get(b"hello")?, b"world".to_vec());
//! for record in engine.range(b"") {
//!     let (key, value) = record?;
//!     println!("{:?} => {:?}", key, value);
//! }
//! engine.close()?;
//! # Ok::<(), emberkv::EmberError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod memtable;
pub mod storage;
pub mod iterator;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result};
pub use config::Config;
pub use engine::Engine;
pub use iterator::RangeIter;
pub use storage::IndexFormat;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

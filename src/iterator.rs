//! Range Iterator
//!
//! Lazy, ascending merge of the MemTable tail and the on-disk tail.
//!
//! - Keys come out strictly ascending, all `>= from`
//! - On equal keys the MemTable (newer) side wins and the disk entry is
//!   dropped; a MemTable tombstone therefore hides the disk key
//! - Disk values are read from the blob only when their record is produced
//! - A blob read failure is yielded once, then the iterator is exhausted

use std::cmp::Ordering;
use std::collections::btree_map;
use std::iter::{FusedIterator, Peekable};

use crate::error::Result;
use crate::memtable::Record;
use crate::storage::{IndexEntry, OnDiskTable};

/// Which source supplies the next record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Mem,
    Disk,
    /// Same key on both sides: take the MemTable record, skip the disk one
    MemOverDisk,
}

/// Merge comparator; `None` when both sides are exhausted
fn choose(mem: Option<&[u8]>, disk: Option<&[u8]>) -> Option<Next> {
    match (mem, disk) {
        (None, None) => None,
        (Some(_), None) => Some(Next::Mem),
        (None, Some(_)) => Some(Next::Disk),
        (Some(m), Some(d)) => Some(match m.cmp(d) {
            Ordering::Less => Next::Mem,
            Ordering::Greater => Next::Disk,
            Ordering::Equal => Next::MemOverDisk,
        }),
    }
}

/// Iterator over live `(key, value)` pairs with key >= a start key
pub struct RangeIter<'a> {
    mem: Peekable<btree_map::Range<'a, Vec<u8>, Record>>,
    disk: Peekable<btree_map::Range<'a, Vec<u8>, IndexEntry>>,
    table: &'a OnDiskTable,
    done: bool,
}

impl<'a> RangeIter<'a> {
    pub(crate) fn new(
        mem: btree_map::Range<'a, Vec<u8>, Record>,
        table: &'a OnDiskTable,
        from: &[u8],
    ) -> Self {
        Self {
            mem: mem.peekable(),
            disk: table.iter(from).peekable(),
            table,
            done: false,
        }
    }
}

impl<'a> Iterator for RangeIter<'a> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let mem_key = self.mem.peek().map(|&(key, _)| key.as_slice());
            let disk_key = self.disk.peek().map(|&(key, _)| key.as_slice());

            let next = match choose(mem_key, disk_key) {
                Some(next) => next,
                None => {
                    self.done = true;
                    break;
                }
            };

            if next == Next::MemOverDisk {
                self.disk.next();
            }

            match next {
                Next::Mem | Next::MemOverDisk => {
                    let (key, record) = self.mem.next()?;
                    match record {
                        Record::Live(value) => return Some(Ok((key.clone(), value.clone()))),
                        Record::Tombstone => continue,
                    }
                }
                Next::Disk => {
                    let (key, entry) = self.disk.next()?;
                    return match self.table.read_value(entry) {
                        Ok(value) => Some(Ok((key.clone(), value))),
                        Err(e) => {
                            self.done = true;
                            Some(Err(e))
                        }
                    };
                }
            }
        }
        None
    }
}

impl FusedIterator for RangeIter<'_> {}

//! Index record codecs
//!
//! An index file is one ASCII header line followed by a body of records:
//!
//! ```text
//! EMBERKV-INDEX <version> <text|binary> <generation> <count> <crc32-hex>\n
//! <body>
//! ```
//!
//! ### Text body
//! One line per record: every key byte as an unsigned decimal followed by
//! `:`, then `key_len:offset:length\n`. Key `ab` at offset 5, length 3:
//! `97:98:2:5:3`. Lines are parsed from the right so the key length decides
//! how many key fields precede it.
//!
//! ### Binary body
//! ```text
//! ┌────────────┬────────────┬────────────┬───────────┐
//! │KeyLen (u32)│Offset (u64)│Length (u32)│    Key    │
//! └────────────┴────────────┴────────────┴───────────┘
//! ```
//! All integers little-endian.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut};

use crate::error::{EmberError, Result};

/// Magic word opening every index header line
pub const INDEX_MAGIC: &str = "EMBERKV-INDEX";

/// Current index file version
pub const INDEX_VERSION: u16 = 1;

/// Fixed part of a binary record: key_len (4) + offset (8) + length (4)
pub const BINARY_RECORD_HEADER: usize = 16;

/// Location of a value inside the blob file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: u64,
    pub length: u32,
}

impl IndexEntry {
    pub fn new(offset: u64, length: u32) -> Self {
        Self { offset, length }
    }

    /// First byte past the value; `None` if it does not fit in a `u64`
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(u64::from(self.length))
    }
}

/// Body encoding of the index file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// Colon-separated decimal lines
    Text,
    /// Length-prefixed little-endian records
    Binary,
}

impl fmt::Display for IndexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexFormat::Text => f.write_str("text"),
            IndexFormat::Binary => f.write_str("binary"),
        }
    }
}

impl FromStr for IndexFormat {
    type Err = EmberError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(IndexFormat::Text),
            "binary" => Ok(IndexFormat::Binary),
            other => Err(EmberError::Parse(format!("unknown index format {other:?}"))),
        }
    }
}

// =============================================================================
// Header
// =============================================================================

/// Parsed header line of an index file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub format: IndexFormat,
    pub generation: u64,
    pub count: u64,
    pub crc: u32,
}

impl IndexHeader {
    /// Render the header line, newline included
    pub fn encode(&self) -> String {
        format!(
            "{INDEX_MAGIC} {INDEX_VERSION} {} {} {} {:08x}\n",
            self.format, self.generation, self.count, self.crc
        )
    }

    /// Parse a header line (with or without its trailing newline)
    pub fn decode(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end_matches('\n').split(' ').collect();
        if fields.len() != 6 {
            return Err(EmberError::Parse(format!(
                "index header: expected 6 fields, found {}",
                fields.len()
            )));
        }
        if fields[0] != INDEX_MAGIC {
            return Err(EmberError::Parse(format!(
                "index header: bad magic {:?}",
                fields[0]
            )));
        }
        let version: u16 = parse_field(fields[1], "version", 1)?;
        if version != INDEX_VERSION {
            return Err(EmberError::Parse(format!(
                "index header: unsupported version {version}"
            )));
        }
        let format = fields[2].parse()?;
        let generation = parse_field(fields[3], "generation", 1)?;
        let count = parse_field(fields[4], "count", 1)?;
        let crc = u32::from_str_radix(fields[5], 16).map_err(|_| {
            EmberError::Parse(format!("index header: bad checksum {:?}", fields[5]))
        })?;

        Ok(Self {
            format,
            generation,
            count,
            crc,
        })
    }
}

// =============================================================================
// Text Records
// =============================================================================

/// Encode one record as a text line (newline-terminated)
pub fn encode_line(key: &[u8], entry: &IndexEntry) -> String {
    let mut line = String::with_capacity(key.len() * 4 + 24);
    for byte in key {
        line.push_str(&byte.to_string());
        line.push(':');
    }
    line.push_str(&format!("{}:{}:{}\n", key.len(), entry.offset, entry.length));
    line
}

/// Decode one text line; `line_no` is only used in error messages
pub fn decode_line(line: &str, line_no: usize) -> Result<(Vec<u8>, IndexEntry)> {
    let line = line.strip_suffix('\n').unwrap_or(line);

    // Right to left: length, offset, key length
    let (rest, length) = split_last(line, line_no, "length")?;
    let length: u32 = parse_field(length, "length", line_no)?;
    let (rest, offset) = split_last(rest, line_no, "offset")?;
    let offset: u64 = parse_field(offset, "offset", line_no)?;
    let (key_part, key_len) = match rest.rsplit_once(':') {
        Some((key_part, key_len)) => (key_part, key_len),
        None => ("", rest),
    };
    let key_len: usize = parse_field(key_len, "key length", line_no)?;

    let key = if key_len == 0 {
        if !key_part.is_empty() || rest.contains(':') {
            return Err(field_count_error(line_no, 0, key_part));
        }
        Vec::new()
    } else {
        if !rest.contains(':') {
            return Err(field_count_error(line_no, key_len, ""));
        }
        let fields: Vec<&str> = key_part.split(':').collect();
        if fields.len() != key_len {
            return Err(field_count_error(line_no, key_len, key_part));
        }
        fields
            .into_iter()
            .map(|field| parse_field::<u8>(field, "key byte", line_no))
            .collect::<Result<Vec<u8>>>()?
    };

    Ok((key, IndexEntry::new(offset, length)))
}

fn split_last<'a>(s: &'a str, line_no: usize, field: &str) -> Result<(&'a str, &'a str)> {
    s.rsplit_once(':').ok_or_else(|| {
        EmberError::Parse(format!("line {line_no}: missing {field} field"))
    })
}

fn field_count_error(line_no: usize, expected: usize, key_part: &str) -> EmberError {
    let found = if key_part.is_empty() {
        0
    } else {
        key_part.split(':').count()
    };
    EmberError::Parse(format!(
        "line {line_no}: expected {expected} key bytes, found {found}"
    ))
}

fn parse_field<T: FromStr>(field: &str, name: &str, line_no: usize) -> Result<T> {
    field.parse().map_err(|_| {
        EmberError::Parse(format!("line {line_no}: invalid {name} field {field:?}"))
    })
}

// =============================================================================
// Binary Records
// =============================================================================

/// Append one binary record to `buf`
pub fn encode_binary(buf: &mut impl BufMut, key: &[u8], entry: &IndexEntry) -> Result<()> {
    let key_len = u32::try_from(key.len())
        .map_err(|_| EmberError::Parse(format!("key of {} bytes is too long", key.len())))?;
    buf.put_u32_le(key_len);
    buf.put_u64_le(entry.offset);
    buf.put_u32_le(entry.length);
    buf.put_slice(key);
    Ok(())
}

/// Decode the next binary record from `buf`, advancing it
pub fn decode_binary(buf: &mut impl Buf, record_no: usize) -> Result<(Vec<u8>, IndexEntry)> {
    if buf.remaining() < BINARY_RECORD_HEADER {
        return Err(EmberError::Parse(format!(
            "record {record_no}: truncated header ({} bytes left)",
            buf.remaining()
        )));
    }
    let key_len = buf.get_u32_le() as usize;
    let offset = buf.get_u64_le();
    let length = buf.get_u32_le();
    if buf.remaining() < key_len {
        return Err(EmberError::Parse(format!(
            "record {record_no}: key needs {key_len} bytes, {} left",
            buf.remaining()
        )));
    }
    let mut key = vec![0u8; key_len];
    buf.copy_to_slice(&mut key);
    Ok((key, IndexEntry::new(offset, length)))
}

// =============================================================================
// Whole Bodies
// =============================================================================

/// Encode every entry into a body of the given format
pub fn encode_body<'a, I>(format: IndexFormat, entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a [u8], &'a IndexEntry)>,
{
    let mut body = Vec::new();
    for (key, entry) in entries {
        match format {
            IndexFormat::Text => body.extend_from_slice(encode_line(key, entry).as_bytes()),
            IndexFormat::Binary => encode_binary(&mut body, key, entry)?,
        }
    }
    Ok(body)
}

/// Decode a whole body; records come back in file order
pub fn decode_body(format: IndexFormat, body: &[u8]) -> Result<Vec<(Vec<u8>, IndexEntry)>> {
    match format {
        IndexFormat::Text => {
            let text = std::str::from_utf8(body)
                .map_err(|e| EmberError::Parse(format!("index body is not UTF-8: {e}")))?;
            text.lines()
                .enumerate()
                // the header is line 1
                .map(|(i, line)| decode_line(line, i + 2))
                .collect()
        }
        IndexFormat::Binary => {
            let mut buf = body;
            let mut records = Vec::new();
            while buf.has_remaining() {
                records.push(decode_binary(&mut buf, records.len())?);
            }
            Ok(records)
        }
    }
}

//! Tests for the index record codecs
//!
//! These tests verify:
//! - Text line layout and right-to-left parsing
//! - Keys containing delimiter-like bytes
//! - Parse errors for malformed lines and truncated binary records
//! - Header line encoding and validation

use emberkv::storage::record::{
    decode_binary, decode_body, decode_line, encode_binary, encode_body, encode_line,
    BINARY_RECORD_HEADER,
};
use emberkv::storage::{IndexEntry, IndexFormat, IndexHeader};
use emberkv::EmberError;

fn assert_parse_error<T: std::fmt::Debug>(result: emberkv::Result<T>) {
    match result {
        Err(EmberError::Parse(_)) => {}
        other => panic!("expected parse error, got {:?}", other),
    }
}

// =============================================================================
// Text Line Tests
// =============================================================================

#[test]
fn test_encode_line_layout() {
    let line = encode_line(b"ab", &IndexEntry::new(5, 3));
    assert_eq!(line, "97:98:2:5:3\n");
}

#[test]
fn test_encode_line_uses_unsigned_bytes() {
    let line = encode_line(&[0, 255], &IndexEntry::new(0, 1));
    assert_eq!(line, "0:255:2:0:1\n");
}

#[test]
fn test_encode_line_empty_key() {
    let line = encode_line(b"", &IndexEntry::new(7, 0));
    assert_eq!(line, "0:7:0\n");
}

#[test]
fn test_decode_line() {
    let (key, entry) = decode_line("97:98:2:5:3\n", 2).unwrap();
    assert_eq!(key, b"ab");
    assert_eq!(entry, IndexEntry::new(5, 3));
}

#[test]
fn test_decode_line_without_newline() {
    let (key, entry) = decode_line("120:1:10:20", 2).unwrap();
    assert_eq!(key, b"x");
    assert_eq!(entry, IndexEntry::new(10, 20));
}

#[test]
fn test_decode_line_empty_key() {
    let (key, entry) = decode_line("0:7:0", 2).unwrap();
    assert!(key.is_empty());
    assert_eq!(entry, IndexEntry::new(7, 0));
}

#[test]
fn test_line_with_colon_and_newline_key_bytes() {
    // ':' is 58 and '\n' is 10; both appear only as decimal text
    let key = b":\n:".to_vec();
    let line = encode_line(&key, &IndexEntry::new(42, 9));
    assert_eq!(line, "58:10:58:3:42:9\n");

    let (decoded, entry) = decode_line(&line, 2).unwrap();
    assert_eq!(decoded, key);
    assert_eq!(entry, IndexEntry::new(42, 9));
}

#[test]
fn test_decode_line_missing_offset_field() {
    // key "a", key length 1, length 5: the offset is gone
    assert_parse_error(decode_line("97:1:5", 2));
}

#[test]
fn test_decode_line_too_few_key_bytes() {
    assert_parse_error(decode_line("97:3:0:1", 2));
}

#[test]
fn test_decode_line_too_many_key_bytes() {
    assert_parse_error(decode_line("97:98:99:2:0:1", 2));
}

#[test]
fn test_decode_line_non_numeric_field() {
    assert_parse_error(decode_line("97:1:abc:1", 2));
    assert_parse_error(decode_line("zz:1:0:1", 2));
}

#[test]
fn test_decode_line_byte_out_of_range() {
    assert_parse_error(decode_line("256:1:0:1", 2));
}

#[test]
fn test_decode_line_empty() {
    assert_parse_error(decode_line("", 2));
}

#[test]
fn test_parse_error_names_line() {
    match decode_line("97:1:5", 17) {
        Err(EmberError::Parse(msg)) => assert!(msg.contains("line 17"), "{}", msg),
        other => panic!("expected parse error, got {:?}", other),
    }
}

// =============================================================================
// Binary Record Tests
// =============================================================================

#[test]
fn test_binary_record_layout() {
    let mut buf = Vec::new();
    encode_binary(&mut buf, b"key", &IndexEntry::new(0x0102, 7)).unwrap();

    assert_eq!(buf.len(), BINARY_RECORD_HEADER + 3);
    assert_eq!(&buf[0..4], &3u32.to_le_bytes());
    assert_eq!(&buf[4..12], &0x0102u64.to_le_bytes());
    assert_eq!(&buf[12..16], &7u32.to_le_bytes());
    assert_eq!(&buf[16..], b"key");
}

#[test]
fn test_decode_binary_advances_buffer() {
    let mut buf = Vec::new();
    encode_binary(&mut buf, b"a", &IndexEntry::new(0, 1)).unwrap();
    encode_binary(&mut buf, b"bb", &IndexEntry::new(1, 2)).unwrap();

    let mut slice = buf.as_slice();
    let (k1, e1) = decode_binary(&mut slice, 0).unwrap();
    let (k2, e2) = decode_binary(&mut slice, 1).unwrap();

    assert_eq!((k1.as_slice(), e1), (&b"a"[..], IndexEntry::new(0, 1)));
    assert_eq!((k2.as_slice(), e2), (&b"bb"[..], IndexEntry::new(1, 2)));
    assert!(slice.is_empty());
}

#[test]
fn test_decode_binary_truncated_header() {
    let mut slice: &[u8] = &[1, 0, 0];
    assert_parse_error(decode_binary(&mut slice, 0));
}

#[test]
fn test_decode_binary_truncated_key() {
    let mut buf = Vec::new();
    encode_binary(&mut buf, b"longkey", &IndexEntry::new(0, 1)).unwrap();
    buf.truncate(buf.len() - 2);

    let mut slice = buf.as_slice();
    assert_parse_error(decode_binary(&mut slice, 0));
}

// =============================================================================
// Body Tests
// =============================================================================

fn sample_entries() -> Vec<(Vec<u8>, IndexEntry)> {
    vec![
        (b"".to_vec(), IndexEntry::new(0, 2)),
        (b"alpha".to_vec(), IndexEntry::new(2, 0)),
        (vec![0x00, b':', 0xff], IndexEntry::new(2, 10)),
    ]
}

#[test]
fn test_text_body_reads_back_in_order() {
    let entries = sample_entries();
    let body = encode_body(
        IndexFormat::Text,
        entries.iter().map(|(k, e)| (k.as_slice(), e)),
    )
    .unwrap();

    assert_eq!(body.iter().filter(|&&b| b == b'\n').count(), 3);
    assert_eq!(decode_body(IndexFormat::Text, &body).unwrap(), entries);
}

#[test]
fn test_binary_body_reads_back_in_order() {
    let entries = sample_entries();
    let body = encode_body(
        IndexFormat::Binary,
        entries.iter().map(|(k, e)| (k.as_slice(), e)),
    )
    .unwrap();

    assert_eq!(decode_body(IndexFormat::Binary, &body).unwrap(), entries);
}

#[test]
fn test_text_body_bad_line_fails_whole_body() {
    let body = b"97:1:0:1\n98:1:5\n99:1:1:1\n";
    assert_parse_error(decode_body(IndexFormat::Text, body));
}

#[test]
fn test_binary_body_trailing_garbage() {
    let mut body = Vec::new();
    encode_binary(&mut body, b"k", &IndexEntry::new(0, 1)).unwrap();
    body.extend_from_slice(&[0xAA, 0xBB]);

    assert_parse_error(decode_body(IndexFormat::Binary, &body));
}

#[test]
fn test_empty_bodies() {
    assert!(decode_body(IndexFormat::Text, b"").unwrap().is_empty());
    assert!(decode_body(IndexFormat::Binary, b"").unwrap().is_empty());
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_header_line() {
    let header = IndexHeader {
        format: IndexFormat::Text,
        generation: 12,
        count: 3,
        crc: 0xdeadbeef,
    };

    let line = header.encode();
    assert_eq!(line, "EMBERKV-INDEX 1 text 12 3 deadbeef\n");
    assert_eq!(IndexHeader::decode(&line).unwrap(), header);
}

#[test]
fn test_header_rejects_bad_magic() {
    assert_parse_error(IndexHeader::decode("NOTKV-INDEX 1 text 0 0 00000000"));
}

#[test]
fn test_header_rejects_unknown_version() {
    assert_parse_error(IndexHeader::decode("EMBERKV-INDEX 9 text 0 0 00000000"));
}

#[test]
fn test_header_rejects_unknown_format() {
    assert_parse_error(IndexHeader::decode("EMBERKV-INDEX 1 json 0 0 00000000"));
}

#[test]
fn test_header_rejects_missing_field() {
    assert_parse_error(IndexHeader::decode("EMBERKV-INDEX 1 binary 0 00000000"));
}

#[test]
fn test_index_format_display() {
    assert_eq!(IndexFormat::Text.to_string(), "text");
    assert_eq!("binary".parse::<IndexFormat>().unwrap(), IndexFormat::Binary);
}

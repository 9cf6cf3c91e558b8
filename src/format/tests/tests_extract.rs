//! Tests for the unchecked extraction views and in-place footer rewrite.

use crate::format::*;

fn ikey(user_key: &[u8], seq: SequenceNumber, t: ValueType) -> Vec<u8> {
    let mut out = user_key.to_vec();
    append_internal_key_footer(&mut out, seq, t);
    out
}

#[test]
fn footer_is_little_endian() {
    let key = ikey(b"k", 0x0102_0304, ValueType::VALUE);
    assert_eq!(key.len(), 9);
    assert_eq!(&key[1..], &[0x01, 0x04, 0x03, 0x02, 0x01, 0x00, 0x00, 0x00]);
}

#[test]
fn extract_parts() {
    let key = ikey(b"user", 77, ValueType::MERGE);
    assert_eq!(extract_user_key(&key), b"user");
    assert_eq!(extract_internal_key_footer(&key), (77 << 8) | 2);
    assert_eq!(extract_value_type(&key), ValueType::MERGE);
    assert_eq!(internal_key_seqno(&key), 77);
}

#[test]
fn extract_from_footer_only_key() {
    let key = ikey(b"", 9, ValueType::DELETION);
    assert!(extract_user_key(&key).is_empty());
    assert_eq!(internal_key_seqno(&key), 9);
}

#[test]
fn extract_value_type_surfaces_invalid_bytes() {
    let mut key = ikey(b"x", 1, ValueType::VALUE);
    key[1] = 0x42;
    assert_eq!(extract_value_type(&key), ValueType(0x42));
}

#[test]
fn timestamp_views() {
    // <user_provided_key | ts | footer>
    let mut key = b"abc".to_vec();
    key.extend_from_slice(&[9, 8]);
    append_internal_key_footer(&mut key, 3, ValueType::VALUE);

    assert_eq!(extract_timestamp_from_key(&key, 2), &[9, 8]);
    assert_eq!(extract_user_key_and_strip_timestamp(&key, 2), b"abc");

    let user_key = extract_user_key(&key);
    assert_eq!(strip_timestamp_from_user_key(user_key, 2), b"abc");
    assert_eq!(extract_timestamp_from_user_key(user_key, 2), &[9, 8]);
    assert_eq!(extract_timestamp_from_user_key(user_key, 0), b"");
}

#[test]
fn update_in_place_keeps_user_key() {
    let mut key = ikey(b"stable", 1, ValueType::VALUE);
    let ptr = key.as_ptr();
    update_internal_key(&mut key, 500, ValueType::DELETION);
    assert_eq!(key.as_ptr(), ptr);
    assert_eq!(extract_user_key(&key), b"stable");
    assert_eq!(internal_key_seqno(&key), 500);
    assert_eq!(extract_value_type(&key), ValueType::DELETION);
}

#[test]
#[should_panic(expected = "exceeds MAX_SEQUENCE_NUMBER")]
fn update_in_place_rejects_oversized_sequence() {
    let mut key = ikey(b"k", 1, ValueType::VALUE);
    update_internal_key(&mut key, MAX_SEQUENCE_NUMBER + 1, ValueType::VALUE);
}

#[test]
#[should_panic(expected = "is not a valid key type")]
fn update_in_place_rejects_unknown_type() {
    let mut key = ikey(b"k", 1, ValueType::VALUE);
    update_internal_key(&mut key, 1, ValueType(0x7F));
}

#[test]
#[should_panic(expected = "internal key too small")]
fn extract_user_key_from_short_buffer_panics() {
    extract_user_key(b"short");
}

#[test]
#[should_panic(expected = "too small for a 4-byte timestamp")]
fn extract_timestamp_from_short_key_panics() {
    let key = ikey(b"ab", 1, ValueType::VALUE);
    extract_timestamp_from_key(&key, 4);
}

//! Tests for `RangeTombstone` construction and serialization.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::comparator::{BytewiseComparator, InternalKeyComparator};
use crate::format::{MAX_SEQUENCE_NUMBER, ValueType};
use crate::key::{InternalKey, ParsedInternalKey, parse_internal_key};
use crate::range_del::*;

fn comparator() -> InternalKeyComparator {
    InternalKeyComparator::new(Arc::new(BytewiseComparator))
}

// ------------------------------------------------------------------------------------------------
// Serialization
// ------------------------------------------------------------------------------------------------

#[test]
fn serialize_stores_start_in_key_and_end_in_value() {
    let tombstone = RangeTombstone::new(b"a", b"m", 10);
    let (key, value) = tombstone.serialize();

    let parsed = parse_internal_key(key.encode(), false).unwrap();
    assert_eq!(parsed.user_key, b"a");
    assert_eq!(parsed.sequence, 10);
    assert_eq!(parsed.value_type, ValueType::RANGE_DELETION);
    assert_eq!(value, b"m");
    assert_eq!(tombstone.serialize_key(), key);
}

#[test]
fn serialize_end_key_fields() {
    let tombstone = RangeTombstone::new(b"a", b"m", 10);
    let end = tombstone.serialize_end_key();
    let parsed = parse_internal_key(end.encode(), false).unwrap();
    assert_eq!(parsed.user_key, b"m");
    assert_eq!(parsed.sequence, MAX_SEQUENCE_NUMBER);
    assert_eq!(parsed.value_type, ValueType::RANGE_DELETION);
}

#[test]
fn end_key_excludes_every_version_of_end() {
    let cmp = comparator();
    let end = RangeTombstone::new(b"a", b"m", 10).serialize_end_key();

    for seq in [0, 1, 10, 1_000_000, MAX_SEQUENCE_NUMBER] {
        for t in [ValueType::VALUE, ValueType::DELETION, ValueType::MERGE] {
            let version = InternalKey::new(b"m", seq, t);
            assert_ne!(
                cmp.compare(end.encode(), version.encode()),
                Ordering::Greater,
                "end key must not sort after m@{seq}"
            );
        }
    }
}

#[test]
fn end_key_sits_between_neighbouring_user_keys() {
    let cmp = comparator();
    let end = RangeTombstone::new(b"a", b"m", 10).serialize_end_key();

    let below = InternalKey::new(b"lzzz", 0, ValueType::VALUE);
    let above = InternalKey::new(b"n", MAX_SEQUENCE_NUMBER, ValueType::VALUE);
    assert_eq!(cmp.compare(below.encode(), end.encode()), Ordering::Less);
    assert_eq!(cmp.compare(end.encode(), above.encode()), Ordering::Less);
}

// ------------------------------------------------------------------------------------------------
// Timestamps
// ------------------------------------------------------------------------------------------------

#[test]
fn with_timestamp_replaces_boundary_timestamps() {
    let ts = [0x00, 0x00, 0x00, 0x2A];
    let tombstone =
        RangeTombstone::with_timestamp(b"a\x00\x00\x00\x00", b"m\xff\xff\xff\xff", 3, &ts);

    assert_eq!(tombstone.start_key(), b"a\x00\x00\x00\x2a");
    assert_eq!(tombstone.end_key(), b"m\x00\x00\x00\x2a");
    assert_eq!(tombstone.timestamp(), Some(&ts[..]));
    assert_eq!(tombstone.seq(), 3);
}

#[test]
fn end_key_uses_max_timestamp() {
    let ts = [0x01; 8];
    let tombstone = RangeTombstone::with_timestamp(b"a--------", b"m--------", 3, &ts);
    let end = tombstone.serialize_end_key();
    assert_eq!(end.user_key(), b"m\xff\xff\xff\xff\xff\xff\xff\xff");
}

#[test]
fn end_key_with_wide_timestamp() {
    let ts = [0x01; 12];
    let start = [b'a'; 13];
    let end_boundary = [b'm'; 13];
    let tombstone = RangeTombstone::with_timestamp(&start, &end_boundary, 3, &ts);

    let end = tombstone.serialize_end_key();
    let user_key = end.user_key();
    assert_eq!(user_key.len(), 13);
    assert_eq!(user_key[0], b'm');
    assert!(user_key[1..].iter().all(|&b| b == 0xFF));
}

#[test]
fn end_key_timestamp_boundary_widths() {
    for width in [1usize, 9, 10] {
        let ts = vec![0x07; width];
        let mut end_boundary = b"m".to_vec();
        end_boundary.extend(std::iter::repeat_n(0u8, width));
        let tombstone = RangeTombstone::with_timestamp(&end_boundary, &end_boundary, 1, &ts);

        let user_key = tombstone.serialize_end_key().user_key().to_vec();
        assert_eq!(user_key.len(), 1 + width);
        assert!(user_key[1..].iter().all(|&b| b == 0xFF), "width {width}");
    }
}

#[test]
#[should_panic(expected = "must not be empty")]
fn with_empty_timestamp_panics() {
    RangeTombstone::with_timestamp(b"a", b"b", 1, &[]);
}

#[test]
#[should_panic(expected = "key shorter than timestamp")]
fn with_timestamp_longer_than_key_panics() {
    RangeTombstone::with_timestamp(b"a", b"bbbb", 1, &[1, 2]);
}

// ------------------------------------------------------------------------------------------------
// Decoding and ownership
// ------------------------------------------------------------------------------------------------

#[test]
fn from_parsed_borrows_record() {
    let key = InternalKey::new(b"start", 44, ValueType::RANGE_DELETION);
    let value = b"stop".to_vec();
    let parsed = parse_internal_key(key.encode(), false).unwrap();

    let tombstone = RangeTombstone::from_parsed(&parsed, &value);
    assert_eq!(tombstone.start_key(), b"start");
    assert_eq!(tombstone.end_key(), b"stop");
    assert_eq!(tombstone.seq(), 44);
    assert_eq!(tombstone.timestamp(), None);
    assert_eq!(tombstone.start_key().as_ptr(), parsed.user_key.as_ptr());

    let (round_trip, end) = tombstone.serialize();
    assert_eq!(round_trip, key);
    assert_eq!(end, b"stop");
}

#[test]
fn into_owned_outlives_source() {
    let owned: RangeTombstone<'static> = {
        let start = b"from".to_vec();
        let end = b"to".to_vec();
        let owned = RangeTombstone::new(&start, &end, 5).into_owned();
        owned
    };
    assert_eq!(owned.start_key(), b"from");
    assert_eq!(owned.end_key(), b"to");
    assert_eq!(owned.seq(), 5);
}

#[test]
fn into_owned_keeps_timestamp() {
    let owned = {
        let ts = vec![9u8, 9];
        let owned = RangeTombstone::with_timestamp(b"a\x00\x00", b"b\x00\x00", 1, &ts).into_owned();
        owned
    };
    assert_eq!(owned.timestamp(), Some(&[9u8, 9][..]));
    assert_eq!(owned.start_key(), b"a\x09\x09");
}

#[test]
fn equality_ignores_storage_mode() {
    let borrowed = RangeTombstone::new(b"x", b"y", 2);
    let owned = borrowed.clone().into_owned();
    assert_eq!(borrowed, owned);
    let parsed = ParsedInternalKey::new(b"x", 2, ValueType::RANGE_DELETION);
    assert_eq!(RangeTombstone::from_parsed(&parsed, b"y"), borrowed);
}

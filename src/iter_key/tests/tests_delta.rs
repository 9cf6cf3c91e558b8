//! Tests for `trim_append`, the prefix-compressed key reconstruction step.

use crate::format::{self, ValueType};
use crate::iter_key::*;
use crate::key::InternalKey;

#[test]
fn trim_append_on_pinned_key_copies() {
    let external = b"hello".to_vec();
    let mut key = IterKey::new();
    key.pin_user_key(&external);

    key.trim_append(2, b"XY");

    assert_eq!(key.key(), b"heXY");
    assert!(!key.is_key_pinned());
    assert_eq!(external, b"hello");
}

#[test]
fn trim_append_in_place() {
    let mut key = IterKey::new();
    key.set_user_key(b"abcdef");
    key.trim_append(3, b"ZZZZ");
    assert_eq!(key.key(), b"abcZZZZ");
    assert_eq!(key.capacity(), INLINE_KEY_CAPACITY);
}

#[test]
fn trim_append_zero_shared_replaces() {
    let mut key = IterKey::new();
    key.set_user_key(b"old");
    key.trim_append(0, b"new-key");
    assert_eq!(key.key(), b"new-key");
}

#[test]
fn trim_append_full_shared_extends() {
    let mut key = IterKey::new();
    key.set_user_key(b"base");
    key.trim_append(4, b"");
    assert_eq!(key.key(), b"base");
    key.trim_append(4, b"+");
    assert_eq!(key.key(), b"base+");
}

#[test]
fn trim_append_grows_and_keeps_prefix() {
    let mut key = IterKey::new();
    let prefix = vec![b'p'; 30];
    key.set_user_key(&prefix);

    let suffix = vec![b's'; 30];
    key.trim_append(30, &suffix);

    assert_eq!(key.size(), 60);
    assert_eq!(key.capacity(), 60);
    assert_eq!(&key.key()[..30], &prefix[..]);
    assert_eq!(&key.key()[30..], &suffix[..]);
}

#[test]
fn trim_append_from_heap_to_larger_heap() {
    let mut key = IterKey::new();
    key.set_user_key(&[b'a'; 50]);
    key.trim_append(45, &[b'b'; 40]);
    assert_eq!(key.size(), 85);
    assert_eq!(key.capacity(), 85);
    assert!(key.key()[..45].iter().all(|&b| b == b'a'));
    assert!(key.key()[45..].iter().all(|&b| b == b'b'));
}

#[test]
fn trim_append_pinned_long_key() {
    let external = vec![b'e'; 70];
    let mut key = IterKey::new();
    key.pin_user_key(&external);
    key.trim_append(60, b"tail");
    assert_eq!(key.size(), 64);
    assert_eq!(&key.key()[..60], &external[..60]);
    assert_eq!(&key.key()[60..], b"tail");
}

#[test]
#[should_panic(expected = "exceeds key size")]
fn trim_append_shared_too_long_panics() {
    let mut key = IterKey::new();
    key.set_user_key(b"abc");
    key.trim_append(4, b"x");
}

/// Encodes `keys` the way a data block does: `(shared, non_shared)` per
/// entry relative to the previous key.
fn delta_encode(keys: &[Vec<u8>]) -> Vec<(usize, Vec<u8>)> {
    let mut prev: &[u8] = &[];
    let mut out = Vec::new();
    for key in keys {
        let shared = prev.iter().zip(key).take_while(|(a, b)| a == b).count();
        out.push((shared, key[shared..].to_vec()));
        prev = key;
    }
    out
}

#[test]
fn reconstructs_prefix_compressed_block() {
    let keys: Vec<Vec<u8>> = [
        (b"apple".as_slice(), 9),
        (b"apple".as_slice(), 4),
        (b"applesauce".as_slice(), 7),
        (b"apricot-with-a-rather-long-name".as_slice(), 2),
        (b"apricot-with-a-rather-long-name-too".as_slice(), 1),
        (b"banana".as_slice(), 100),
    ]
    .iter()
    .map(|(user_key, seq)| InternalKey::new(user_key, *seq, ValueType::VALUE).encode().to_vec())
    .collect();

    let mut key = IterKey::new();
    key.set_is_user_key(false);
    for ((shared, non_shared), expected) in delta_encode(&keys).iter().zip(&keys) {
        key.trim_append(*shared, non_shared);
        assert_eq!(key.internal_key(), &expected[..]);
        assert_eq!(key.user_key(), format::extract_user_key(expected));
    }
}

//! Prefix extractors over user keys and their internal-key adapter.
//!
//! A [`SliceTransform`] maps a user key to the prefix used by prefix bloom
//! filters and prefix seeks. Tables store internal keys, so
//! [`InternalKeySliceTransform`] strips the footer before delegating.


use std::sync::Arc;

use crate::format;

/// Maps keys to prefixes.
pub trait SliceTransform: Send + Sync {
    fn name(&self) -> &str;

    /// The prefix of `key`. Only called when [`in_domain`](Self::in_domain)
    /// holds.
    fn transform<'k>(&self, key: &'k [u8]) -> &'k [u8];

    /// Whether `key` has a prefix under this transform.
    fn in_domain(&self, key: &[u8]) -> bool;

    /// Whether `prefix` is a possible output of [`transform`](Self::transform).
    fn in_range(&self, _prefix: &[u8]) -> bool {
        false
    }
}

/// The first `prefix_len` bytes of every key at least that long.
#[derive(Debug, Clone)]
pub struct FixedPrefixTransform {
    prefix_len: usize,
    name: String,
}

impl FixedPrefixTransform {
    pub fn new(prefix_len: usize) -> Self {
        Self {
            prefix_len,
            name: format!("keyformat.FixedPrefix.{prefix_len}"),
        }
    }
}

impl SliceTransform for FixedPrefixTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform<'k>(&self, key: &'k [u8]) -> &'k [u8] {
        assert!(self.in_domain(key), "key shorter than fixed prefix");
        &key[..self.prefix_len]
    }

    fn in_domain(&self, key: &[u8]) -> bool {
        key.len() >= self.prefix_len
    }

    fn in_range(&self, prefix: &[u8]) -> bool {
        prefix.len() == self.prefix_len
    }
}

/// Applies a user-key transform to the user-key portion of internal keys.
#[derive(Clone)]
pub struct InternalKeySliceTransform {
    transform: Arc<dyn SliceTransform>,
}

impl InternalKeySliceTransform {
    pub fn new(transform: Arc<dyn SliceTransform>) -> Self {
        Self { transform }
    }

    pub fn user_prefix_extractor(&self) -> &dyn SliceTransform {
        self.transform.as_ref()
    }
}

impl SliceTransform for InternalKeySliceTransform {
    fn name(&self) -> &str {
        self.transform.name()
    }

    fn transform<'k>(&self, src: &'k [u8]) -> &'k [u8] {
        self.transform.transform(format::extract_user_key(src))
    }

    fn in_domain(&self, src: &[u8]) -> bool {
        self.transform.in_domain(format::extract_user_key(src))
    }

    fn in_range(&self, dst: &[u8]) -> bool {
        self.transform.in_range(format::extract_user_key(dst))
    }
}

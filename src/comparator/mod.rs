//! Total ordering over internal keys.
//!
//! [`InternalKeyComparator`] orders encoded keys by:
//!
//! 1. increasing user key, per the injected [`UserComparator`];
//! 2. decreasing footer word `(sequence << 8) | type`, so newer versions of a
//!    user key come first and, at equal sequence, higher types come first.
//!
//! The comparator is immutable after construction and `Send + Sync`; merge
//! reads and background compactions share one instance.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::format::{self, DISABLE_GLOBAL_SEQUENCE_NUMBER, SequenceNumber};
use crate::key::{InternalKey, ParsedInternalKey};

// ------------------------------------------------------------------------------------------------
// User comparator capability
// ------------------------------------------------------------------------------------------------

/// Orders user keys.
///
/// Implementations must be total and stable for as long as any data they
/// ordered exists.
pub trait UserComparator: Send + Sync {
    /// Name persisted alongside data ordered by this comparator.
    fn name(&self) -> &str;

    /// Three-way comparison of two user keys, timestamps included.
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    /// Width of the user-defined timestamp suffix, 0 if disabled.
    fn timestamp_size(&self) -> usize {
        0
    }
}

/// Lexicographic byte order.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytewiseComparator;

impl UserComparator for BytewiseComparator {
    fn name(&self) -> &str {
        "keyformat.BytewiseComparator"
    }

    #[inline]
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

/// Reverse lexicographic byte order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseBytewiseComparator;

impl UserComparator for ReverseBytewiseComparator {
    fn name(&self) -> &str {
        "keyformat.ReverseBytewiseComparator"
    }

    #[inline]
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        b.cmp(a)
    }
}

// ------------------------------------------------------------------------------------------------
// Internal key comparator
// ------------------------------------------------------------------------------------------------

/// Compares internal keys using a user comparator for the user-key portion
/// and breaking ties by decreasing footer.
///
/// Every comparison requires both inputs to be at least
/// [`NUM_INTERNAL_BYTES`](crate::format::NUM_INTERNAL_BYTES) long and panics
/// otherwise.
#[derive(Clone)]
pub struct InternalKeyComparator {
    user_comparator: Arc<dyn UserComparator>,
    name: String,
}

impl InternalKeyComparator {
    /// Wraps `user_comparator`. The name is derived from the user
    /// comparator's and fixed for the life of the value.
    pub fn new(user_comparator: Arc<dyn UserComparator>) -> Self {
        let name = format!("keyformat.InternalKeyComparator:{}", user_comparator.name());
        Self {
            user_comparator,
            name,
        }
    }

    /// `keyformat.InternalKeyComparator:<user comparator name>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The comparator applied to the user-key portion.
    pub fn user_comparator(&self) -> &dyn UserComparator {
        self.user_comparator.as_ref()
    }

    /// Full comparison of two encoded keys.
    #[inline]
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.user_comparator
            .compare(format::extract_user_key(a), format::extract_user_key(b))
            .then_with(|| {
                let anum = format::extract_internal_key_footer(a);
                let bnum = format::extract_internal_key_footer(b);
                bnum.cmp(&anum)
            })
    }

    #[inline]
    pub fn equal(&self, a: &[u8], b: &[u8]) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

    /// Like [`compare`](Self::compare) but ignores the type byte.
    #[inline]
    pub fn compare_key_seq(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.user_comparator
            .compare(format::extract_user_key(a), format::extract_user_key(b))
            .then_with(|| {
                let anum = format::extract_internal_key_footer(a) >> 8;
                let bnum = format::extract_internal_key_footer(b) >> 8;
                bnum.cmp(&anum)
            })
    }

    /// [`compare_key_seq`](Self::compare_key_seq) with a decoded left side.
    pub fn compare_parsed_key_seq(&self, a: &ParsedInternalKey<'_>, b: &[u8]) -> Ordering {
        self.user_comparator
            .compare(a.user_key, format::extract_user_key(b))
            .then_with(|| {
                let bnum = format::extract_internal_key_footer(b) >> 8;
                bnum.cmp(&a.sequence)
            })
    }

    /// Compares with per-side sequence number overrides.
    ///
    /// A side whose override is not [`DISABLE_GLOBAL_SEQUENCE_NUMBER`] is
    /// compared as if its footer were `pack(override, real type)`. Used for
    /// ingested files that store one sequence number for every entry.
    pub fn compare_with_global_seqno(
        &self,
        a: &[u8],
        a_global_seqno: SequenceNumber,
        b: &[u8],
        b_global_seqno: SequenceNumber,
    ) -> Ordering {
        self.user_comparator
            .compare(format::extract_user_key(a), format::extract_user_key(b))
            .then_with(|| {
                let a_footer = footer_with_override(a, a_global_seqno);
                let b_footer = footer_with_override(b, b_global_seqno);
                b_footer.cmp(&a_footer)
            })
    }

    /// [`compare`](Self::compare) over two owned keys.
    pub fn compare_internal_keys(&self, a: &InternalKey, b: &InternalKey) -> Ordering {
        self.compare(a.encode(), b.encode())
    }

    /// Orders decoded keys: user key, then sequence desc, then type desc.
    pub fn compare_parsed(&self, a: &ParsedInternalKey<'_>, b: &ParsedInternalKey<'_>) -> Ordering {
        self.user_comparator
            .compare(a.user_key, b.user_key)
            .then_with(|| b.sequence.cmp(&a.sequence))
            .then_with(|| b.value_type.cmp(&a.value_type))
    }

    /// Full comparison of an encoded key against a decoded one.
    ///
    /// The right side's footer is re-packed without validation.
    pub fn compare_encoded_with_parsed(&self, a: &[u8], b: &ParsedInternalKey<'_>) -> Ordering {
        self.user_comparator
            .compare(format::extract_user_key(a), b.user_key)
            .then_with(|| {
                let anum = format::extract_internal_key_footer(a);
                let bnum = (b.sequence << 8) | u64::from(b.value_type.0);
                bnum.cmp(&anum)
            })
    }

    /// Mirror of [`compare_encoded_with_parsed`](Self::compare_encoded_with_parsed).
    pub fn compare_parsed_with_encoded(&self, a: &ParsedInternalKey<'_>, b: &[u8]) -> Ordering {
        self.compare_encoded_with_parsed(b, a).reverse()
    }
}

impl fmt::Debug for InternalKeyComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalKeyComparator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[inline]
fn footer_with_override(key: &[u8], global_seqno: SequenceNumber) -> u64 {
    if global_seqno == DISABLE_GLOBAL_SEQUENCE_NUMBER {
        format::extract_internal_key_footer(key)
    } else {
        format::pack_sequence_and_type(global_seqno, format::extract_value_type(key))
    }
}

//! Range tombstones in their easy-to-handle form.
//!
//! A `DeleteRange(start, end)` is stored in memtables and tables as an
//! ordinary key/value pair:
//!
//! ```text
//! key   = <start_key | seqno + RANGE_DELETION>
//! value = <end_key>
//! ```
//!
//! [`RangeTombstone`] is the decoded form of that pair. Its boundaries borrow
//! from the source record when possible and own fresh copies when a
//! timestamp has to be spliced in.

#[cfg(test)]
mod tests;

use std::borrow::Cow;

use crate::format::{MAX_SEQUENCE_NUMBER, SequenceNumber, ValueType};
use crate::key::{InternalKey, ParsedInternalKey};

/// All-`0xFF` timestamp reused for end keys with timestamps up to 9 bytes.
const TS_MAX: &[u8; 9] = b"\xff\xff\xff\xff\xff\xff\xff\xff\xff";

/// Deletes every version of every user key in `[start_key, end_key)` with a
/// sequence number below `seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeTombstone<'a> {
    start_key: Cow<'a, [u8]>,
    end_key: Cow<'a, [u8]>,
    seq: SequenceNumber,
    ts: Option<Cow<'a, [u8]>>,
}

impl<'a> RangeTombstone<'a> {
    /// Borrows `start_key` and `end_key` as-is.
    pub fn new(start_key: &'a [u8], end_key: &'a [u8], seq: SequenceNumber) -> Self {
        Self {
            start_key: Cow::Borrowed(start_key),
            end_key: Cow::Borrowed(end_key),
            seq,
            ts: None,
        }
    }

    /// Builds owned boundaries whose trailing `ts.len()` bytes are replaced
    /// by `ts`.
    ///
    /// `start_key` and `end_key` are user keys that already carry a
    /// timestamp of the same width.
    ///
    /// # Panics
    ///
    /// Panics if `ts` is empty or longer than either boundary.
    pub fn with_timestamp(
        start_key: &[u8],
        end_key: &[u8],
        seq: SequenceNumber,
        ts: &'a [u8],
    ) -> Self {
        assert!(!ts.is_empty(), "range tombstone timestamp must not be empty");
        Self {
            start_key: Cow::Owned(replace_timestamp(start_key, ts)),
            end_key: Cow::Owned(replace_timestamp(end_key, ts)),
            seq,
            ts: Some(Cow::Borrowed(ts)),
        }
    }

    /// Decodes a stored record: the key's user key is the start, the value
    /// is the end.
    pub fn from_parsed(parsed: &ParsedInternalKey<'a>, value: &'a [u8]) -> Self {
        Self {
            start_key: Cow::Borrowed(parsed.user_key),
            end_key: Cow::Borrowed(value),
            seq: parsed.sequence,
            ts: None,
        }
    }

    pub fn start_key(&self) -> &[u8] {
        &self.start_key
    }

    pub fn end_key(&self) -> &[u8] {
        &self.end_key
    }

    pub fn seq(&self) -> SequenceNumber {
        self.seq
    }

    pub fn timestamp(&self) -> Option<&[u8]> {
        self.ts.as_deref()
    }

    /// Detaches the tombstone from any borrowed bytes.
    pub fn into_owned(self) -> RangeTombstone<'static> {
        RangeTombstone {
            start_key: Cow::Owned(self.start_key.into_owned()),
            end_key: Cow::Owned(self.end_key.into_owned()),
            seq: self.seq,
            ts: self.ts.map(|ts| Cow::Owned(ts.into_owned())),
        }
    }

    /// The key/value pair written to storage for this tombstone.
    ///
    /// Allocates a new key.
    pub fn serialize(&self) -> (InternalKey, &[u8]) {
        (self.serialize_key(), self.end_key())
    }

    /// The storage key: `<start_key | seq + RANGE_DELETION>`.
    pub fn serialize_key(&self) -> InternalKey {
        InternalKey::new(&self.start_key, self.seq, ValueType::RANGE_DELETION)
    }

    /// A synthetic internal key for the exclusive end boundary.
    ///
    /// Uses [`MAX_SEQUENCE_NUMBER`], so it sorts before every real internal
    /// key with the same user key: `[a, b)` ends strictly before any
    /// version of `b`. With a timestamp, the end key's timestamp is the
    /// all-`0xFF` maximum of the same width, so the boundary also dominates
    /// versions of `end_key` that carry a smaller timestamp.
    pub fn serialize_end_key(&self) -> InternalKey {
        match self.ts.as_deref() {
            Some(ts) if ts.len() <= TS_MAX.len() => InternalKey::with_timestamp(
                &self.end_key,
                MAX_SEQUENCE_NUMBER,
                ValueType::RANGE_DELETION,
                &TS_MAX[..ts.len()],
            ),
            Some(ts) => InternalKey::with_timestamp(
                &self.end_key,
                MAX_SEQUENCE_NUMBER,
                ValueType::RANGE_DELETION,
                &vec![0xFF; ts.len()],
            ),
            None => InternalKey::new(&self.end_key, MAX_SEQUENCE_NUMBER, ValueType::RANGE_DELETION),
        }
    }
}

fn replace_timestamp(key: &[u8], ts: &[u8]) -> Vec<u8> {
    assert!(key.len() >= ts.len(), "key shorter than timestamp");
    let mut out = Vec::with_capacity(key.len());
    out.extend_from_slice(&key[..key.len() - ts.len()]);
    out.extend_from_slice(ts);
    out
}

//! Byte-layout primitives for internal keys.
//!
//! Every record stored by the engine is addressed by an **internal key**: the
//! user key followed by an 8-byte footer that packs a 56-bit sequence number
//! and an 8-bit [`ValueType`] tag.
//!
//! # Wire format
//!
//! ```text
//! [USER_KEY_BYTES ...][TIMESTAMP (ts_sz bytes, optional)][FOOTER (8 bytes)]
//!
//! FOOTER = u64 little-endian of (sequence << 8) | value_type
//! ```
//!
//! The footer is **always little-endian**, independent of the host byte
//! order. The numeric values of [`ValueType`] are embedded in on-disk data
//! and must never be renumbered; new types are appended only.
//!
//! # Checked vs. unchecked
//!
//! The helpers in this module are *unchecked*: they assume the caller has
//! already validated the key (see [`crate::key::parse_internal_key`]) or
//! trusts its source. Length preconditions are enforced with `assert!` in
//! every build profile. [`unpack_sequence_and_type`] and
//! [`extract_value_type`] never validate the decoded fields, so that
//! integrity checkers can read the nominal fields of a key already known to
//! be corrupt.
//!
//! # User-defined timestamps
//!
//! When timestamps are enabled the trailing `ts_sz` bytes of the user key are
//! a timestamp. The width is carried externally (by the comparator or the
//! column family); nothing in the encoding marks it. The minimum timestamp is
//! all `0x00`, the maximum all `0xFF`.

#[cfg(test)]
mod tests;

use std::fmt;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// A 56-bit version counter assigned at write time.
pub type SequenceNumber = u64;

/// Largest sequence number that fits next to an 8-bit type tag.
pub const MAX_SEQUENCE_NUMBER: SequenceNumber = (1u64 << 56) - 1;

/// Sentinel meaning "no global sequence number override".
pub const DISABLE_GLOBAL_SEQUENCE_NUMBER: SequenceNumber = u64::MAX;

/// Size of the internal-key footer in bytes.
pub const NUM_INTERNAL_BYTES: usize = 8;

/// Timestamp value used when user-defined timestamps are disabled.
pub const DISABLE_USER_TIMESTAMP: &[u8] = &[];

// ------------------------------------------------------------------------------------------------
// Value types
// ------------------------------------------------------------------------------------------------

/// The 8-bit tag stored in the low byte of every internal-key footer.
///
/// This is an open newtype rather than a closed enum: decoding a corrupted
/// key must be able to surface *any* byte without undefined behaviour.
/// Use [`ValueType::is_value_type`] and [`ValueType::is_extended_value_type`]
/// to classify a tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueType(pub u8);

impl ValueType {
    /// Point tombstone.
    pub const DELETION: ValueType = ValueType(0x00);
    /// Plain put.
    pub const VALUE: ValueType = ValueType(0x01);
    /// Merge operand.
    pub const MERGE: ValueType = ValueType(0x02);
    /// WAL only.
    pub const LOG_DATA: ValueType = ValueType(0x03);
    /// WAL only.
    pub const COLUMN_FAMILY_DELETION: ValueType = ValueType(0x04);
    /// WAL only.
    pub const COLUMN_FAMILY_VALUE: ValueType = ValueType(0x05);
    /// WAL only.
    pub const COLUMN_FAMILY_MERGE: ValueType = ValueType(0x06);
    /// Tombstone that cancels exactly one earlier put.
    pub const SINGLE_DELETION: ValueType = ValueType(0x07);
    /// WAL only.
    pub const COLUMN_FAMILY_SINGLE_DELETION: ValueType = ValueType(0x08);
    /// WAL only.
    pub const BEGIN_PREPARE_XID: ValueType = ValueType(0x09);
    /// WAL only.
    pub const END_PREPARE_XID: ValueType = ValueType(0x0A);
    /// WAL only.
    pub const COMMIT_XID: ValueType = ValueType(0x0B);
    /// WAL only.
    pub const ROLLBACK_XID: ValueType = ValueType(0x0C);
    /// WAL only.
    pub const NOOP: ValueType = ValueType(0x0D);
    /// WAL only.
    pub const COLUMN_FAMILY_RANGE_DELETION: ValueType = ValueType(0x0E);
    /// Stored in the range-deletion meta block.
    pub const RANGE_DELETION: ValueType = ValueType(0x0F);
    /// WAL only.
    pub const COLUMN_FAMILY_BLOB_INDEX: ValueType = ValueType(0x10);
    /// Reserved for a legacy blob store; not a key type.
    pub const TITAN_BLOB_INDEX: ValueType = ValueType(0x11);
    /// WAL only. Prepared record that is also persisted in the db.
    pub const BEGIN_PERSISTED_PREPARE_XID: ValueType = ValueType(0x12);
    /// WAL only. Written by the write-unprepared policy.
    pub const BEGIN_UNPREPARE_XID: ValueType = ValueType(0x13);
    /// Tombstone written with a user-defined timestamp.
    pub const DELETION_WITH_TIMESTAMP: ValueType = ValueType(0x14);
    /// WAL only.
    pub const COMMIT_XID_AND_TIMESTAMP: ValueType = ValueType(0x15);
    /// Value holding a set of named columns.
    pub const WIDE_COLUMN_ENTITY: ValueType = ValueType(0x16);
    /// WAL only.
    pub const COLUMN_FAMILY_WIDE_COLUMN_ENTITY: ValueType = ValueType(0x17);
    /// Reference to a value stored in a blob file.
    pub const BLOB_INDEX: ValueType = ValueType(0x18);
    /// One past the last valid type. Only used for validation and by
    /// truncated range-deletion start keys.
    pub const MAX_VALID: ValueType = ValueType(0x19);
    /// The high bit is reserved to table formats; never stored in a key.
    pub const MAX_VALUE: ValueType = ValueType(0x7F);

    /// Returns `true` for types that may appear inline in a memtable or a
    /// data block.
    #[inline]
    pub fn is_value_type(self) -> bool {
        self <= Self::MERGE
            || self == Self::SINGLE_DELETION
            || self == Self::BLOB_INDEX
            || self == Self::DELETION_WITH_TIMESTAMP
            || self == Self::WIDE_COLUMN_ENTITY
    }

    /// Returns `true` for every type a well-formed internal key may carry:
    /// the inline types plus [`RANGE_DELETION`](Self::RANGE_DELETION) and
    /// [`MAX_VALID`](Self::MAX_VALID).
    #[inline]
    pub fn is_extended_value_type(self) -> bool {
        self.is_value_type() || self == Self::RANGE_DELETION || self == Self::MAX_VALID
    }

    /// Human-readable name, or `None` for unassigned values.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::DELETION => "Deletion",
            Self::VALUE => "Value",
            Self::MERGE => "Merge",
            Self::LOG_DATA => "LogData",
            Self::COLUMN_FAMILY_DELETION => "ColumnFamilyDeletion",
            Self::COLUMN_FAMILY_VALUE => "ColumnFamilyValue",
            Self::COLUMN_FAMILY_MERGE => "ColumnFamilyMerge",
            Self::SINGLE_DELETION => "SingleDeletion",
            Self::COLUMN_FAMILY_SINGLE_DELETION => "ColumnFamilySingleDeletion",
            Self::BEGIN_PREPARE_XID => "BeginPrepareXID",
            Self::END_PREPARE_XID => "EndPrepareXID",
            Self::COMMIT_XID => "CommitXID",
            Self::ROLLBACK_XID => "RollbackXID",
            Self::NOOP => "Noop",
            Self::COLUMN_FAMILY_RANGE_DELETION => "ColumnFamilyRangeDeletion",
            Self::RANGE_DELETION => "RangeDeletion",
            Self::COLUMN_FAMILY_BLOB_INDEX => "ColumnFamilyBlobIndex",
            Self::TITAN_BLOB_INDEX => "TitanBlobIndex",
            Self::BEGIN_PERSISTED_PREPARE_XID => "BeginPersistedPrepareXID",
            Self::BEGIN_UNPREPARE_XID => "BeginUnprepareXID",
            Self::DELETION_WITH_TIMESTAMP => "DeletionWithTimestamp",
            Self::COMMIT_XID_AND_TIMESTAMP => "CommitXIDAndTimestamp",
            Self::WIDE_COLUMN_ENTITY => "WideColumnEntity",
            Self::COLUMN_FAMILY_WIDE_COLUMN_ENTITY => "ColumnFamilyWideColumnEntity",
            Self::BLOB_INDEX => "BlobIndex",
            Self::MAX_VALID => "MaxValid",
            _ => return None,
        };
        Some(name)
    }
}

impl From<u8> for ValueType {
    #[inline]
    fn from(b: u8) -> Self {
        ValueType(b)
    }
}

impl From<ValueType> for u8 {
    #[inline]
    fn from(t: ValueType) -> Self {
        t.0
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}(0x{:02X})", self.0),
            None => write!(f, "Unknown(0x{:02X})", self.0),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type to use when building a key for seeking to a given sequence number.
///
/// Sequence numbers sort in decreasing order and the type lives in the low
/// footer byte, so the *highest-numbered* inline type positions a seek key
/// before every real entry carrying the same sequence number.
pub const VALUE_TYPE_FOR_SEEK: ValueType = ValueType::BLOB_INDEX;

/// Type to use when building a key for a reverse seek.
pub const VALUE_TYPE_FOR_SEEK_FOR_PREV: ValueType = ValueType::DELETION;

// ------------------------------------------------------------------------------------------------
// Entry types
// ------------------------------------------------------------------------------------------------

/// Coarse record classification reported to table-property collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Put,
    Delete,
    SingleDelete,
    Merge,
    RangeDeletion,
    BlobIndex,
    DeleteWithTimestamp,
    WideColumnEntity,
    Other,
}

/// Maps a [`ValueType`] to its [`EntryType`].
pub fn entry_type(value_type: ValueType) -> EntryType {
    match value_type {
        ValueType::VALUE => EntryType::Put,
        ValueType::DELETION => EntryType::Delete,
        ValueType::DELETION_WITH_TIMESTAMP => EntryType::DeleteWithTimestamp,
        ValueType::SINGLE_DELETION => EntryType::SingleDelete,
        ValueType::MERGE => EntryType::Merge,
        ValueType::RANGE_DELETION => EntryType::RangeDeletion,
        ValueType::BLOB_INDEX => EntryType::BlobIndex,
        ValueType::WIDE_COLUMN_ENTITY => EntryType::WideColumnEntity,
        _ => EntryType::Other,
    }
}

// ------------------------------------------------------------------------------------------------
// Footer packing
// ------------------------------------------------------------------------------------------------

/// Packs a sequence number and a type into a footer word.
///
/// # Panics
///
/// Panics if `seq > MAX_SEQUENCE_NUMBER` or if `t` is not an extended
/// value type.
#[inline]
pub fn pack_sequence_and_type(seq: SequenceNumber, t: ValueType) -> u64 {
    assert!(
        seq <= MAX_SEQUENCE_NUMBER,
        "sequence number {seq} exceeds MAX_SEQUENCE_NUMBER"
    );
    assert!(
        t.is_extended_value_type(),
        "value type {t:?} is not a valid key type"
    );
    (seq << 8) | u64::from(t.0)
}

/// Splits a footer word into its sequence number and type.
///
/// Performs **no** validation: the returned fields may be out of range when
/// `packed` came from corrupted bytes.
#[inline]
pub fn unpack_sequence_and_type(packed: u64) -> (SequenceNumber, ValueType) {
    (packed >> 8, ValueType((packed & 0xff) as u8))
}

#[inline]
pub(crate) fn decode_fixed64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(word)
}

#[inline]
fn footer_offset(internal_key: &[u8]) -> usize {
    assert!(
        internal_key.len() >= NUM_INTERNAL_BYTES,
        "internal key too small: {} bytes",
        internal_key.len()
    );
    internal_key.len() - NUM_INTERNAL_BYTES
}

// ------------------------------------------------------------------------------------------------
// Extraction views
// ------------------------------------------------------------------------------------------------

/// `<user_key | seqno + type>` → `<user_key>`
#[inline]
pub fn extract_user_key(internal_key: &[u8]) -> &[u8] {
    &internal_key[..footer_offset(internal_key)]
}

/// `<user_provided_key | ts | seqno + type>` → `<user_provided_key>`
#[inline]
pub fn extract_user_key_and_strip_timestamp(internal_key: &[u8], ts_sz: usize) -> &[u8] {
    let user_key = extract_user_key(internal_key);
    strip_timestamp_from_user_key(user_key, ts_sz)
}

/// `<user_provided_key | ts>` → `<user_provided_key>`
#[inline]
pub fn strip_timestamp_from_user_key(user_key: &[u8], ts_sz: usize) -> &[u8] {
    assert!(user_key.len() >= ts_sz, "user key shorter than timestamp");
    &user_key[..user_key.len() - ts_sz]
}

/// `<user_provided_key | ts>` → `<ts>`
#[inline]
pub fn extract_timestamp_from_user_key(user_key: &[u8], ts_sz: usize) -> &[u8] {
    assert!(user_key.len() >= ts_sz, "user key shorter than timestamp");
    &user_key[user_key.len() - ts_sz..]
}

/// `<user_provided_key | ts | seqno + type>` → `<ts>`
#[inline]
pub fn extract_timestamp_from_key(internal_key: &[u8], ts_sz: usize) -> &[u8] {
    let n = internal_key.len();
    assert!(
        n >= NUM_INTERNAL_BYTES + ts_sz,
        "internal key too small for a {ts_sz}-byte timestamp"
    );
    &internal_key[n - NUM_INTERNAL_BYTES - ts_sz..n - NUM_INTERNAL_BYTES]
}

/// `<user_provided_key | ts | seqno + type>` → `seqno + type` as a word.
#[inline]
pub fn extract_internal_key_footer(internal_key: &[u8]) -> u64 {
    decode_fixed64(&internal_key[footer_offset(internal_key)..])
}

/// `<user_provided_key | ts | seqno + type>` → `type`. Not validated.
#[inline]
pub fn extract_value_type(internal_key: &[u8]) -> ValueType {
    ValueType((extract_internal_key_footer(internal_key) & 0xff) as u8)
}

/// Sequence number stored in an internal key's footer.
#[inline]
pub fn internal_key_seqno(internal_key: &[u8]) -> SequenceNumber {
    extract_internal_key_footer(internal_key) >> 8
}

// ------------------------------------------------------------------------------------------------
// Construction helpers
// ------------------------------------------------------------------------------------------------

/// Appends the footer to a buffer that already ends with the user key.
///
/// ```text
/// before: <user_key>
/// after:  <user_key | seqno + type>
/// ```
#[inline]
pub fn append_internal_key_footer(result: &mut Vec<u8>, s: SequenceNumber, t: ValueType) {
    result.extend_from_slice(&pack_sequence_and_type(s, t).to_le_bytes());
}

/// Rewrites the footer of an encoded key in place.
///
/// Touches only the last eight bytes, so the buffer is never reallocated and
/// views into the user key stay valid.
///
/// # Panics
///
/// Panics if the buffer is shorter than eight bytes, or on the same
/// arguments [`pack_sequence_and_type`] rejects.
#[inline]
pub fn update_internal_key(internal_key: &mut [u8], seq: SequenceNumber, t: ValueType) {
    let offset = footer_offset(internal_key);
    let packed = pack_sequence_and_type(seq, t);
    internal_key[offset..].copy_from_slice(&packed.to_le_bytes());
}

/// `<user_provided_key>` → `<user_provided_key | min_ts>`
pub fn append_key_with_min_timestamp(result: &mut Vec<u8>, key: &[u8], ts_sz: usize) {
    result.reserve(key.len() + ts_sz);
    result.extend_from_slice(key);
    result.resize(result.len() + ts_sz, 0x00);
}

/// `<user_provided_key>` → `<user_provided_key | max_ts>`
pub fn append_key_with_max_timestamp(result: &mut Vec<u8>, key: &[u8], ts_sz: usize) {
    result.reserve(key.len() + ts_sz);
    result.extend_from_slice(key);
    result.resize(result.len() + ts_sz, 0xFF);
}

/// `<user_provided_key | original_ts>` → `<user_provided_key | min_ts>`
pub fn append_user_key_with_min_timestamp(result: &mut Vec<u8>, key: &[u8], ts_sz: usize) {
    let stripped = strip_timestamp_from_user_key(key, ts_sz);
    append_key_with_min_timestamp(result, stripped, ts_sz);
}

/// `<user_provided_key | original_ts>` → `<user_provided_key | max_ts>`
pub fn append_user_key_with_max_timestamp(result: &mut Vec<u8>, key: &[u8], ts_sz: usize) {
    let stripped = strip_timestamp_from_user_key(key, ts_sz);
    append_key_with_max_timestamp(result, stripped, ts_sz);
}

/// `<user_provided_key | seqno + type>` → `<user_provided_key | min_ts | seqno + type>`
pub fn pad_internal_key_with_min_timestamp(result: &mut Vec<u8>, key: &[u8], ts_sz: usize) {
    let user_key_size = footer_offset(key);
    result.reserve(key.len() + ts_sz);
    result.extend_from_slice(&key[..user_key_size]);
    result.resize(result.len() + ts_sz, 0x00);
    result.extend_from_slice(&key[user_key_size..]);
}

/// `<user_provided_key | original_ts | seqno + type>` → `<user_provided_key | seqno + type>`
pub fn strip_timestamp_from_internal_key(result: &mut Vec<u8>, key: &[u8], ts_sz: usize) {
    let user_key_size = footer_offset(key);
    assert!(user_key_size >= ts_sz, "user key shorter than timestamp");
    result.reserve(key.len() - ts_sz);
    result.extend_from_slice(&key[..user_key_size - ts_sz]);
    result.extend_from_slice(&key[user_key_size..]);
}

/// `<user_provided_key | original_ts | seqno + type>` → `<user_provided_key | min_ts | seqno + type>`
pub fn replace_internal_key_with_min_timestamp(result: &mut Vec<u8>, key: &[u8], ts_sz: usize) {
    let user_key_size = footer_offset(key);
    assert!(user_key_size >= ts_sz, "user key shorter than timestamp");
    result.reserve(key.len());
    result.extend_from_slice(&key[..user_key_size - ts_sz]);
    result.resize(result.len() + ts_sz, 0x00);
    result.extend_from_slice(&key[user_key_size..]);
}

// ------------------------------------------------------------------------------------------------
// Varint32 (length prefixes)
// ------------------------------------------------------------------------------------------------

/// Number of bytes `value` occupies as a varint.
#[inline]
pub fn varint_length(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Appends `value` as a little-endian base-128 varint.
pub fn encode_varint32(dst: &mut Vec<u8>, value: u32) {
    let mut buf = [0u8; MAX_VARINT32_LENGTH];
    let n = put_varint32(&mut buf, value);
    dst.extend_from_slice(&buf[..n]);
}

/// Longest encoding of a varint32.
pub const MAX_VARINT32_LENGTH: usize = 5;

/// Writes `value` as a varint to the front of `dst` and returns the number of
/// bytes written.
///
/// # Panics
///
/// Panics if `dst` is shorter than [`varint_length`] of `value`.
pub fn put_varint32(dst: &mut [u8], mut value: u32) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        dst[i] = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
        i += 1;
    }
    dst[i] = value as u8;
    i + 1
}

/// Decodes a varint32 from the front of `src`.
///
/// Returns `(value, bytes_consumed)`, or `None` if the input is truncated or
/// the varint is longer than five bytes.
pub fn decode_varint32(src: &[u8]) -> Option<(u32, usize)> {
    let mut value = 0u32;
    for (i, &byte) in src.iter().enumerate().take(MAX_VARINT32_LENGTH) {
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// Renders bytes as uppercase hex, two characters per byte.
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02X}");
    }
    out
}

/// Renders bytes with printable ASCII kept and everything else as `\xNN`.
pub(crate) fn escape_bytes(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (b' '..=b'~').contains(&b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\x{b:02X}");
        }
    }
    out
}

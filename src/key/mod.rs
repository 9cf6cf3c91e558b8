//! Decoded and owned internal keys.
//!
//! - [`ParsedInternalKey`]: a borrowed view holding the user key, sequence
//!   number and type as separate fields. Never owns memory.
//! - [`parse_internal_key`]: the **single validating** decode entry point.
//!   Every other extraction helper in [`crate::format`] is unchecked.
//! - [`InternalKey`]: owns the encoded byte representation and exposes
//!   structured accessors and mutators over it.


use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::format::{
    self, MAX_SEQUENCE_NUMBER, NUM_INTERNAL_BYTES, SequenceNumber, VALUE_TYPE_FOR_SEEK, ValueType,
};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Corruption detected while decoding an internal key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Fewer than eight bytes: there is no room for a footer.
    #[error("Corrupted key: internal key too small. Size={size}")]
    TooSmall {
        /// Length of the rejected buffer.
        size: usize,
    },

    /// The footer's type byte is outside the extended value-type set.
    #[error("Corrupted key: invalid type 0x{type_byte:02X}: {detail}")]
    InvalidType {
        /// Raw type byte found in the footer.
        type_byte: u8,
        /// Nominal sequence number found in the footer.
        sequence: SequenceNumber,
        /// `'<user key>' seq:N, type:T`, with the user key hex-rendered or
        /// redacted.
        detail: String,
    },
}

// ------------------------------------------------------------------------------------------------
// Parsed internal key
// ------------------------------------------------------------------------------------------------

/// An internal key with its three components stored separately.
///
/// `user_key` includes the timestamp when user-defined timestamps are
/// enabled. The view is valid only while the referenced bytes are alive.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ParsedInternalKey<'a> {
    pub user_key: &'a [u8],
    pub sequence: SequenceNumber,
    pub value_type: ValueType,
}

impl Default for ParsedInternalKey<'_> {
    fn default() -> Self {
        Self {
            user_key: &[],
            sequence: MAX_SEQUENCE_NUMBER,
            value_type: ValueType::DELETION,
        }
    }
}

impl<'a> ParsedInternalKey<'a> {
    pub fn new(user_key: &'a [u8], sequence: SequenceNumber, value_type: ValueType) -> Self {
        Self {
            user_key,
            sequence,
            value_type,
        }
    }

    /// Decodes an encoded key, rendering the user key in hex on corruption.
    ///
    /// Shorthand for [`parse_internal_key`]`(bytes, true)`.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, KeyError> {
        parse_internal_key(bytes, true)
    }

    pub fn clear(&mut self) {
        self.user_key = &[];
        self.sequence = 0;
        self.value_type = ValueType::DELETION;
    }

    /// The trailing `ts_sz` bytes of the user key.
    pub fn timestamp(&self, ts_sz: usize) -> &'a [u8] {
        format::extract_timestamp_from_user_key(self.user_key, ts_sz)
    }

    /// Length of this key once encoded.
    #[inline]
    pub fn encoding_length(&self) -> usize {
        self.user_key.len() + NUM_INTERNAL_BYTES
    }

    /// `'<user key>' seq:N, type:T`.
    ///
    /// The user key is replaced by `<redacted>` unless `log_err_key` is set;
    /// `hex` selects hex rendering over escaped ASCII.
    pub fn debug_string(&self, log_err_key: bool, hex: bool) -> String {
        let user_key = if !log_err_key {
            "<redacted>".to_string()
        } else if hex {
            format::to_hex(self.user_key)
        } else {
            format::escape_bytes(self.user_key)
        };
        format!(
            "'{user_key}' seq:{}, type:{}",
            self.sequence, self.value_type
        )
    }
}

impl fmt::Debug for ParsedInternalKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_string(true, true))
    }
}

/// Decodes `internal_key` into its components.
///
/// Corruption is reported at `warn` level before the error is returned.
///
/// # Errors
///
/// - [`KeyError::TooSmall`] if the buffer is shorter than eight bytes.
/// - [`KeyError::InvalidType`] if the footer's type is not an extended
///   value type. `log_err_key` controls whether the user key appears in
///   the error detail.
pub fn parse_internal_key(
    internal_key: &[u8],
    log_err_key: bool,
) -> Result<ParsedInternalKey<'_>, KeyError> {
    parse(internal_key, log_err_key).inspect_err(|err| match err {
        KeyError::TooSmall { size } => warn!(size, "internal key too small"),
        KeyError::InvalidType {
            type_byte,
            sequence,
            ..
        } => warn!(
            size = internal_key.len(),
            type_byte,
            sequence,
            "internal key has invalid type"
        ),
    })
}

/// Silent decode, for callers that only ask whether a key is well formed.
fn parse(internal_key: &[u8], log_err_key: bool) -> Result<ParsedInternalKey<'_>, KeyError> {
    let n = internal_key.len();
    if n < NUM_INTERNAL_BYTES {
        return Err(KeyError::TooSmall { size: n });
    }

    let num = format::decode_fixed64(&internal_key[n - NUM_INTERNAL_BYTES..]);
    let (sequence, value_type) = format::unpack_sequence_and_type(num);
    let parsed = ParsedInternalKey {
        user_key: &internal_key[..n - NUM_INTERNAL_BYTES],
        sequence,
        value_type,
    };

    if value_type.is_extended_value_type() {
        Ok(parsed)
    } else {
        Err(KeyError::InvalidType {
            type_byte: value_type.0,
            sequence,
            detail: parsed.debug_string(log_err_key, true),
        })
    }
}

/// Appends the encoding of `key` to `result`.
///
/// ```text
/// before: (anything)
/// after:  ... <user_key | seqno + type>
/// ```
pub fn append_internal_key(result: &mut Vec<u8>, key: &ParsedInternalKey<'_>) {
    result.reserve(key.encoding_length());
    result.extend_from_slice(key.user_key);
    format::append_internal_key_footer(result, key.sequence, key.value_type);
}

/// Appends the encoding of `key`, replacing the trailing `ts.len()` bytes of
/// its user key with `ts`.
///
/// ```text
/// input:  <user_provided_key | original_ts | seqno + type>
/// output: <user_provided_key | ts          | seqno + type>
/// ```
pub fn append_internal_key_with_different_timestamp(
    result: &mut Vec<u8>,
    key: &ParsedInternalKey<'_>,
    ts: &[u8],
) {
    assert!(
        key.user_key.len() >= ts.len(),
        "user key shorter than replacement timestamp"
    );
    result.reserve(key.encoding_length());
    result.extend_from_slice(&key.user_key[..key.user_key.len() - ts.len()]);
    result.extend_from_slice(ts);
    format::append_internal_key_footer(result, key.sequence, key.value_type);
}

// ------------------------------------------------------------------------------------------------
// Owned internal key
// ------------------------------------------------------------------------------------------------

/// An internal key in encoded form.
///
/// An empty representation marks the key as invalid (the `Default` value).
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct InternalKey {
    rep: Vec<u8>,
}

impl InternalKey {
    pub fn new(user_key: &[u8], s: SequenceNumber, t: ValueType) -> Self {
        let mut rep = Vec::new();
        append_internal_key(&mut rep, &ParsedInternalKey::new(user_key, s, t));
        Self { rep }
    }

    /// Builds a key whose trailing timestamp is replaced by `ts`.
    pub fn with_timestamp(user_key: &[u8], s: SequenceNumber, t: ValueType, ts: &[u8]) -> Self {
        let mut rep = Vec::new();
        append_internal_key_with_different_timestamp(
            &mut rep,
            &ParsedInternalKey::new(user_key, s, t),
            ts,
        );
        Self { rep }
    }

    pub fn from_parsed(parsed: &ParsedInternalKey<'_>) -> Self {
        let mut rep = Vec::new();
        append_internal_key(&mut rep, parsed);
        Self { rep }
    }

    /// A key ordered at or after every internal key with this user key.
    pub fn max_possible_for_user_key(user_key: &[u8]) -> Self {
        Self::new(user_key, 0, ValueType::DELETION)
    }

    /// A key ordered at or before every internal key with this user key.
    pub fn min_possible_for_user_key(user_key: &[u8]) -> Self {
        Self::new(user_key, MAX_SEQUENCE_NUMBER, VALUE_TYPE_FOR_SEEK)
    }

    /// Returns `true` if the representation decodes successfully.
    pub fn valid(&self) -> bool {
        parse(&self.rep, false).is_ok()
    }

    /// Replaces the representation with a copy of `s`. Not validated.
    pub fn decode_from(&mut self, s: &[u8]) {
        self.rep.clear();
        self.rep.extend_from_slice(s);
    }

    /// The encoded bytes.
    ///
    /// # Panics
    ///
    /// Panics if the key is empty.
    pub fn encode(&self) -> &[u8] {
        assert!(!self.rep.is_empty(), "encoding an empty internal key");
        &self.rep
    }

    pub fn user_key(&self) -> &[u8] {
        format::extract_user_key(&self.rep)
    }

    pub fn size(&self) -> usize {
        self.rep.len()
    }

    pub fn set(&mut self, user_key: &[u8], s: SequenceNumber, t: ValueType) {
        self.set_from(&ParsedInternalKey::new(user_key, s, t));
    }

    pub fn set_with_timestamp(
        &mut self,
        user_key_with_ts: &[u8],
        s: SequenceNumber,
        t: ValueType,
        ts: &[u8],
    ) {
        self.rep.clear();
        append_internal_key_with_different_timestamp(
            &mut self.rep,
            &ParsedInternalKey::new(user_key_with_ts, s, t),
            ts,
        );
    }

    pub fn set_from(&mut self, parsed: &ParsedInternalKey<'_>) {
        self.rep.clear();
        append_internal_key(&mut self.rep, parsed);
    }

    pub fn clear(&mut self) {
        self.rep.clear();
    }

    /// Direct access to the representation, for use with
    /// [`convert_from_user_key`](Self::convert_from_user_key).
    pub fn rep_mut(&mut self) -> &mut Vec<u8> {
        &mut self.rep
    }

    /// Turns a representation holding only a user key into an internal key
    /// by appending the footer. Saves a copy compared to [`set`](Self::set).
    pub fn convert_from_user_key(&mut self, s: SequenceNumber, t: ValueType) {
        format::append_internal_key_footer(&mut self.rep, s, t);
    }

    /// Rewrites the footer without reallocating.
    pub fn update(&mut self, s: SequenceNumber, t: ValueType) {
        format::update_internal_key(&mut self.rep, s, t);
    }

    /// Human-readable rendering; `(bad)<escaped bytes>` if undecodable.
    pub fn debug_string(&self, hex: bool) -> String {
        match parse(&self.rep, false) {
            Ok(parsed) => parsed.debug_string(true, hex),
            Err(_) => format!("(bad){}", format::escape_bytes(&self.rep)),
        }
    }
}

impl fmt::Debug for InternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_string(true))
    }
}

impl AsRef<[u8]> for InternalKey {
    fn as_ref(&self) -> &[u8] {
        &self.rep
    }
}

//! # keyformat
//!
//! Internal-key encoding, ordering and iterator key buffers for an
//! **LSM-tree** storage engine.
//!
//! Every record the engine stores is addressed by an *internal key*:
//!
//! ```text
//! [USER_KEY][TIMESTAMP?][FOOTER: u64 LE = (sequence << 8) | value_type]
//! ```
//!
//! This byte layout is an on-disk compatibility contract.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use keyformat::{BytewiseComparator, InternalKey, KeyFormat, KeyFormatConfig, ValueType};
//!
//! let format = KeyFormat::open(Arc::new(BytewiseComparator), KeyFormatConfig::default()).unwrap();
//! let cmp = format.comparator();
//!
//! let newer = InternalKey::new(b"a", 5, ValueType::VALUE);
//! let older = InternalKey::new(b"a", 3, ValueType::VALUE);
//! assert!(cmp.compare(newer.encode(), older.encode()).is_lt());
//!
//! let parsed = format.decode(newer.encode()).unwrap();
//! assert_eq!(parsed.user_key, b"a");
//! assert_eq!(parsed.sequence, 5);
//! ```
//!
//! ## Modules
//!
//! - [`format`]: value types, footer packing, unchecked extraction and
//!   timestamp-aware construction helpers.
//! - [`key`]: [`ParsedInternalKey`], the validating [`parse_internal_key`],
//!   and the owned [`InternalKey`].
//! - [`comparator`]: the [`UserComparator`] capability and
//!   [`InternalKeyComparator`].
//! - [`iter_key`]: [`IterKey`], the pinned/owned iterator key buffer.
//! - [`range_del`]: [`RangeTombstone`].
//! - [`transform`]: prefix extractors and their internal-key adapter.

pub mod comparator;
pub mod format;
pub mod iter_key;
pub mod key;
pub mod range_del;
pub mod transform;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

pub use comparator::{
    BytewiseComparator, InternalKeyComparator, ReverseBytewiseComparator, UserComparator,
};
pub use format::{
    DISABLE_GLOBAL_SEQUENCE_NUMBER, EntryType, MAX_SEQUENCE_NUMBER, NUM_INTERNAL_BYTES,
    SequenceNumber, VALUE_TYPE_FOR_SEEK, VALUE_TYPE_FOR_SEEK_FOR_PREV, ValueType,
};
pub use iter_key::IterKey;
pub use key::{InternalKey, KeyError, ParsedInternalKey, parse_internal_key};
pub use range_del::RangeTombstone;
pub use transform::{FixedPrefixTransform, InternalKeySliceTransform, SliceTransform};

/// Largest supported user-defined timestamp width in bytes.
pub const MAX_TIMESTAMP_SIZE: usize = 255;

// ------------------------------------------------------------------------------------------------
// Configuration
// ------------------------------------------------------------------------------------------------

/// Configuration for a [`KeyFormat`].
///
/// All fields have defaults via [`KeyFormatConfig::default()`]. The
/// configuration is validated when passed to [`KeyFormat::open`].
///
/// # Example
///
/// ```rust
/// use keyformat::KeyFormatConfig;
///
/// // No timestamps, redacted keys in corruption errors.
/// let config = KeyFormatConfig::default();
///
/// // 8-byte timestamps, keys rendered in hex on corruption.
/// let config = KeyFormatConfig {
///     timestamp_size: 8,
///     log_corrupted_keys: true,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct KeyFormatConfig {
    /// Width of the user-defined timestamp suffix in bytes.
    ///
    /// Default: 0 (disabled). Must be ≤ [`MAX_TIMESTAMP_SIZE`] and equal to
    /// the user comparator's [`UserComparator::timestamp_size`].
    pub timestamp_size: usize,

    /// Whether corruption errors include the user key, hex-rendered.
    ///
    /// Default: false (the key is shown as `<redacted>`).
    pub log_corrupted_keys: bool,
}

impl Default for KeyFormatConfig {
    fn default() -> Self {
        Self {
            timestamp_size: 0,
            log_corrupted_keys: false,
        }
    }
}

impl KeyFormatConfig {
    /// Validates all configuration parameters against `user_comparator`.
    fn validate(&self, user_comparator: &dyn UserComparator) -> Result<(), KeyFormatError> {
        if self.timestamp_size > MAX_TIMESTAMP_SIZE {
            return Err(KeyFormatError::InvalidConfig(format!(
                "timestamp_size must be <= {MAX_TIMESTAMP_SIZE}"
            )));
        }
        if self.timestamp_size != user_comparator.timestamp_size() {
            return Err(KeyFormatError::InvalidConfig(format!(
                "timestamp_size {} does not match comparator {} ({})",
                self.timestamp_size,
                user_comparator.name(),
                user_comparator.timestamp_size()
            )));
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors returned by [`KeyFormat`] operations.
#[derive(Debug, Error)]
pub enum KeyFormatError {
    /// Invalid configuration parameter.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Key or timestamp constraint violated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A key failed to decode.
    #[error("{0}")]
    Key(#[from] KeyError),
}

// ------------------------------------------------------------------------------------------------
// Key format handle
// ------------------------------------------------------------------------------------------------

/// A validated key format: the internal-key comparator plus the timestamp
/// width and error rendering policy it is used with.
///
/// Cheap to clone and `Send + Sync`; share one per column family.
#[derive(Debug, Clone)]
pub struct KeyFormat {
    comparator: InternalKeyComparator,
    timestamp_size: usize,
    log_corrupted_keys: bool,
}

impl KeyFormat {
    /// Validates `config` against `user_comparator` and builds the format.
    ///
    /// # Errors
    ///
    /// Returns [`KeyFormatError::InvalidConfig`] if the timestamp width is
    /// out of range or disagrees with the comparator.
    pub fn open(
        user_comparator: Arc<dyn UserComparator>,
        config: KeyFormatConfig,
    ) -> Result<Self, KeyFormatError> {
        config.validate(user_comparator.as_ref())?;

        let comparator = InternalKeyComparator::new(user_comparator);
        debug!(
            comparator = comparator.name(),
            timestamp_size = config.timestamp_size,
            "key format opened"
        );

        Ok(Self {
            comparator,
            timestamp_size: config.timestamp_size,
            log_corrupted_keys: config.log_corrupted_keys,
        })
    }

    /// The internal-key comparator built from the user comparator.
    pub fn comparator(&self) -> &InternalKeyComparator {
        &self.comparator
    }

    /// Width of the user-defined timestamp, 0 if disabled.
    pub fn timestamp_size(&self) -> usize {
        self.timestamp_size
    }

    /// Decodes an internal key, rendering the key in errors per
    /// [`KeyFormatConfig::log_corrupted_keys`].
    pub fn decode<'k>(&self, internal_key: &'k [u8]) -> Result<ParsedInternalKey<'k>, KeyFormatError> {
        Ok(parse_internal_key(internal_key, self.log_corrupted_keys)?)
    }

    /// The smallest timestamp of this format's width (all `0x00`).
    pub fn min_timestamp(&self) -> Vec<u8> {
        vec![0x00; self.timestamp_size]
    }

    /// The largest timestamp of this format's width (all `0xFF`).
    pub fn max_timestamp(&self) -> Vec<u8> {
        vec![0xFF; self.timestamp_size]
    }

    /// A fresh iterator key buffer.
    pub fn new_iter_key<'a>(&self) -> IterKey<'a> {
        IterKey::new()
    }

    /// The user key of `internal_key` without its timestamp.
    ///
    /// Unchecked like the rest of [`format`]: run [`decode`](Self::decode)
    /// first on untrusted bytes.
    ///
    /// # Panics
    ///
    /// Panics if `internal_key` is shorter than the footer plus the
    /// configured timestamp width.
    pub fn user_key_without_timestamp<'k>(&self, internal_key: &'k [u8]) -> &'k [u8] {
        format::extract_user_key_and_strip_timestamp(internal_key, self.timestamp_size)
    }

    /// Builds a range tombstone, substituting `ts` into both boundaries when
    /// timestamps are enabled.
    ///
    /// # Errors
    ///
    /// Returns [`KeyFormatError::InvalidArgument`] if `ts` does not match the
    /// configured timestamp width or a boundary is shorter than `ts`.
    pub fn range_tombstone<'k>(
        &self,
        start_key: &'k [u8],
        end_key: &'k [u8],
        seq: SequenceNumber,
        ts: &'k [u8],
    ) -> Result<RangeTombstone<'k>, KeyFormatError> {
        if ts.len() != self.timestamp_size {
            return Err(KeyFormatError::InvalidArgument(format!(
                "timestamp of {} bytes, expected {}",
                ts.len(),
                self.timestamp_size
            )));
        }
        if start_key.len() < ts.len() || end_key.len() < ts.len() {
            return Err(KeyFormatError::InvalidArgument(
                "range boundaries must carry a timestamp".into(),
            ));
        }
        if ts.is_empty() {
            Ok(RangeTombstone::new(start_key, end_key, seq))
        } else {
            Ok(RangeTombstone::with_timestamp(start_key, end_key, seq, ts))
        }
    }
}

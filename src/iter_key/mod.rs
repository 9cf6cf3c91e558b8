//! Reusable key buffer for iterators.
//!
//! [`IterKey`] lets an iterator reconstruct a long run of keys (for example
//! one per entry while decoding a prefix-compressed block) and allocate only
//! when a key outgrows the current capacity.
//!
//! # Storage modes
//!
//! ```text
//! pinned ─── views external bytes (&'a [u8]); no copy is held
//! owned  ─┬─ inline [u8; INLINE_KEY_CAPACITY]   (short keys, no allocation)
//!         └─ heap Box<[u8]>                     (once a key exceeds capacity)
//! ```
//!
//! The pinned mode is a borrow, so the compiler guarantees the external bytes
//! outlive the buffer's view of them. In-place mutation
//! ([`IterKey::update_internal_key`], [`IterKey::key_mut`]) is only possible
//! in owned mode and panics on a pinned key.
//!
//! # Growth policy
//!
//! Capacity starts at [`INLINE_KEY_CAPACITY`]. When a larger size is
//! requested a heap region of exactly that size replaces the previous heap
//! region (if any). Capacity never shrinks until [`IterKey::reset`] or drop.
//!
//! # Content tagging
//!
//! The buffer tracks whether its content is a bare user key or a full
//! internal key, so [`IterKey::user_key`] knows whether to strip the 8-byte
//! footer.

#[cfg(test)]
mod tests;

use tracing::trace;

use crate::format::{
    self, NUM_INTERNAL_BYTES, SequenceNumber, VALUE_TYPE_FOR_SEEK, ValueType,
};
use crate::key::ParsedInternalKey;

/// Size of the inline region; keys up to this length never allocate.
pub const INLINE_KEY_CAPACITY: usize = 39;

// ------------------------------------------------------------------------------------------------
// Iterator key buffer
// ------------------------------------------------------------------------------------------------

/// A key slot reused across iteration steps.
///
/// `'a` is the lifetime of any external bytes the key is pinned to. A buffer
/// that never pins can be used as `IterKey<'static>`.
pub struct IterKey<'a> {
    /// Inline storage for short keys.
    space: [u8; INLINE_KEY_CAPACITY],

    /// Heap storage once a key exceeded the inline capacity.
    heap: Option<Box<[u8]>>,

    /// External bytes the key currently points at, if pinned.
    pinned: Option<&'a [u8]>,

    /// Length of the current key.
    key_size: usize,

    /// Whether the content is a user key (`true`) or an internal key.
    is_user_key: bool,
}

impl Default for IterKey<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IterKey<'a> {
    /// An empty, owned key tagged as a user key. Does not allocate.
    pub fn new() -> Self {
        Self {
            space: [0u8; INLINE_KEY_CAPACITY],
            heap: None,
            pinned: None,
            key_size: 0,
            is_user_key: true,
        }
    }

    /// Sets the tag picked up by the next [`set_key`](Self::set_key) /
    /// [`pin_key`](Self::pin_key).
    pub fn set_is_user_key(&mut self, is_user_key: bool) {
        self.is_user_key = is_user_key;
    }

    /// Whether the content is a user key rather than an internal key.
    pub fn is_user_key(&self) -> bool {
        self.is_user_key
    }

    /// The key in whichever form it was provided (timestamp included).
    pub fn key(&self) -> &[u8] {
        match self.pinned {
            Some(external) => external,
            None => &self.buf()[..self.key_size],
        }
    }

    /// The full internal key.
    ///
    /// # Panics
    ///
    /// Panics if the content is tagged as a user key.
    pub fn internal_key(&self) -> &[u8] {
        assert!(!self.is_user_key, "IterKey holds a user key");
        self.key()
    }

    /// The user-key portion: the whole content for a user key, or the
    /// content minus its footer for an internal key.
    pub fn user_key(&self) -> &[u8] {
        let key = self.key();
        if self.is_user_key {
            key
        } else {
            format::extract_user_key(key)
        }
    }

    /// Length of the current key in bytes.
    pub fn size(&self) -> usize {
        self.key_size
    }

    /// Current owned capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf().len()
    }

    /// `true` while the key points at external bytes.
    pub fn is_key_pinned(&self) -> bool {
        self.pinned.is_some()
    }

    /// Empties the key but keeps the allocated capacity.
    pub fn clear(&mut self) {
        self.pinned = None;
        self.key_size = 0;
    }

    /// Releases any heap region and returns to the inline buffer.
    pub fn reset(&mut self) {
        self.heap = None;
        self.pinned = None;
        self.key_size = 0;
    }

    // --------------------------------------------------------------------------------------------
    // Delta reconstruction
    // --------------------------------------------------------------------------------------------

    /// Keeps the first `shared_len` bytes of the current key and appends
    /// `non_shared`.
    ///
    /// Used when decoding prefix-compressed entries. A pinned key is first
    /// copied into owned storage, because the external bytes are not assumed
    /// to stay put. An owned key is extended in place when capacity allows;
    /// otherwise a new region is allocated, the prefix copied, and only then
    /// the old region dropped.
    ///
    /// # Panics
    ///
    /// Panics if `shared_len` exceeds the current key size.
    pub fn trim_append(&mut self, shared_len: usize, non_shared: &[u8]) {
        assert!(
            shared_len <= self.key_size,
            "shared_len {shared_len} exceeds key size {}",
            self.key_size
        );
        let total_size = shared_len + non_shared.len();

        if let Some(external) = self.pinned.take() {
            self.enlarge_buffer_if_needed(total_size);
            self.buf_mut()[..shared_len].copy_from_slice(&external[..shared_len]);
        } else if total_size > self.capacity() {
            let mut grown = vec![0u8; total_size].into_boxed_slice();
            grown[..shared_len].copy_from_slice(&self.buf()[..shared_len]);
            trace!(
                from = self.capacity(),
                to = total_size,
                "iter key buffer grown"
            );
            self.heap = Some(grown);
        }

        self.buf_mut()[shared_len..total_size].copy_from_slice(non_shared);
        self.key_size = total_size;
    }

    /// Variant of [`trim_append`](Self::trim_append) for keys stored without
    /// their timestamp.
    ///
    /// The current key carries a `ts_sz`-byte timestamp that the encoded
    /// stream does not count towards `shared_len`; the reconstructed key gets
    /// a minimum timestamp of `ts_sz` zero bytes spliced in right after its
    /// user key.
    ///
    /// For a user key the timestamp goes at the end. For an internal key the
    /// logical (timestamp-less) key is made of three fragments:
    ///
    /// ```text
    /// [retained user key w/o ts][retained footer bytes][non_shared]
    /// ```
    ///
    /// and the timestamp is inserted into whichever fragment crosses offset
    /// `shared_len + non_shared.len() - 8`.
    pub fn trim_append_with_timestamp(
        &mut self,
        shared_len: usize,
        non_shared: &[u8],
        ts_sz: usize,
    ) {
        let non_shared_len = non_shared.len();
        let total_size = shared_len + non_shared_len;
        let mut key_with_ts = Vec::with_capacity(total_size + ts_sz);

        if self.is_user_key {
            let current = self.key();
            key_with_ts.extend_from_slice(&current[..shared_len]);
            key_with_ts.extend_from_slice(non_shared);
            key_with_ts.extend(std::iter::repeat_n(0u8, ts_sz));
        } else {
            assert!(
                total_size >= NUM_INTERNAL_BYTES,
                "reconstructed internal key shorter than its footer"
            );
            // `user_key` / `internal_bytes` name the parts of the *current*
            // key; bytes may move between user key and footer in the new one.
            let current = self.key();
            assert!(
                self.key_size >= NUM_INTERNAL_BYTES + ts_sz,
                "current key has no room for a {ts_sz}-byte timestamp"
            );
            let user_key_len = self.key_size - NUM_INTERNAL_BYTES;
            let sharable_user_key_len = user_key_len - ts_sz;
            let shared_user_key_len = shared_len.min(sharable_user_key_len);
            let shared_internal_bytes_len = shared_len - shared_user_key_len;
            let split = total_size - NUM_INTERNAL_BYTES;

            let fragments: [(&[u8], usize); 3] = [
                (&current[..shared_user_key_len], 0),
                (
                    &current[user_key_len..user_key_len + shared_internal_bytes_len],
                    shared_user_key_len,
                ),
                (non_shared, shared_len),
            ];
            let last = fragments.len() - 1;

            let mut ts_added = false;
            for (i, (fragment, offset)) in fragments.into_iter().enumerate() {
                let crosses_split = if i == last {
                    non_shared_len >= NUM_INTERNAL_BYTES
                } else {
                    split < offset + fragment.len()
                };
                if crosses_split && !ts_added {
                    let left = split - offset;
                    key_with_ts.extend_from_slice(&fragment[..left]);
                    key_with_ts.extend(std::iter::repeat_n(0u8, ts_sz));
                    key_with_ts.extend_from_slice(&fragment[left..]);
                    ts_added = true;
                } else {
                    key_with_ts.extend_from_slice(fragment);
                }
            }
            assert!(ts_added, "timestamp was not spliced into the key");
        }

        self.set_key(&key_with_ts);
    }

    // --------------------------------------------------------------------------------------------
    // Set / pin
    // --------------------------------------------------------------------------------------------

    /// Copies `key` into owned storage, keeping the current tag.
    pub fn set_key(&mut self, key: &[u8]) -> &[u8] {
        let size = key.len();
        self.pinned = None;
        self.enlarge_buffer_if_needed(size);
        self.buf_mut()[..size].copy_from_slice(key);
        self.key_size = size;
        self.key()
    }

    /// Points at `key` without copying, keeping the current tag.
    pub fn pin_key(&mut self, key: &'a [u8]) -> &[u8] {
        self.pinned = Some(key);
        self.key_size = key.len();
        key
    }

    /// [`set_key`](Self::set_key), tagging the content as a user key.
    pub fn set_user_key(&mut self, key: &[u8]) -> &[u8] {
        self.is_user_key = true;
        self.set_key(key)
    }

    /// [`pin_key`](Self::pin_key), tagging the content as a user key.
    pub fn pin_user_key(&mut self, key: &'a [u8]) -> &[u8] {
        self.is_user_key = true;
        self.pin_key(key)
    }

    /// [`set_key`](Self::set_key), tagging the content as an internal key.
    pub fn set_internal_key(&mut self, key: &[u8]) -> &[u8] {
        self.is_user_key = false;
        self.set_key(key)
    }

    /// [`pin_key`](Self::pin_key), tagging the content as an internal key.
    pub fn pin_internal_key(&mut self, key: &'a [u8]) -> &[u8] {
        self.is_user_key = false;
        self.pin_key(key)
    }

    /// Copies a pinned key into owned storage.
    ///
    /// # Panics
    ///
    /// Panics if the key is not pinned.
    pub fn own_key(&mut self) {
        let Some(external) = self.pinned.take() else {
            panic!("own_key on a key that is not pinned");
        };
        let size = external.len();
        self.enlarge_buffer_if_needed(size);
        self.buf_mut()[..size].copy_from_slice(external);
        self.key_size = size;
    }

    /// Builds `<key_prefix><user_key><ts?><footer>` in owned storage and tags
    /// the content as an internal key.
    pub fn set_internal_key_with_prefix(
        &mut self,
        key_prefix: &[u8],
        user_key: &[u8],
        s: SequenceNumber,
        value_type: ValueType,
        ts: Option<&[u8]>,
    ) {
        let ts = ts.unwrap_or_default();
        let user_end = key_prefix.len() + user_key.len();
        let ts_end = user_end + ts.len();
        let total = ts_end + NUM_INTERNAL_BYTES;

        self.pinned = None;
        self.enlarge_buffer_if_needed(total);
        let buf = self.buf_mut();
        buf[..key_prefix.len()].copy_from_slice(key_prefix);
        buf[key_prefix.len()..user_end].copy_from_slice(user_key);
        buf[user_end..ts_end].copy_from_slice(ts);
        buf[ts_end..total]
            .copy_from_slice(&format::pack_sequence_and_type(s, value_type).to_le_bytes());

        self.key_size = total;
        self.is_user_key = false;
    }

    /// [`set_internal_key_with_prefix`](Self::set_internal_key_with_prefix)
    /// with an empty prefix.
    pub fn set_internal_key_from_parts(
        &mut self,
        user_key: &[u8],
        s: SequenceNumber,
        value_type: ValueType,
        ts: Option<&[u8]>,
    ) {
        self.set_internal_key_with_prefix(&[], user_key, s, value_type, ts);
    }

    /// Builds a seek key: `user_key` at sequence `s` with
    /// [`VALUE_TYPE_FOR_SEEK`].
    pub fn set_seek_key(&mut self, user_key: &[u8], s: SequenceNumber) {
        self.set_internal_key_from_parts(user_key, s, VALUE_TYPE_FOR_SEEK, None);
    }

    /// Encodes `parsed` into owned storage as an internal key.
    pub fn set_parsed_internal_key(&mut self, parsed: &ParsedInternalKey<'_>) {
        self.set_internal_key_from_parts(parsed.user_key, parsed.sequence, parsed.value_type, None);
    }

    /// Stores `<varint32 len><key>` and tags the content as a user key.
    ///
    /// # Panics
    ///
    /// Panics if `key` is longer than `u32::MAX` bytes.
    pub fn encode_length_prefixed_key(&mut self, key: &[u8]) {
        let Ok(len) = u32::try_from(key.len()) else {
            panic!("key of {} bytes cannot be length-prefixed", key.len());
        };
        let prefix_len = format::varint_length(u64::from(len));
        let total = prefix_len + key.len();

        self.pinned = None;
        self.enlarge_buffer_if_needed(total);
        let buf = self.buf_mut();
        format::put_varint32(&mut buf[..prefix_len], len);
        buf[prefix_len..total].copy_from_slice(key);
        self.key_size = total;
        self.is_user_key = true;
    }

    // --------------------------------------------------------------------------------------------
    // In-place mutation (owned mode only)
    // --------------------------------------------------------------------------------------------

    /// Rewrites the footer, and the timestamp right before it if `ts` is
    /// given, without touching the rest of the buffer.
    ///
    /// # Panics
    ///
    /// Panics if the key is pinned or too short.
    pub fn update_internal_key(&mut self, seq: SequenceNumber, t: ValueType, ts: Option<&[u8]>) {
        assert!(!self.is_key_pinned(), "cannot update a pinned key in place");
        let key_size = self.key_size;
        assert!(key_size >= NUM_INTERNAL_BYTES, "internal key too small");
        let buf = self.buf_mut();
        if let Some(ts) = ts {
            assert!(
                key_size >= NUM_INTERNAL_BYTES + ts.len(),
                "internal key too small for timestamp"
            );
            let start = key_size - NUM_INTERNAL_BYTES - ts.len();
            buf[start..start + ts.len()].copy_from_slice(ts);
        }
        format::update_internal_key(&mut buf[..key_size], seq, t);
    }

    /// Mutable view of an owned key.
    ///
    /// # Panics
    ///
    /// Panics if the key is pinned.
    pub fn key_mut(&mut self) -> &mut [u8] {
        assert!(!self.is_key_pinned(), "cannot mutate a pinned key");
        let key_size = self.key_size;
        &mut self.buf_mut()[..key_size]
    }

    /// Makes the key `size` bytes of owned storage and returns it for
    /// writing. Existing bytes are kept when no reallocation is needed;
    /// otherwise the content is zeroed.
    pub fn reserve(&mut self, size: usize) -> &mut [u8] {
        if let Some(external) = self.pinned.take() {
            self.enlarge_buffer_if_needed(external.len());
            self.buf_mut()[..external.len()].copy_from_slice(external);
        }
        self.enlarge_buffer_if_needed(size);
        self.key_size = size;
        &mut self.buf_mut()[..size]
    }

    // --------------------------------------------------------------------------------------------
    // Buffer management
    // --------------------------------------------------------------------------------------------

    #[inline]
    fn buf(&self) -> &[u8] {
        match &self.heap {
            Some(heap) => heap,
            None => &self.space,
        }
    }

    #[inline]
    fn buf_mut(&mut self) -> &mut [u8] {
        match &mut self.heap {
            Some(heap) => heap,
            None => &mut self.space,
        }
    }

    /// Grows owned storage to hold `key_size` bytes. Existing owned content
    /// is **not** preserved when a new region is allocated.
    #[inline]
    fn enlarge_buffer_if_needed(&mut self, key_size: usize) {
        if key_size > self.capacity() {
            self.enlarge_buffer(key_size);
        }
    }

    fn enlarge_buffer(&mut self, key_size: usize) {
        trace!(
            from = self.capacity(),
            to = key_size,
            "iter key buffer grown"
        );
        self.heap = Some(vec![0u8; key_size].into_boxed_slice());
    }
}

impl std::fmt::Debug for IterKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterKey")
            .field("key", &format::escape_bytes(self.key()))
            .field("is_user_key", &self.is_user_key)
            .field("pinned", &self.is_key_pinned())
            .field("capacity", &self.capacity())
            .finish()
    }
}

//! Outbound helper that splits text messages into transport fragments.
//!
//! [`Fragmenter`] chunks UTF-8 text into fragments of at most
//! `max_fragment_size` bytes, tagging each with a [`FragmentHeader`]. Cuts
//! always land on a `char` boundary so no fragment carries half a code
//! point. The struct hands out increasing [`MessageId`] values internally so
//! callers can request chunking without worrying about identifier
//! collisions.

use std::{
    num::NonZeroUsize,
    ops::Range,
    sync::atomic::{AtomicU64, Ordering},
};

use bytes::Bytes;

use super::{FragmentHeader, FragmentIndex, FragmentationError, MessageId};

/// Splits text messages into fragment-sized pieces.
#[derive(Debug)]
pub struct Fragmenter {
    max_fragment_size: NonZeroUsize,
    next_message_id: AtomicU64,
}

impl Fragmenter {
    /// Create a new fragmenter that caps fragment payloads at `max_fragment_size` bytes.
    #[must_use]
    pub const fn new(max_fragment_size: NonZeroUsize) -> Self {
        Self::with_starting_id(max_fragment_size, MessageId::new(0))
    }

    /// Create a new fragmenter starting from a specific [`MessageId`].
    #[must_use]
    pub const fn with_starting_id(max_fragment_size: NonZeroUsize, start_at: MessageId) -> Self {
        Self {
            max_fragment_size,
            next_message_id: AtomicU64::new(start_at.get()),
        }
    }

    /// Return the maximum fragment payload size in bytes.
    #[must_use]
    pub const fn max_fragment_size(&self) -> NonZeroUsize { self.max_fragment_size }

    /// Generate and return the next [`MessageId`].
    ///
    /// # Panics
    ///
    /// Panics if the identifier counter reaches `u64::MAX` and overflows.
    #[must_use]
    pub fn next_message_id(&self) -> MessageId {
        let previous = self
            .next_message_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_add(1)
            })
            .unwrap_or_else(|_| panic!("message id counter exhausted"));
        MessageId::new(previous)
    }

    /// Split `text` into fragments, generating a fresh [`MessageId`].
    ///
    /// # Errors
    ///
    /// Returns [`FragmentationError::CodePointTooWide`] when the fragment cap
    /// is narrower than a code point in `text`, or
    /// [`FragmentationError::IndexOverflow`] if more than `u32::MAX`
    /// fragments are required.
    pub fn fragment_text(&self, text: &str) -> Result<FragmentBatch, FragmentationError> {
        let message_id = self.next_message_id();
        self.fragment_with_id(message_id, text)
    }

    /// Split `text` into fragments, tagging them with `message_id`.
    ///
    /// # Errors
    ///
    /// See [`Fragmenter::fragment_text`].
    pub fn fragment_with_id(
        &self,
        message_id: MessageId,
        text: &str,
    ) -> Result<FragmentBatch, FragmentationError> {
        let ranges = split_ranges(text, self.max_fragment_size.get())?;
        let total = u32::try_from(ranges.len()).map_err(|_| FragmentationError::IndexOverflow {
            last: FragmentIndex::new(u32::MAX),
        })?;

        let payload = Bytes::copy_from_slice(text.as_bytes());
        let fragments = ranges
            .into_iter()
            .zip((0..total).map(FragmentIndex::new))
            .map(|(range, index)| {
                FragmentFrame::new(
                    FragmentHeader::new(message_id, index, total),
                    payload.slice(range),
                )
            })
            .collect();
        Ok(FragmentBatch::new(message_id, fragments))
    }
}

/// Compute byte ranges of at most `max` bytes, each ending on a `char`
/// boundary. Empty text yields a single empty range.
fn split_ranges(text: &str, max: usize) -> Result<Vec<Range<usize>>, FragmentationError> {
    let total = text.len();
    if total == 0 {
        return Ok(vec![0..0]);
    }

    let mut ranges = Vec::with_capacity(total.div_ceil(max));
    let mut offset = 0usize;
    while offset < total {
        let mut end = offset.saturating_add(max).min(total);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == offset {
            return Err(FragmentationError::CodePointTooWide { offset, cap: max });
        }
        ranges.push(offset..end);
        offset = end;
    }
    Ok(ranges)
}

/// Metadata and payload for a single outbound fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentFrame {
    header: FragmentHeader,
    payload: Bytes,
}

impl FragmentFrame {
    /// Construct a new fragment frame.
    #[must_use]
    pub fn new(header: FragmentHeader, payload: Bytes) -> Self { Self { header, payload } }

    /// Return the fragment header.
    #[must_use]
    pub fn header(&self) -> &FragmentHeader { &self.header }

    /// Return the fragment payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Consume the frame, returning its components.
    #[must_use]
    pub fn into_parts(self) -> (FragmentHeader, Bytes) { (self.header, self.payload) }
}

/// Collection of fragments produced for a single logical message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentBatch {
    message_id: MessageId,
    fragments: Vec<FragmentFrame>,
}

impl FragmentBatch {
    fn new(message_id: MessageId, fragments: Vec<FragmentFrame>) -> Self {
        debug_assert!(!fragments.is_empty(), "fragment batches must not be empty");
        Self {
            message_id,
            fragments,
        }
    }

    /// Return the [`MessageId`] shared by all fragments.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Return the fragments as a slice.
    #[must_use]
    pub fn fragments(&self) -> &[FragmentFrame] { self.fragments.as_slice() }

    /// Number of fragments in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.fragments.len() }

    /// Whether the logical message required more than one fragment.
    #[must_use]
    pub fn is_fragmented(&self) -> bool { self.len() > 1 }

    /// Consume the batch, returning all fragments.
    #[must_use]
    pub fn into_fragments(self) -> Vec<FragmentFrame> { self.fragments }
}

impl IntoIterator for FragmentBatch {
    type Item = FragmentFrame;
    type IntoIter = std::vec::IntoIter<FragmentFrame>;

    fn into_iter(self) -> Self::IntoIter { self.fragments.into_iter() }
}

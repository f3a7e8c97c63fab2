//! Ordering tracker used to re-assemble logical messages from fragments.
//!
//! `FragmentSeries` holds no payload bytes, only the position bookkeeping,
//! so the receiver's buffer stays a single contiguous allocation.

use super::{FragmentError, FragmentHeader, FragmentIndex, FragmentStatus, MessageId};

/// Track the expected ordering of fragments for a single logical message.
#[derive(Clone, Debug)]
pub struct FragmentSeries {
    message_id: MessageId,
    next_index: FragmentIndex,
    total_fragments: Option<u32>,
    complete: bool,
}

impl FragmentSeries {
    /// Create a new series for `message_id`, expecting the first fragment.
    #[must_use]
    pub const fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            next_index: FragmentIndex::zero(),
            total_fragments: None,
            complete: false,
        }
    }

    /// Return the message identifier tracked by this series.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Return the next contiguous index the series expects.
    #[must_use]
    pub const fn next_index(&self) -> FragmentIndex { self.next_index }

    /// Return the total fragment count, once a fragment has declared it.
    #[must_use]
    pub const fn total_fragments(&self) -> Option<u32> { self.total_fragments }

    /// Return the highest index held contiguously, or `None` before the
    /// first fragment.
    #[must_use]
    pub fn acked_through(&self) -> Option<FragmentIndex> { self.next_index.checked_decrement() }

    /// Return whether the series has consumed the final fragment.
    #[must_use]
    pub const fn is_complete(&self) -> bool { self.complete }

    /// Accept a fragment and update the expected index.
    ///
    /// # Examples
    ///
    /// ```
    /// use wirelink::fragment::{
    ///     FragmentHeader,
    ///     FragmentIndex,
    ///     FragmentSeries,
    ///     FragmentStatus,
    ///     MessageId,
    /// };
    /// let mut series = FragmentSeries::new(MessageId::new(99));
    /// let first = FragmentHeader::new(MessageId::new(99), FragmentIndex::zero(), 2);
    /// let final_fragment = FragmentHeader::new(MessageId::new(99), FragmentIndex::new(1), 2);
    /// assert_eq!(series.accept(first), Ok(FragmentStatus::Incomplete));
    /// assert_eq!(series.accept(first), Ok(FragmentStatus::Duplicate));
    /// assert_eq!(series.accept(final_fragment), Ok(FragmentStatus::Complete));
    /// assert!(series.is_complete());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::MessageMismatch`] when the fragment belongs to
    /// a different message, [`FragmentError::TotalMismatch`] when it declares
    /// a different total than earlier fragments, [`FragmentError::IndexMismatch`]
    /// when it arrives ahead of the expected index,
    /// [`FragmentError::SeriesComplete`] when the series already consumed a
    /// final fragment, and [`FragmentError::IndexOverflow`] when the index
    /// cannot advance further.
    ///
    /// A fragment repeating an already accepted index yields
    /// [`FragmentStatus::Duplicate`] and leaves the series unchanged.
    pub fn accept(&mut self, fragment: FragmentHeader) -> Result<FragmentStatus, FragmentError> {
        if fragment.message_id() != self.message_id {
            return Err(FragmentError::MessageMismatch {
                expected: self.message_id,
                found: fragment.message_id(),
            });
        }

        match self.total_fragments {
            Some(expected) if expected != fragment.total_fragments() => {
                return Err(FragmentError::TotalMismatch {
                    expected,
                    found: fragment.total_fragments(),
                });
            }
            _ => {}
        }

        if fragment.fragment_index() < self.next_index {
            return Ok(FragmentStatus::Duplicate);
        }

        if self.complete {
            return Err(FragmentError::SeriesComplete);
        }

        if fragment.fragment_index() > self.next_index {
            return Err(FragmentError::IndexMismatch {
                expected: self.next_index,
                found: fragment.fragment_index(),
            });
        }

        self.total_fragments = Some(fragment.total_fragments());
        let next_index = fragment.fragment_index().checked_increment();
        if fragment.is_last_fragment() {
            self.complete = true;
            if let Some(incremented) = next_index {
                self.next_index = incremented;
            }
            return Ok(FragmentStatus::Complete);
        }

        let Some(incremented) = next_index else {
            return Err(FragmentError::IndexOverflow {
                last: fragment.fragment_index(),
            });
        };

        self.next_index = incremented;
        Ok(FragmentStatus::Incomplete)
    }
}

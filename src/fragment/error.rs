//! Error and status types emitted by the fragmentation layer.
//!
//! These enums keep both the outbound splitting logic and the inbound
//! ordering tracker free of any channel or codec detail while still
//! surfacing precise diagnostics for tests and logs.

use thiserror::Error;

use super::{FragmentIndex, MessageId};

/// Result of feeding a fragment into a [`FragmentSeries`](crate::fragment::FragmentSeries).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentStatus {
    /// The logical message still expects more fragments.
    Incomplete,
    /// The fragment completed the logical message.
    Complete,
    /// The fragment repeats an index the series already accepted.
    Duplicate,
}

/// Errors produced by [`FragmentSeries`](crate::fragment::FragmentSeries).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentError {
    /// The fragment belongs to a different message.
    #[error("fragment message mismatch: expected {expected}, found {found}")]
    MessageMismatch {
        expected: MessageId,
        found: MessageId,
    },
    /// A fragment arrived ahead of the next contiguous index.
    #[error("fragment index mismatch: expected {expected}, found {found}")]
    IndexMismatch {
        expected: FragmentIndex,
        found: FragmentIndex,
    },
    /// The fragment declares a different total than earlier fragments.
    #[error("fragment total mismatch: expected {expected}, found {found}")]
    TotalMismatch { expected: u32, found: u32 },
    /// The series already consumed a last fragment.
    #[error("fragment series already complete")]
    SeriesComplete,
    /// The fragment index overflowed `u32::MAX`.
    #[error("fragment index overflow after {last}")]
    IndexOverflow { last: FragmentIndex },
}

/// Errors produced while splitting outbound text.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentationError {
    /// More fragments would be needed than a `u32` index can address.
    #[error("fragment index overflow after {last}")]
    IndexOverflow { last: FragmentIndex },
    /// A single code point is wider than the fragment cap.
    #[error("code point at byte {offset} does not fit in a {cap}-byte fragment")]
    CodePointTooWide { offset: usize, cap: usize },
}

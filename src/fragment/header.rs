use bincode::{Decode, Encode};

use super::{FragmentIndex, MessageId};

/// Header describing a single fragment.
///
/// Besides the message identifier and position, every header repeats the
/// total fragment count so the receiver learns the message shape from
/// whichever fragment reaches it first. `is_last_fragment` is derived from
/// the position and the total; headers decoded from the wire are checked
/// with [`FragmentHeader::is_consistent`].
///
/// # Examples
///
/// ```
/// use wirelink::fragment::{FragmentHeader, FragmentIndex, MessageId};
/// let header = FragmentHeader::new(MessageId::new(7), FragmentIndex::zero(), 2);
/// assert_eq!(header.message_id().get(), 7);
/// assert_eq!(header.fragment_index().get(), 0);
/// assert_eq!(header.total_fragments(), 2);
/// assert!(!header.is_last_fragment());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode)]
pub struct FragmentHeader {
    message_id: MessageId,
    fragment_index: FragmentIndex,
    total_fragments: u32,
    is_last_fragment: bool,
}

impl FragmentHeader {
    /// Create a header for fragment `fragment_index` of a message split into
    /// `total_fragments` pieces.
    #[must_use]
    pub const fn new(
        message_id: MessageId,
        fragment_index: FragmentIndex,
        total_fragments: u32,
    ) -> Self {
        Self {
            message_id,
            fragment_index,
            total_fragments,
            is_last_fragment: total_fragments > 0 && fragment_index.get() == total_fragments - 1,
        }
    }

    /// Return the logical message identifier.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Return the fragment position relative to the message.
    #[must_use]
    pub const fn fragment_index(&self) -> FragmentIndex { self.fragment_index }

    /// Return the number of fragments the message was split into.
    #[must_use]
    pub const fn total_fragments(&self) -> u32 { self.total_fragments }

    /// Report whether this is the final fragment.
    #[must_use]
    pub const fn is_last_fragment(&self) -> bool { self.is_last_fragment }

    /// Check the invariants a well-formed header upholds: a non-zero total,
    /// an index inside it, and a final flag set exactly on the last index.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.total_fragments > 0
            && self.fragment_index.get() < self.total_fragments
            && self.is_last_fragment == (self.fragment_index.get() == self.total_fragments - 1)
    }
}

#[cfg(test)]
impl FragmentHeader {
    /// Build a header with arbitrary field values, bypassing derivation of the
    /// final flag.
    pub(crate) const fn from_raw_parts(
        message_id: MessageId,
        fragment_index: FragmentIndex,
        total_fragments: u32,
        is_last_fragment: bool,
    ) -> Self {
        Self {
            message_id,
            fragment_index,
            total_fragments,
            is_last_fragment,
        }
    }
}

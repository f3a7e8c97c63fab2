use bincode::{Decode, Encode};

use crate::fragment::{FragmentIndex, MessageId};

/// Cumulative acknowledgment sent by the receiver.
///
/// An acknowledgment naming `acked_through = n` confirms that fragments
/// `0..=n` of the message are held contiguously.
///
/// # Examples
///
/// ```
/// use wirelink::{
///     fragment::{FragmentIndex, MessageId},
///     frame::Acknowledgment,
/// };
/// let ack = Acknowledgment::new(MessageId::new(3), FragmentIndex::new(1));
/// assert!(ack.covers(FragmentIndex::zero()));
/// assert!(ack.covers(FragmentIndex::new(1)));
/// assert!(!ack.covers(FragmentIndex::new(2)));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode)]
pub struct Acknowledgment {
    message_id: MessageId,
    acked_through: FragmentIndex,
}

impl Acknowledgment {
    /// Create an acknowledgment for fragments `0..=acked_through`.
    #[must_use]
    pub const fn new(message_id: MessageId, acked_through: FragmentIndex) -> Self {
        Self {
            message_id,
            acked_through,
        }
    }

    /// Return the acknowledged message.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Return the highest contiguously held index.
    #[must_use]
    pub const fn acked_through(&self) -> FragmentIndex { self.acked_through }

    /// Report whether this acknowledgment confirms `index`.
    #[must_use]
    pub fn covers(&self, index: FragmentIndex) -> bool { self.acked_through >= index }
}

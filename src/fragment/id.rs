use bincode::{Decode, Encode};
use derive_more::{Display, From, Into};

/// Identifier of one logical text message travelling over the link.
///
/// Identifiers are handed out by the [`Fragmenter`](crate::fragment::Fragmenter)
/// in strictly increasing order, which lets the receiver tell a retransmitted
/// fragment of an old message apart from the start of a new one.
///
/// # Examples
///
/// ```
/// use wirelink::fragment::MessageId;
/// let id = MessageId::new(42);
/// assert_eq!(id.get(), 42);
/// assert!(MessageId::new(43) > id);
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode, Display, From, Into,
)]
#[display("{_0}")]
pub struct MessageId(u64);

impl MessageId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

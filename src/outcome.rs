//! Terminal results reported to the consumer.

use derive_more::Display;

use crate::fragment::MessageId;

/// Why a message did not reach the consumer.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// No acknowledgment arrived within the retry budget, or the receiver
    /// evicted an idle partial message.
    #[display("timed out")]
    Timeout,
    /// The consumer aborted the message.
    #[display("cancelled")]
    Cancelled,
    /// The reassembled bytes were not valid UTF-8 or exceeded the
    /// receiver's cap.
    #[display("malformed payload")]
    Malformed,
    /// The channel refused the final transmission attempt.
    #[display("channel unavailable")]
    ChannelUnavailable,
}

impl FailureReason {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Malformed => "malformed",
            Self::ChannelUnavailable => "channel_unavailable",
        }
    }
}

/// Result of delivering one message through the
/// [`Segmenter`](crate::segmenter::Segmenter).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every fragment was acknowledged.
    Delivered(MessageId),
    /// The message was abandoned.
    Failed(MessageId, FailureReason),
}

impl DeliveryOutcome {
    /// Identifier of the message this outcome refers to.
    #[must_use]
    pub const fn message_id(&self) -> MessageId {
        match self {
            Self::Delivered(id) | Self::Failed(id, _) => *id,
        }
    }

    /// Report whether the message was delivered.
    #[must_use]
    pub const fn is_delivered(&self) -> bool { matches!(self, Self::Delivered(_)) }

    /// Return the failure reason, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<FailureReason> {
        match self {
            Self::Delivered(_) => None,
            Self::Failed(_, reason) => Some(*reason),
        }
    }
}

//! Metric helpers for `wirelink`.
//!
//! This module defines metric names and simple helper functions wrapping
//! the [`metrics`](https://docs.rs/metrics) crate. Without the `metrics`
//! feature the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::outcome::FailureReason;

/// Name of the counter tracking frames handed to the channel.
pub const FRAMES_SENT: &str = "wirelink_frames_sent_total";
/// Name of the counter tracking fragment retransmissions.
pub const RETRANSMISSIONS: &str = "wirelink_retransmissions_total";
/// Name of the counter tracking messages delivered end to end.
pub const MESSAGES_DELIVERED: &str = "wirelink_messages_delivered_total";
/// Name of the counter tracking abandoned messages.
pub const MESSAGES_FAILED: &str = "wirelink_messages_failed_total";

/// Kind of frame handed to the channel.
#[derive(Clone, Copy, Debug)]
pub enum FrameKind {
    /// A data fragment.
    Fragment,
    /// A cumulative acknowledgment.
    Ack,
}

impl FrameKind {
    #[cfg_attr(not(feature = "metrics"), expect(dead_code, reason = "used by metrics feature"))]
    fn as_str(self) -> &'static str {
        match self {
            FrameKind::Fragment => "fragment",
            FrameKind::Ack => "ack",
        }
    }
}

/// End of the link recording a message outcome.
///
/// A process hosting both ends counts each message once per side, so the
/// label keeps the two tallies apart.
#[derive(Clone, Copy, Debug)]
pub enum Side {
    /// The segmenter, reporting delivery outcomes.
    Sender,
    /// The reassembler, reporting completed and abandoned messages.
    Receiver,
}

impl Side {
    #[cfg_attr(not(feature = "metrics"), expect(dead_code, reason = "used by metrics feature"))]
    fn as_str(self) -> &'static str {
        match self {
            Side::Sender => "sender",
            Side::Receiver => "receiver",
        }
    }
}

/// Record a frame handed to the channel.
pub fn inc_frames_sent(kind: FrameKind) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_SENT, "kind" => kind.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

/// Record a fragment retransmission.
pub fn inc_retransmissions() {
    #[cfg(feature = "metrics")]
    counter!(RETRANSMISSIONS).increment(1);
}

/// Record a message delivered (sender) or completed (receiver).
pub fn inc_delivered(side: Side) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_DELIVERED, "side" => side.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = side;
}

/// Record an abandoned message.
pub fn inc_failed(side: Side, reason: FailureReason) {
    #[cfg(feature = "metrics")]
    counter!(
        MESSAGES_FAILED,
        "side" => side.as_str(),
        "reason" => reason.as_str()
    )
    .increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = (side, reason);
}

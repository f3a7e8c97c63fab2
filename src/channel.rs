//! Channel adapter contract consumed by the link.
//!
//! The platform supplies a primitive that can send one bounded frame and
//! hand inbound frames to the link. A sent frame either arrives intact at
//! the peer or is dropped; it is never corrupted. The link layers
//! acknowledgment, retransmission and reassembly on top.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

mod memory;

pub use memory::{LinkEnd, MemoryChannel, memory_link};

/// Errors reported by [`Channel::transmit`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The peer cannot accept a frame right now.
    #[error("channel unavailable")]
    Unavailable,
    /// The peer has gone away.
    #[error("channel closed")]
    Closed,
    /// The frame exceeds the channel's size ceiling.
    #[error("frame of {len} bytes exceeds the {limit}-byte channel ceiling")]
    FrameTooLarge { len: usize, limit: usize },
}

/// Outbound half of a platform message channel.
///
/// `transmit` must not block: it either queues the frame for delivery or
/// fails immediately.
pub trait Channel: Send + Sync {
    /// Send one frame to the peer.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] when the frame cannot be handed to the
    /// platform.
    fn transmit(&self, frame: Bytes) -> Result<(), ChannelError>;
}

impl<C: Channel + ?Sized> Channel for Arc<C> {
    fn transmit(&self, frame: Bytes) -> Result<(), ChannelError> { (**self).transmit(frame) }
}

impl<C: Channel + ?Sized> Channel for &C {
    fn transmit(&self, frame: Bytes) -> Result<(), ChannelError> { (**self).transmit(frame) }
}

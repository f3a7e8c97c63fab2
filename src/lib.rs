#![doc(html_root_url = "https://docs.rs/wirelink/latest")]
//! Public API for the `wirelink` library.
//!
//! `wirelink` moves UTF-8 text across a small, lossy, message-oriented link
//! such as a phone-to-watch radio. The [`Segmenter`] splits a message into
//! bounded fragments and sends them one at a time, retransmitting until a
//! cumulative acknowledgment arrives. The [`Reassembler`] on the far side
//! rebuilds the text, acknowledges progress, and hands each message to its
//! [`DeliveryHandler`] exactly once.
//!
//! Both sides talk to the radio through the [`Channel`] trait; an in-memory
//! implementation with configurable loss lives in [`channel::memory_link`].

pub mod byte_order;
pub mod channel;
pub mod config;
pub mod error;
pub mod fragment;
pub mod frame;
pub mod metrics;
pub mod outcome;
pub mod reassembler;
pub mod segmenter;

pub use channel::{Channel, ChannelError, LinkEnd, MemoryChannel, memory_link};
pub use config::{ConfigError, LinkConfig};
/// Result type alias re-exported for convenience.
pub use error::{LinkError, Result};
pub use fragment::{
    FragmentBatch,
    FragmentError,
    FragmentFrame,
    FragmentHeader,
    FragmentIndex,
    FragmentSeries,
    FragmentStatus,
    FragmentationError,
    Fragmenter,
    MessageId,
};
pub use frame::{Acknowledgment, Frame, FrameError, decode_frame, encode_frame, fragment_overhead};
pub use metrics::{FRAMES_SENT, MESSAGES_DELIVERED, MESSAGES_FAILED, RETRANSMISSIONS};
pub use outcome::{DeliveryOutcome, FailureReason};
pub use reassembler::{Delivery, DeliveryHandler, Reassembler};
pub use segmenter::{AbortHandle, OutboundMessage, Segmenter};

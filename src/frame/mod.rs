//! Wire format shared by both ends of the link.
//!
//! A frame is either a data fragment or a cumulative acknowledgment. The
//! layout is fixed so the fragment cap can be derived from the channel's
//! frame ceiling with [`fragment_overhead`].

pub mod ack;
pub mod codec;
pub mod error;

pub use ack::Acknowledgment;
pub use codec::{
    FRAME_MAGIC,
    FRAME_VERSION,
    Frame,
    decode_frame,
    encode_ack,
    encode_fragment,
    encode_frame,
    fragment_overhead,
};
pub use error::FrameError;

//! Errors raised while encoding or decoding link frames.

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

use crate::fragment::FragmentHeader;

/// Errors produced by the frame codec.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The header could not be serialised.
    #[error("failed to encode frame header: {0}")]
    Encode(#[from] EncodeError),
    /// The header bytes could not be deserialised.
    #[error("failed to decode frame header: {0}")]
    Decode(#[from] DecodeError),
    /// The frame does not start with the link marker.
    #[error("frame marker missing")]
    BadMagic,
    /// The frame was produced by an incompatible protocol revision.
    #[error("unsupported frame version {0}")]
    UnsupportedVersion(u8),
    /// The frame kind byte is not recognised.
    #[error("unknown frame kind {0:#04x}")]
    UnknownKind(u8),
    /// The frame ended before a fixed-size field.
    #[error("frame truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    /// The declared data length disagrees with the bytes present.
    #[error("frame length mismatch: declared {declared}, found {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    /// The fragment header violates its own invariants.
    #[error("inconsistent fragment header: {0:?}")]
    InconsistentHeader(FragmentHeader),
    /// The fragment body cannot be described by a `u16` length.
    #[error("fragment body of {len} bytes exceeds the frame length field")]
    PayloadTooLarge { len: usize },
}

//! Wire encoding for fragments and acknowledgments.
//!
//! Every frame starts with a four byte preamble:
//! `[FRAME_MAGIC][FRAME_VERSION][kind]`. Headers are encoded with `bincode`
//! using fixed-width big-endian integers so the layout never varies with
//! the field values:
//!
//! - fragment: `[preamble][FragmentHeader: 17 bytes][u16 data_len][data]`
//! - ack: `[preamble][Acknowledgment: 12 bytes]`

use std::num::NonZeroUsize;

use bincode::{
    config::{self, BigEndian, Configuration, Fixint},
    decode_from_slice,
    encode_to_vec,
};
use bytes::{BufMut, Bytes, BytesMut};

use super::{Acknowledgment, FrameError};
use crate::{
    byte_order::{read_network_u16, write_network_u16},
    fragment::{FragmentFrame, FragmentHeader, FragmentIndex, MessageId},
};

/// Marker that opens every link frame.
pub const FRAME_MAGIC: &[u8; 2] = b"WL";

/// Protocol revision written into every frame.
pub const FRAME_VERSION: u8 = 1;

const KIND_FRAGMENT: u8 = 0x01;
const KIND_ACK: u8 = 0x02;

const PREAMBLE_LEN: usize = FRAME_MAGIC.len() + 2;
const DATA_LEN_BYTES: usize = std::mem::size_of::<u16>();

/// A decoded link frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A piece of a logical message travelling from sender to receiver.
    Fragment(FragmentFrame),
    /// A cumulative acknowledgment travelling back to the sender.
    Ack(Acknowledgment),
}

impl From<FragmentFrame> for Frame {
    fn from(fragment: FragmentFrame) -> Self { Self::Fragment(fragment) }
}

impl From<Acknowledgment> for Frame {
    fn from(ack: Acknowledgment) -> Self { Self::Ack(ack) }
}

fn wire_config() -> Configuration<BigEndian, Fixint> {
    config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

/// Fixed bytes a fragment frame adds around its data.
///
/// # Panics
///
/// Panics if encoding a constant [`FragmentHeader`] fails, which would
/// indicate a programmer error in the header definition.
#[must_use]
pub fn fragment_overhead() -> NonZeroUsize {
    let header = FragmentHeader::new(MessageId::new(0), FragmentIndex::zero(), 1);
    let header_bytes = encode_to_vec(header, wire_config()).unwrap_or_else(|err| {
        panic!("fragment header encoding must be infallible for constants: {err}")
    });
    let overhead = PREAMBLE_LEN + header_bytes.len() + DATA_LEN_BYTES;
    NonZeroUsize::new(overhead).unwrap_or_else(|| {
        panic!("fragment overhead must be non-zero (computed {overhead})");
    })
}

/// Encode a frame for transmission.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLarge`] when a fragment body exceeds
/// `u16::MAX` bytes, [`FrameError::InconsistentHeader`] for a malformed
/// header, or [`FrameError::Encode`] if header serialisation fails.
pub fn encode_frame(frame: &Frame) -> Result<Bytes, FrameError> {
    match frame {
        Frame::Fragment(fragment) => encode_fragment(fragment.header(), fragment.payload()),
        Frame::Ack(ack) => encode_ack(*ack),
    }
}

/// Encode a single fragment.
///
/// # Errors
///
/// See [`encode_frame`].
pub fn encode_fragment(header: &FragmentHeader, data: &[u8]) -> Result<Bytes, FrameError> {
    if !header.is_consistent() {
        return Err(FrameError::InconsistentHeader(*header));
    }
    let data_len =
        u16::try_from(data.len()).map_err(|_| FrameError::PayloadTooLarge { len: data.len() })?;
    let header_bytes = encode_to_vec(*header, wire_config())?;

    let mut buf =
        BytesMut::with_capacity(PREAMBLE_LEN + header_bytes.len() + DATA_LEN_BYTES + data.len());
    put_preamble(&mut buf, KIND_FRAGMENT);
    buf.put_slice(&header_bytes);
    buf.put_slice(&write_network_u16(data_len));
    buf.put_slice(data);
    Ok(buf.freeze())
}

/// Encode a single acknowledgment.
///
/// # Errors
///
/// Returns [`FrameError::Encode`] if serialisation fails.
pub fn encode_ack(ack: Acknowledgment) -> Result<Bytes, FrameError> {
    let ack_bytes = encode_to_vec(ack, wire_config())?;
    let mut buf = BytesMut::with_capacity(PREAMBLE_LEN + ack_bytes.len());
    put_preamble(&mut buf, KIND_ACK);
    buf.put_slice(&ack_bytes);
    Ok(buf.freeze())
}

fn put_preamble(buf: &mut BytesMut, kind: u8) {
    buf.put_slice(FRAME_MAGIC);
    buf.put_u8(FRAME_VERSION);
    buf.put_u8(kind);
}

/// Decode a received frame.
///
/// Fragment data is sliced out of `frame` without copying.
///
/// # Errors
///
/// Returns a [`FrameError`] describing the first structural problem found:
/// a missing marker, an unknown version or kind, truncation, a length
/// mismatch, or a fragment header that violates its invariants.
pub fn decode_frame(frame: &Bytes) -> Result<Frame, FrameError> {
    let Some(preamble) = frame.get(..PREAMBLE_LEN) else {
        return Err(FrameError::Truncated {
            needed: PREAMBLE_LEN,
            available: frame.len(),
        });
    };
    if preamble.get(..FRAME_MAGIC.len()) != Some(FRAME_MAGIC.as_slice()) {
        return Err(FrameError::BadMagic);
    }
    let version = preamble[FRAME_MAGIC.len()];
    if version != FRAME_VERSION {
        return Err(FrameError::UnsupportedVersion(version));
    }

    match preamble[FRAME_MAGIC.len() + 1] {
        KIND_FRAGMENT => decode_fragment(frame),
        KIND_ACK => decode_ack(frame),
        other => Err(FrameError::UnknownKind(other)),
    }
}

fn decode_fragment(frame: &Bytes) -> Result<Frame, FrameError> {
    let body = frame.get(PREAMBLE_LEN..).unwrap_or_default();
    let (header, consumed) = decode_from_slice::<FragmentHeader, _>(body, wire_config())?;
    if !header.is_consistent() {
        return Err(FrameError::InconsistentHeader(header));
    }

    let len_start = PREAMBLE_LEN + consumed;
    let data_start = len_start + DATA_LEN_BYTES;
    let Some(&[hi, lo]) = frame.get(len_start..data_start) else {
        return Err(FrameError::Truncated {
            needed: data_start,
            available: frame.len(),
        });
    };
    let declared = usize::from(read_network_u16([hi, lo]));
    let actual = frame.len() - data_start;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }

    Ok(Frame::Fragment(FragmentFrame::new(
        header,
        frame.slice(data_start..),
    )))
}

fn decode_ack(frame: &Bytes) -> Result<Frame, FrameError> {
    let body = frame.get(PREAMBLE_LEN..).unwrap_or_default();
    let (ack, consumed) = decode_from_slice::<Acknowledgment, _>(body, wire_config())?;
    if consumed != body.len() {
        return Err(FrameError::LengthMismatch {
            declared: consumed,
            actual: body.len(),
        });
    }
    Ok(Frame::Ack(ack))
}

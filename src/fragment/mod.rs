//! Fragment metadata primitives for splitting text into bounded pieces.
//!
//! This module collects the domain types shared by the segmenter and the
//! reassembler. Each sub-module focuses on a single concept; the frame
//! codec in [`crate::frame`] turns them into wire bytes.

pub mod error;
pub mod fragmenter;
pub mod header;
pub mod id;
pub mod index;
pub mod series;

pub use error::{FragmentError, FragmentStatus, FragmentationError};
pub use fragmenter::{FragmentBatch, FragmentFrame, Fragmenter};
pub use header::FragmentHeader;
pub use id::MessageId;
pub use index::FragmentIndex;
pub use series::FragmentSeries;

#[cfg(test)]
mod tests;

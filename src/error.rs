//! Canonical error and result types for the crate.
//!
//! Protocol outcomes such as a timed-out delivery are values
//! ([`DeliveryOutcome`](crate::outcome::DeliveryOutcome)), not errors.
//! [`LinkError`] covers the failures that prevent a message from entering
//! the protocol at all.

use thiserror::Error;

use crate::{
    config::ConfigError,
    fragment::FragmentationError,
    frame::FrameError,
};

/// Top-level error type exposed by `wirelink`.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The text could not be split into fragments.
    #[error("fragmentation failed: {0}")]
    Fragmentation(#[from] FragmentationError),
    /// A frame could not be encoded or decoded.
    #[error("frame codec error: {0}")]
    Frame(#[from] FrameError),
}

/// Canonical result alias used by `wirelink` public APIs.
pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_errors_convert_into_link_error() {
        let err: LinkError = ConfigError::ZeroAckTimeout.into();
        assert!(matches!(err, LinkError::Config(ConfigError::ZeroAckTimeout)));
        assert_eq!(
            err.to_string(),
            "invalid configuration: acknowledgment timeout must be non-zero"
        );

        let err: LinkError = FragmentationError::CodePointTooWide { offset: 2, cap: 3 }.into();
        assert!(matches!(err, LinkError::Fragmentation(_)));

        let err: LinkError = FrameError::BadMagic.into();
        assert!(matches!(err, LinkError::Frame(FrameError::BadMagic)));
    }
}

//! Link configuration.
//!
//! [`LinkConfig`] bounds fragment sizes, the acknowledgment timer, the
//! retransmission budget and the receiver's resource usage. Both ends of a
//! link must agree on `max_fragment_bytes`; the remaining settings are
//! local to each side.

use std::{num::NonZeroUsize, time::Duration};

use thiserror::Error;

use crate::frame::fragment_overhead;

/// Smallest fragment cap that can carry any UTF-8 code point.
pub const MIN_FRAGMENT_BYTES: usize = 4;

/// Default fragment payload cap in bytes.
pub const DEFAULT_MAX_FRAGMENT_BYTES: usize = 512;

/// Default wait for an acknowledgment before retransmitting.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(1_500);

/// Default number of retransmissions after the first send.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default cap on a reassembled message.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024;

/// Default lifetime of an idle partial message on the receiver.
pub const DEFAULT_REASSEMBLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised by [`LinkConfig::validate`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The fragment cap cannot hold a four-byte code point.
    #[error("fragment cap of {0} bytes is below the {MIN_FRAGMENT_BYTES}-byte minimum")]
    FragmentTooSmall(usize),
    /// The fragment cap cannot be described by the frame length field.
    #[error("fragment cap of {0} bytes exceeds the frame length field")]
    FragmentTooLarge(usize),
    /// A zero acknowledgment timeout would retransmit in a tight loop.
    #[error("acknowledgment timeout must be non-zero")]
    ZeroAckTimeout,
    /// A zero reassembly timeout would evict every partial message.
    #[error("reassembly timeout must be non-zero")]
    ZeroReassemblyTimeout,
    /// The frame ceiling leaves no room for data after the fragment header.
    #[error("frame ceiling of {ceiling} bytes cannot fit a {overhead}-byte header and data")]
    FrameBudgetTooSmall { ceiling: usize, overhead: usize },
}

/// Settings shared by the segmenter and the reassembler.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use wirelink::config::LinkConfig;
///
/// let config = LinkConfig::default()
///     .with_ack_timeout(Duration::from_secs(1))
///     .with_max_retries(3);
/// assert_eq!(config.max_fragment_bytes.get(), 512);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    /// Maximum number of text bytes carried by a single fragment. The
    /// encoded frame adds [`fragment_overhead`] bytes on top.
    pub max_fragment_bytes: NonZeroUsize,
    /// Wait for an acknowledgment before resending the current fragment.
    pub ack_timeout: Duration,
    /// Retransmissions allowed for one fragment after its first send.
    pub max_retries: u32,
    /// Hard cap on the reassembled message held by the receiver.
    pub max_message_bytes: NonZeroUsize,
    /// Idle time after which the receiver evicts a partial message.
    pub reassembly_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_fragment_bytes: non_zero(DEFAULT_MAX_FRAGMENT_BYTES),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            max_message_bytes: non_zero(DEFAULT_MAX_MESSAGE_BYTES),
            reassembly_timeout: DEFAULT_REASSEMBLY_TIMEOUT,
        }
    }
}

const fn non_zero(value: usize) -> NonZeroUsize {
    match NonZeroUsize::new(value) {
        Some(value) => value,
        None => panic!("default sizes are non-zero"),
    }
}

impl LinkConfig {
    /// Derive a configuration whose fragments, once framed, fit within a
    /// channel ceiling of `frame_ceiling` bytes. Other settings take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FrameBudgetTooSmall`] when the ceiling cannot
    /// fit the fragment header plus a minimum-size fragment.
    pub fn for_frame_budget(frame_ceiling: usize) -> Result<Self, ConfigError> {
        let overhead = fragment_overhead().get();
        let available = frame_ceiling
            .checked_sub(overhead)
            .filter(|available| *available >= MIN_FRAGMENT_BYTES)
            .ok_or(ConfigError::FrameBudgetTooSmall {
                ceiling: frame_ceiling,
                overhead,
            })?;
        let capped = available.min(usize::from(u16::MAX));
        let config = Self {
            max_fragment_bytes: NonZeroUsize::new(capped).ok_or(
                ConfigError::FrameBudgetTooSmall {
                    ceiling: frame_ceiling,
                    overhead,
                },
            )?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the fragment payload cap.
    #[must_use]
    pub fn with_max_fragment_bytes(mut self, bytes: NonZeroUsize) -> Self {
        self.max_fragment_bytes = bytes;
        self
    }

    /// Set the acknowledgment timeout.
    #[must_use]
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Set the retransmission budget.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the reassembled message cap.
    #[must_use]
    pub fn with_max_message_bytes(mut self, bytes: NonZeroUsize) -> Self {
        self.max_message_bytes = bytes;
        self
    }

    /// Set the partial message eviction timeout.
    #[must_use]
    pub fn with_reassembly_timeout(mut self, timeout: Duration) -> Self {
        self.reassembly_timeout = timeout;
        self
    }

    /// Size of the largest frame this configuration produces.
    #[must_use]
    pub fn encoded_fragment_ceiling(&self) -> usize {
        self.max_fragment_bytes.get() + fragment_overhead().get()
    }

    /// Check that the settings describe a usable link.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cap = self.max_fragment_bytes.get();
        if cap < MIN_FRAGMENT_BYTES {
            return Err(ConfigError::FragmentTooSmall(cap));
        }
        if cap > usize::from(u16::MAX) {
            return Err(ConfigError::FragmentTooLarge(cap));
        }
        if self.ack_timeout.is_zero() {
            return Err(ConfigError::ZeroAckTimeout);
        }
        if self.reassembly_timeout.is_zero() {
            return Err(ConfigError::ZeroReassemblyTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LinkConfig::default();
        assert_eq!(config.max_fragment_bytes.get(), DEFAULT_MAX_FRAGMENT_BYTES);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn frame_budget_leaves_room_for_header() {
        let config = LinkConfig::for_frame_budget(512).expect("512 bytes is enough");
        assert_eq!(config.encoded_fragment_ceiling(), 512);
        assert!(config.max_fragment_bytes.get() < 512);
    }

    #[rstest]
    #[case(0)]
    #[case(10)]
    fn tiny_frame_budget_is_rejected(#[case] ceiling: usize) {
        assert!(matches!(
            LinkConfig::for_frame_budget(ceiling),
            Err(ConfigError::FrameBudgetTooSmall { .. })
        ));
    }

    #[rstest]
    #[case(3, ConfigError::FragmentTooSmall(3))]
    #[case(70_000, ConfigError::FragmentTooLarge(70_000))]
    fn fragment_cap_bounds_are_enforced(#[case] cap: usize, #[case] expected: ConfigError) {
        let config =
            LinkConfig::default().with_max_fragment_bytes(NonZeroUsize::new(cap).expect("non-zero"));
        assert_eq!(config.validate(), Err(expected));
    }

    #[test]
    fn zero_ack_timeout_is_rejected() {
        let config = LinkConfig::default().with_ack_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroAckTimeout));
    }

    #[test]
    fn zero_reassembly_timeout_is_rejected() {
        let config = LinkConfig::default().with_reassembly_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroReassemblyTimeout));
    }
}

//! Send-side state for one in-flight message.
//!
//! [`SenderSession`] performs no I/O and keeps no clock. The
//! [`Segmenter`](crate::segmenter::Segmenter) transmits whatever
//! [`SenderSession::current`] returns, feeds acknowledgments into
//! [`SenderSession::on_ack`] and timer expiries into
//! [`SenderSession::on_timeout`].
//!
//! At most one fragment is outstanding: fragment `i + 1` becomes current
//! only once a cumulative acknowledgment covering `i` arrives.

use bytes::Bytes;

use crate::{
    fragment::{FragmentIndex, MessageId},
    frame::Acknowledgment,
};

/// Effect of an acknowledgment on the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckProgress {
    /// The window moved; `next` is the fragment to send now.
    Advanced { next: FragmentIndex },
    /// The final fragment was acknowledged.
    Delivered,
    /// The acknowledgment names another message or an index already passed.
    Stale,
}

/// Decision taken when the acknowledgment timer expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Resend the current fragment.
    Retransmit,
    /// The retry budget is spent; abandon the message.
    Exhausted,
}

/// Window-of-one sender state for a single message.
#[derive(Debug)]
pub struct SenderSession {
    message_id: MessageId,
    frames: Vec<Bytes>,
    next_unacked: usize,
    retry_count: u32,
    max_retries: u32,
}

impl SenderSession {
    /// Create a session over pre-encoded fragment frames.
    ///
    /// `frames[i]` must hold fragment `i`; the batch is never empty because
    /// even empty text produces one final fragment.
    #[must_use]
    pub fn new(message_id: MessageId, frames: Vec<Bytes>, max_retries: u32) -> Self {
        debug_assert!(!frames.is_empty(), "a message has at least one fragment");
        Self {
            message_id,
            frames,
            next_unacked: 0,
            retry_count: 0,
            max_retries,
        }
    }

    /// Return the message this session delivers.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Number of fragments in the message.
    #[must_use]
    pub fn total_fragments(&self) -> usize { self.frames.len() }

    /// Retransmissions spent on the current fragment.
    #[must_use]
    pub const fn retry_count(&self) -> u32 { self.retry_count }

    /// Return the outstanding fragment's index and encoded frame.
    ///
    /// Returns `None` once every fragment has been acknowledged.
    #[must_use]
    pub fn current(&self) -> Option<(FragmentIndex, &Bytes)> {
        let frame = self.frames.get(self.next_unacked)?;
        let index = FragmentIndex::try_from(self.next_unacked).ok()?;
        Some((index, frame))
    }

    /// Apply a cumulative acknowledgment.
    pub fn on_ack(&mut self, ack: Acknowledgment) -> AckProgress {
        if ack.message_id() != self.message_id {
            return AckProgress::Stale;
        }
        let Some((current, _)) = self.current() else {
            return AckProgress::Stale;
        };
        if !ack.covers(current) {
            return AckProgress::Stale;
        }

        let acked = ack.acked_through().get() as usize;
        if acked + 1 >= self.frames.len() {
            self.next_unacked = self.frames.len();
            return AckProgress::Delivered;
        }

        self.next_unacked = acked + 1;
        self.retry_count = 0;
        AckProgress::Advanced {
            next: FragmentIndex::try_from(self.next_unacked).unwrap_or(current),
        }
    }

    /// Charge one retransmission against the current fragment's budget.
    pub fn on_timeout(&mut self) -> RetryDecision {
        if self.retry_count >= self.max_retries {
            return RetryDecision::Exhausted;
        }
        self.retry_count += 1;
        RetryDecision::Retransmit
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn ack(message: u64, through: u32) -> Acknowledgment {
        Acknowledgment::new(MessageId::new(message), FragmentIndex::new(through))
    }

    #[fixture]
    fn session() -> SenderSession {
        let frames = vec![
            Bytes::from_static(b"f0"),
            Bytes::from_static(b"f1"),
            Bytes::from_static(b"f2"),
        ];
        SenderSession::new(MessageId::new(4), frames, 2)
    }

    #[rstest]
    fn acks_advance_one_fragment_at_a_time(mut session: SenderSession) {
        assert_eq!(
            session.current(),
            Some((FragmentIndex::zero(), &Bytes::from_static(b"f0")))
        );
        assert_eq!(
            session.on_ack(ack(4, 0)),
            AckProgress::Advanced {
                next: FragmentIndex::new(1)
            }
        );
        assert_eq!(
            session.on_ack(ack(4, 1)),
            AckProgress::Advanced {
                next: FragmentIndex::new(2)
            }
        );
        assert_eq!(session.on_ack(ack(4, 2)), AckProgress::Delivered);
        assert_eq!(session.current(), None);
    }

    #[rstest]
    fn cumulative_ack_skips_ahead(mut session: SenderSession) {
        assert_eq!(session.on_ack(ack(4, 2)), AckProgress::Delivered);
    }

    #[rstest]
    #[case(ack(5, 0))]
    #[case(ack(3, 2))]
    fn foreign_acks_are_stale(mut session: SenderSession, #[case] foreign: Acknowledgment) {
        assert_eq!(session.on_ack(foreign), AckProgress::Stale);
        assert_eq!(session.current().map(|(index, _)| index), Some(FragmentIndex::zero()));
    }

    #[rstest]
    fn duplicate_ack_is_stale(mut session: SenderSession) {
        session.on_ack(ack(4, 0));
        assert_eq!(session.on_ack(ack(4, 0)), AckProgress::Stale);
        assert_eq!(
            session.current().map(|(index, _)| index),
            Some(FragmentIndex::new(1))
        );
    }

    #[rstest]
    fn retry_budget_is_bounded(mut session: SenderSession) {
        assert_eq!(session.on_timeout(), RetryDecision::Retransmit);
        assert_eq!(session.on_timeout(), RetryDecision::Retransmit);
        assert_eq!(session.on_timeout(), RetryDecision::Exhausted);
        assert_eq!(session.retry_count(), 2);
    }

    #[rstest]
    fn progress_resets_retry_budget(mut session: SenderSession) {
        session.on_timeout();
        session.on_timeout();
        session.on_ack(ack(4, 0));
        assert_eq!(session.retry_count(), 0);
        assert_eq!(session.on_timeout(), RetryDecision::Retransmit);
    }
}

//! Sender side of the link.
//!
//! [`Segmenter`] splits a text message into fragments, sends them one at a
//! time over a [`Channel`], and waits for a cumulative acknowledgment
//! before moving on. A fragment whose acknowledgment does not arrive within
//! `ack_timeout` is resent, up to `max_retries` times, after which the
//! message is abandoned with [`FailureReason::Timeout`].
//!
//! The driver suspends only while waiting for the next acknowledgment, the
//! retransmission timer, or an abort request. Delivery takes `&mut self`,
//! so at most one [`SenderSession`] exists per segmenter.

use std::collections::BTreeSet;

use bytes::Bytes;
use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};

use crate::{
    channel::{Channel, ChannelError},
    config::LinkConfig,
    error::Result,
    fragment::{FragmentIndex, Fragmenter, MessageId},
    frame::{Frame, decode_frame, encode_fragment},
    metrics::{self, FrameKind, Side},
    outcome::{DeliveryOutcome, FailureReason},
};

pub mod session;

pub use session::{AckProgress, RetryDecision, SenderSession};

/// A message that has been fragmented and encoded but not yet delivered.
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    message_id: MessageId,
    frames: Vec<Bytes>,
    payload_len: usize,
}

impl OutboundMessage {
    /// Identifier to pass to [`AbortHandle::abort`].
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Number of fragments the message was split into.
    #[must_use]
    pub fn total_fragments(&self) -> usize { self.frames.len() }

    /// Length of the text in bytes.
    #[must_use]
    pub const fn payload_len(&self) -> usize { self.payload_len }
}

/// Cloneable handle that cancels deliveries from any task.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: mpsc::UnboundedSender<MessageId>,
}

impl AbortHandle {
    /// Request that `message_id` be abandoned with
    /// [`FailureReason::Cancelled`].
    ///
    /// Aborting a message that already reached a terminal outcome has no
    /// effect. A message that is staged but not yet delivering is cancelled
    /// as soon as delivery starts.
    pub fn abort(&self, message_id: MessageId) {
        if self.tx.send(message_id).is_err() {
            debug!(%message_id, "abort requested after segmenter shut down");
        }
    }
}

enum WaitResult {
    Advanced(FragmentIndex),
    Delivered,
    TimedOut,
    Cancelled,
}

/// Sender-side protocol driver.
#[derive(Debug)]
pub struct Segmenter<C> {
    channel: C,
    inbound: mpsc::Receiver<Bytes>,
    inbound_open: bool,
    config: LinkConfig,
    fragmenter: Fragmenter,
    abort_tx: mpsc::UnboundedSender<MessageId>,
    abort_rx: mpsc::UnboundedReceiver<MessageId>,
    pending_aborts: BTreeSet<MessageId>,
}

impl<C: Channel> Segmenter<C> {
    /// Create a segmenter that transmits on `channel` and reads
    /// acknowledgments from `inbound`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`](crate::error::LinkError::Config) when
    /// `config` fails validation.
    pub fn new(channel: C, inbound: mpsc::Receiver<Bytes>, config: LinkConfig) -> Result<Self> {
        config.validate()?;
        let (abort_tx, abort_rx) = mpsc::unbounded_channel();
        Ok(Self {
            channel,
            inbound,
            inbound_open: true,
            config,
            fragmenter: Fragmenter::new(config.max_fragment_bytes),
            abort_tx,
            abort_rx,
            pending_aborts: BTreeSet::new(),
        })
    }

    /// Return the configuration in use.
    #[must_use]
    pub const fn config(&self) -> &LinkConfig { &self.config }

    /// Return a handle for cancelling deliveries.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: self.abort_tx.clone(),
        }
    }

    /// Fragment and encode `text`, assigning it the next [`MessageId`].
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`](crate::error::LinkError) if the text cannot be
    /// fragmented or a fragment cannot be encoded.
    pub fn stage(&self, text: &str) -> Result<OutboundMessage> {
        let batch = self.fragmenter.fragment_text(text)?;
        let message_id = batch.message_id();
        let frames = batch
            .into_iter()
            .map(|fragment| encode_fragment(fragment.header(), fragment.payload()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(
            %message_id,
            bytes = text.len(),
            fragments = frames.len(),
            "staged message"
        );
        Ok(OutboundMessage {
            message_id,
            frames,
            payload_len: text.len(),
        })
    }

    /// Deliver `text` and wait for the terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`](crate::error::LinkError) only when staging
    /// fails; delivery problems are reported through the outcome.
    pub async fn send(&mut self, text: &str) -> Result<DeliveryOutcome> {
        let message = self.stage(text)?;
        Ok(self.deliver(message).await)
    }

    /// Drive a staged message to a terminal outcome.
    pub async fn deliver(&mut self, message: OutboundMessage) -> DeliveryOutcome {
        let message_id = message.message_id;
        self.collect_aborts(message_id);
        if self.pending_aborts.remove(&message_id) {
            return finish(message_id, Some(FailureReason::Cancelled));
        }

        let mut session = SenderSession::new(message_id, message.frames, self.config.max_retries);
        let mut first_attempt = true;
        loop {
            let Some((index, frame)) = session.current() else {
                return finish(message_id, None);
            };
            let frame = frame.clone();

            if !first_attempt {
                metrics::inc_retransmissions();
                debug!(%message_id, %index, retry = session.retry_count(), "retransmitting fragment");
            }
            let charged = match self.transmit(&mut session, index, frame) {
                Ok(charged) => charged,
                Err(reason) => return finish(message_id, Some(reason)),
            };

            let deadline = Instant::now() + self.config.ack_timeout;
            match self.await_ack(&mut session, deadline).await {
                WaitResult::Delivered => return finish(message_id, None),
                WaitResult::Advanced(next) => {
                    debug!(%message_id, %next, "fragment acknowledged");
                    first_attempt = true;
                }
                WaitResult::Cancelled => {
                    return finish(message_id, Some(FailureReason::Cancelled));
                }
                WaitResult::TimedOut if charged => first_attempt = false,
                WaitResult::TimedOut => match session.on_timeout() {
                    RetryDecision::Retransmit => first_attempt = false,
                    RetryDecision::Exhausted => {
                        return finish(message_id, Some(FailureReason::Timeout));
                    }
                },
            }
        }
    }

    /// Hand one fragment to the channel.
    ///
    /// Returns whether a retry was already charged for this attempt. A
    /// transient channel failure counts as an immediate timeout; a permanent
    /// one ends the delivery.
    fn transmit(
        &self,
        session: &mut SenderSession,
        index: FragmentIndex,
        frame: Bytes,
    ) -> std::result::Result<bool, FailureReason> {
        let message_id = session.message_id();
        match self.channel.transmit(frame) {
            Ok(()) => {
                metrics::inc_frames_sent(FrameKind::Fragment);
                Ok(false)
            }
            Err(ChannelError::Unavailable) => {
                warn!(%message_id, %index, "channel unavailable; counting as timeout");
                match session.on_timeout() {
                    RetryDecision::Retransmit => Ok(true),
                    RetryDecision::Exhausted => Err(FailureReason::ChannelUnavailable),
                }
            }
            Err(err) => {
                warn!(%message_id, %index, error = %err, "channel refused fragment");
                Err(FailureReason::ChannelUnavailable)
            }
        }
    }

    async fn await_ack(&mut self, session: &mut SenderSession, deadline: Instant) -> WaitResult {
        let message_id = session.message_id();
        loop {
            tokio::select! {
                biased;

                Some(aborted) = self.abort_rx.recv() => {
                    if aborted == message_id {
                        return WaitResult::Cancelled;
                    }
                    self.remember_abort(message_id, aborted);
                }

                frame = self.inbound.recv(), if self.inbound_open => {
                    let Some(frame) = frame else {
                        warn!(%message_id, "acknowledgment stream closed");
                        self.inbound_open = false;
                        continue;
                    };
                    match decode_frame(&frame) {
                        Ok(Frame::Ack(ack)) => match session.on_ack(ack) {
                            AckProgress::Delivered => return WaitResult::Delivered,
                            AckProgress::Advanced { next } => return WaitResult::Advanced(next),
                            AckProgress::Stale => {
                                debug!(
                                    %message_id,
                                    ack_message = %ack.message_id(),
                                    acked_through = %ack.acked_through(),
                                    "ignoring stale acknowledgment"
                                );
                            }
                        },
                        Ok(Frame::Fragment(fragment)) => {
                            debug!(
                                %message_id,
                                foreign = %fragment.header().message_id(),
                                "ignoring fragment on the acknowledgment channel"
                            );
                        }
                        Err(err) => warn!(%message_id, error = %err, "dropping undecodable frame"),
                    }
                }

                () = sleep_until(deadline) => return WaitResult::TimedOut,
            }
        }
    }

    fn collect_aborts(&mut self, active: MessageId) {
        while let Ok(aborted) = self.abort_rx.try_recv() {
            self.remember_abort(active, aborted);
        }
    }

    /// Keep aborts aimed at the active or a later message; older ids are
    /// already terminal.
    fn remember_abort(&mut self, active: MessageId, aborted: MessageId) {
        if aborted >= active {
            self.pending_aborts.insert(aborted);
        } else {
            debug!(%aborted, %active, "ignoring abort for finished message");
        }
        self.pending_aborts.retain(|id| *id >= active);
    }
}

fn finish(message_id: MessageId, failure: Option<FailureReason>) -> DeliveryOutcome {
    match failure {
        None => {
            metrics::inc_delivered(Side::Sender);
            info!(%message_id, "message delivered");
            DeliveryOutcome::Delivered(message_id)
        }
        Some(reason) => {
            metrics::inc_failed(Side::Sender, reason);
            warn!(%message_id, %reason, "message abandoned");
            DeliveryOutcome::Failed(message_id, reason)
        }
    }
}

#[cfg(test)]
mod tests;

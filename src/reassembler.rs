//! Receiver side of the link.
//!
//! [`Reassembler`] consumes fragments as the channel adapter delivers them,
//! appends contiguous data to a single buffer, and answers every fragment
//! with a cumulative acknowledgment. Duplicates are re-acknowledged without
//! being appended, fragments past a gap are dropped and answered with the
//! last contiguous index, and the finished text reaches the
//! [`DeliveryHandler`] exactly once.
//!
//! Only one message is buffered at a time. A fragment carrying any other
//! [`MessageId`] abandons whatever partial message is held and starts a new
//! one, so a sender that restarts its identifier sequence is accepted
//! without a [`Reassembler::reset`].

use std::time::{Duration, Instant};

use bytes::Bytes;
use log::{debug, warn};
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

use crate::{
    channel::Channel,
    config::LinkConfig,
    error::Result,
    fragment::{FragmentError, FragmentFrame, FragmentIndex, FragmentSeries, FragmentStatus, MessageId},
    frame::{Acknowledgment, Frame, decode_frame, encode_ack},
    metrics::{self, FrameKind, Side},
    outcome::FailureReason,
};

pub mod handler;

pub use handler::{Delivery, DeliveryHandler};

/// Bytes and ordering state for the message currently being received.
#[derive(Debug)]
struct ReceiverBuffer {
    series: FragmentSeries,
    data: Vec<u8>,
    last_activity: Instant,
}

impl ReceiverBuffer {
    fn new(message_id: MessageId, now: Instant) -> Self {
        Self {
            series: FragmentSeries::new(message_id),
            data: Vec::new(),
            last_activity: now,
        }
    }

    fn message_id(&self) -> MessageId { self.series.message_id() }
}

/// The fragment that drove the most recent message to a terminal state.
///
/// Only a byte-identical copy counts as a retransmission of it; any other
/// fragment, even one reusing the identifier, starts a new message.
#[derive(Debug)]
struct Terminal {
    fragment: FragmentFrame,
    acknowledged: bool,
}

/// Receiver-side protocol state machine.
#[derive(Debug)]
pub struct Reassembler<C, H> {
    channel: C,
    handler: H,
    max_message_bytes: usize,
    reassembly_timeout: Duration,
    buffer: Option<ReceiverBuffer>,
    terminal: Option<Terminal>,
}

impl<C: Channel, H: DeliveryHandler> Reassembler<C, H> {
    /// Create a reassembler that acknowledges over `channel` and reports to
    /// `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`](crate::error::LinkError::Config) when
    /// `config` fails validation.
    pub fn new(channel: C, handler: H, config: LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            channel,
            handler,
            max_message_bytes: config.max_message_bytes.get(),
            reassembly_timeout: config.reassembly_timeout,
            buffer: None,
            terminal: None,
        })
    }

    /// Borrow the delivery handler.
    #[must_use]
    pub fn handler(&self) -> &H { &self.handler }

    /// Consume the reassembler, returning the delivery handler.
    #[must_use]
    pub fn into_handler(self) -> H { self.handler }

    /// Identifier of the partially received message, if any.
    #[must_use]
    pub fn in_flight(&self) -> Option<MessageId> {
        self.buffer.as_ref().map(ReceiverBuffer::message_id)
    }

    /// Bytes held for the partially received message.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.buffer.as_ref().map_or(0, |buf| buf.data.len()) }

    /// Process one raw frame from the channel adapter.
    pub fn on_frame(&mut self, frame: &Bytes) { self.on_frame_at(frame, Instant::now()); }

    /// Process one raw frame using an explicit clock reading.
    pub fn on_frame_at(&mut self, frame: &Bytes, now: Instant) {
        match decode_frame(frame) {
            Ok(Frame::Fragment(fragment)) => self.on_fragment_at(fragment, now),
            Ok(Frame::Ack(ack)) => {
                debug!("ignoring acknowledgment for {} on the fragment channel", ack.message_id());
            }
            Err(err) => warn!("dropping undecodable frame: {err}"),
        }
    }

    /// Process one decoded fragment.
    pub fn on_fragment(&mut self, fragment: FragmentFrame) {
        self.on_fragment_at(fragment, Instant::now());
    }

    /// Process one decoded fragment using an explicit clock reading.
    ///
    /// Accepting an explicit `now` keeps eviction deterministic in tests.
    pub fn on_fragment_at(&mut self, fragment: FragmentFrame, now: Instant) {
        let repeated = self
            .terminal
            .as_ref()
            .filter(|terminal| terminal.fragment == fragment)
            .map(|terminal| terminal.acknowledged);
        if let Some(acknowledged) = repeated {
            let header = *fragment.header();
            if acknowledged {
                debug!("re-acknowledging completed message {}", header.message_id());
                self.send_ack(header.message_id(), header.fragment_index());
            } else {
                debug!("ignoring retransmission of abandoned message {}", header.message_id());
            }
            return;
        }

        let (header, data) = fragment.into_parts();
        let message_id = header.message_id();

        match self.in_flight() {
            Some(current) if current != message_id => {
                warn!("message {message_id} supersedes incomplete message {current}");
                self.buffer = None;
            }
            Some(_) => {}
            None => self.terminal = None,
        }

        let buffer = self
            .buffer
            .get_or_insert_with(|| ReceiverBuffer::new(message_id, now));
        match buffer.series.accept(header) {
            Ok(FragmentStatus::Duplicate) => {
                debug!(
                    "duplicate fragment {} of message {message_id}",
                    header.fragment_index()
                );
                self.resync(message_id);
            }
            Ok(status @ (FragmentStatus::Incomplete | FragmentStatus::Complete)) => {
                let attempted = buffer.data.len().saturating_add(data.len());
                if attempted > self.max_message_bytes {
                    warn!(
                        "message {message_id} exceeds the {}-byte cap ({attempted} bytes)",
                        self.max_message_bytes
                    );
                    self.abandon(
                        message_id,
                        Some(FragmentFrame::new(header, data)),
                        FailureReason::Malformed,
                    );
                    return;
                }
                buffer.data.extend_from_slice(&data);
                buffer.last_activity = now;
                self.send_ack(message_id, header.fragment_index());
                if status == FragmentStatus::Complete {
                    self.finalize(FragmentFrame::new(header, data));
                }
            }
            Err(err @ (FragmentError::IndexMismatch { .. } | FragmentError::TotalMismatch { .. })) => {
                warn!("protocol violation in message {message_id}: {err}");
                self.resync(message_id);
            }
            Err(err) => {
                warn!("dropping fragment of message {message_id}: {err}");
                self.resync(message_id);
            }
        }
    }

    /// Re-acknowledge the last contiguous index of the buffered message. A
    /// buffer that never accepted a fragment is discarded instead.
    fn resync(&mut self, message_id: MessageId) {
        let acked = self
            .buffer
            .as_ref()
            .filter(|buf| buf.message_id() == message_id)
            .map(|buf| buf.series.acked_through());
        match acked {
            Some(Some(index)) => self.send_ack(message_id, index),
            Some(None) => {
                debug!("no contiguous prefix yet for message {message_id}");
                self.buffer = None;
            }
            None => {}
        }
    }

    /// Evict the partial message if it has been idle for longer than the
    /// reassembly timeout, reporting [`FailureReason::Timeout`].
    ///
    /// Returns the evicted identifier.
    pub fn purge_expired(&mut self) -> Option<MessageId> { self.purge_expired_at(Instant::now()) }

    /// Evict an idle partial message using an explicit clock reading.
    pub fn purge_expired_at(&mut self, now: Instant) -> Option<MessageId> {
        let buffer = self.buffer.as_ref()?;
        if now.saturating_duration_since(buffer.last_activity) < self.reassembly_timeout {
            return None;
        }
        let message_id = buffer.message_id();
        warn!("evicting idle partial message {message_id}");
        self.abandon(message_id, None, FailureReason::Timeout);
        Some(message_id)
    }

    /// Discard all receive state, including the memory of the last completed
    /// message.
    ///
    /// Returns the identifier of a discarded partial message.
    pub fn reset(&mut self) -> Option<MessageId> {
        self.terminal = None;
        let discarded = self.buffer.take().map(|buf| buf.message_id());
        if let Some(message_id) = discarded {
            debug!("reset discarded partial message {message_id}");
        }
        discarded
    }

    /// Pump frames from `inbound` until it closes or `shutdown` fires,
    /// evicting idle partial messages along the way.
    pub async fn run(&mut self, mut inbound: mpsc::Receiver<Bytes>, shutdown: CancellationToken) {
        let mut sweep = interval(self.reassembly_timeout);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    tracing::debug!("reassembler shutting down");
                    break;
                }

                frame = inbound.recv() => {
                    let Some(frame) = frame else {
                        tracing::debug!("fragment stream closed");
                        break;
                    };
                    self.on_frame_at(&frame, tokio::time::Instant::now().into_std());
                }

                _ = sweep.tick() => {
                    if let Some(message_id) =
                        self.purge_expired_at(tokio::time::Instant::now().into_std())
                    {
                        tracing::info!(%message_id, "evicted idle partial message");
                    }
                }
            }
        }
    }

    fn finalize(&mut self, last: FragmentFrame) {
        let Some(buffer) = self.buffer.take() else {
            return;
        };
        let message_id = buffer.message_id();
        self.terminal = Some(Terminal {
            fragment: last,
            acknowledged: true,
        });

        match String::from_utf8(buffer.data) {
            Ok(text) => {
                debug!("message {message_id} complete ({} bytes)", text.len());
                metrics::inc_delivered(Side::Receiver);
                self.handler.on_complete(message_id, text);
            }
            Err(err) => {
                warn!("message {message_id} is not valid UTF-8: {err}");
                metrics::inc_failed(Side::Receiver, FailureReason::Malformed);
                self.handler.on_error(message_id, FailureReason::Malformed);
            }
        }
    }

    /// Drop the partial message. `cause` is the fragment that triggered the
    /// failure, if any; later copies of it are ignored.
    fn abandon(&mut self, message_id: MessageId, cause: Option<FragmentFrame>, reason: FailureReason) {
        self.buffer = None;
        self.terminal = cause.map(|fragment| Terminal {
            fragment,
            acknowledged: false,
        });
        metrics::inc_failed(Side::Receiver, reason);
        self.handler.on_error(message_id, reason);
    }

    fn send_ack(&self, message_id: MessageId, acked_through: FragmentIndex) {
        let ack = Acknowledgment::new(message_id, acked_through);
        let frame = match encode_ack(ack) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("failed to encode acknowledgment: {err}");
                return;
            }
        };
        match self.channel.transmit(frame) {
            Ok(()) => metrics::inc_frames_sent(FrameKind::Ack),
            Err(err) => warn!("failed to send acknowledgment for {message_id}: {err}"),
        }
    }
}

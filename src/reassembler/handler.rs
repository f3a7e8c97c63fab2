//! Consumer-facing callbacks fired by the reassembler.

use tokio::sync::mpsc;

use crate::{fragment::MessageId, outcome::FailureReason};

/// Receives the terminal result of each inbound message.
///
/// `on_complete` fires at most once per message. `on_error` reports a
/// partial message that was evicted or whose bytes turned out unusable; a
/// partial message superseded by a newer identifier is dropped silently,
/// since the sender has already given up on it.
pub trait DeliveryHandler {
    /// A message was reassembled in full.
    fn on_complete(&mut self, message_id: MessageId, text: String);

    /// A message was abandoned.
    fn on_error(&mut self, message_id: MessageId, reason: FailureReason);
}

/// Terminal event for an inbound message, as recorded by the provided
/// handler implementations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The message arrived in full.
    Complete { message_id: MessageId, text: String },
    /// The message was abandoned.
    Failed {
        message_id: MessageId,
        reason: FailureReason,
    },
}

impl DeliveryHandler for Vec<Delivery> {
    fn on_complete(&mut self, message_id: MessageId, text: String) {
        self.push(Delivery::Complete { message_id, text });
    }

    fn on_error(&mut self, message_id: MessageId, reason: FailureReason) {
        self.push(Delivery::Failed { message_id, reason });
    }
}

/// Forwards events to another task. Events are discarded once the
/// receiving half is gone.
impl DeliveryHandler for mpsc::UnboundedSender<Delivery> {
    fn on_complete(&mut self, message_id: MessageId, text: String) {
        if self.send(Delivery::Complete { message_id, text }).is_err() {
            log::debug!("delivery listener gone; dropping completion of {message_id}");
        }
    }

    fn on_error(&mut self, message_id: MessageId, reason: FailureReason) {
        if self.send(Delivery::Failed { message_id, reason }).is_err() {
            log::debug!("delivery listener gone; dropping failure of {message_id}");
        }
    }
}

impl<H: DeliveryHandler + ?Sized> DeliveryHandler for &mut H {
    fn on_complete(&mut self, message_id: MessageId, text: String) {
        (**self).on_complete(message_id, text);
    }

    fn on_error(&mut self, message_id: MessageId, reason: FailureReason) {
        (**self).on_error(message_id, reason);
    }
}

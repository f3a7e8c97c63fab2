//! In-memory duplex link with configurable frame loss.
//!
//! Each direction is a bounded `tokio` channel, mirroring the watch's
//! single fixed-size inbox. A drop filter decides per frame whether the
//! "radio" loses it, which lets tests and the demo binary reproduce lost
//! fragments and lost acknowledgments deterministically.

use std::{
    fmt,
    sync::{
        Arc,
        Mutex,
        PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::{Channel, ChannelError};

type DropFilter = Box<dyn FnMut(&Bytes) -> bool + Send>;

/// Outbound half of an in-memory link.
#[derive(Clone)]
pub struct MemoryChannel {
    tx: mpsc::Sender<Bytes>,
    max_frame_len: usize,
    drop_filter: Arc<Mutex<Option<DropFilter>>>,
    transmitted: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl fmt::Debug for MemoryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryChannel")
            .field("max_frame_len", &self.max_frame_len)
            .field("transmitted", &self.transmitted())
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}

impl MemoryChannel {
    /// Install a filter consulted for every accepted frame; returning `true`
    /// silently drops the frame.
    pub fn set_drop_filter(&self, filter: impl FnMut(&Bytes) -> bool + Send + 'static) {
        *self
            .drop_filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(filter));
    }

    /// Remove any installed drop filter.
    pub fn clear_drop_filter(&self) {
        *self
            .drop_filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Drop every `n`th frame handed to this channel. `n == 0` disables loss.
    pub fn drop_every(&self, n: usize) {
        if n == 0 {
            self.clear_drop_filter();
            return;
        }
        let mut seen = 0usize;
        self.set_drop_filter(move |_| {
            seen += 1;
            seen % n == 0
        });
    }

    /// Number of frames `transmit` accepted, including those the drop filter
    /// then discarded.
    #[must_use]
    pub fn transmitted(&self) -> usize { self.transmitted.load(Ordering::Relaxed) }

    /// Number of frames the drop filter discarded.
    #[must_use]
    pub fn dropped(&self) -> usize { self.dropped.load(Ordering::Relaxed) }

    fn should_drop(&self, frame: &Bytes) -> bool {
        let mut guard = self
            .drop_filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.as_mut().is_some_and(|filter| filter(frame))
    }
}

impl Channel for MemoryChannel {
    fn transmit(&self, frame: Bytes) -> Result<(), ChannelError> {
        if frame.len() > self.max_frame_len {
            return Err(ChannelError::FrameTooLarge {
                len: frame.len(),
                limit: self.max_frame_len,
            });
        }
        if self.tx.is_closed() {
            return Err(ChannelError::Closed);
        }

        if self.should_drop(&frame) {
            self.transmitted.fetch_add(1, Ordering::Relaxed);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        self.tx.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => ChannelError::Unavailable,
            TrySendError::Closed(_) => ChannelError::Closed,
        })?;
        self.transmitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// One endpoint of an in-memory link: the channel to the peer and the
/// stream of frames the peer sent here.
#[derive(Debug)]
pub struct LinkEnd {
    /// Outbound half towards the peer.
    pub channel: MemoryChannel,
    /// Frames received from the peer.
    pub inbound: mpsc::Receiver<Bytes>,
}

/// Create a connected pair of link endpoints.
///
/// `capacity` bounds each direction's inbox; `max_frame_len` is the
/// channel's per-frame ceiling.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn memory_link(capacity: usize, max_frame_len: usize) -> (LinkEnd, LinkEnd) {
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);
    let end = |tx: mpsc::Sender<Bytes>, inbound: mpsc::Receiver<Bytes>| LinkEnd {
        channel: MemoryChannel {
            tx,
            max_frame_len,
            drop_filter: Arc::new(Mutex::new(None)),
            transmitted: Arc::new(AtomicUsize::new(0)),
            dropped: Arc::new(AtomicUsize::new(0)),
        },
        inbound,
    };
    (end(a_tx, a_rx), end(b_tx, b_rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_cross_the_link() {
        let (a, mut b) = memory_link(4, 64);
        a.channel
            .transmit(Bytes::from_static(b"ping"))
            .expect("transmit");
        assert_eq!(b.inbound.recv().await, Some(Bytes::from_static(b"ping")));
        assert_eq!(a.channel.transmitted(), 1);
    }

    #[test]
    fn oversized_frames_are_refused() {
        let (a, _b) = memory_link(4, 3);
        assert_eq!(
            a.channel.transmit(Bytes::from_static(b"four")),
            Err(ChannelError::FrameTooLarge { len: 4, limit: 3 })
        );
        assert_eq!(a.channel.transmitted(), 0);
    }

    #[test]
    fn full_inbox_reports_unavailable() {
        let (a, _b) = memory_link(1, 64);
        a.channel
            .transmit(Bytes::from_static(b"one"))
            .expect("first frame fits");
        assert_eq!(
            a.channel.transmit(Bytes::from_static(b"two")),
            Err(ChannelError::Unavailable)
        );
        assert_eq!(a.channel.transmitted(), 1);
    }

    #[test]
    fn closed_peer_reports_closed() {
        let (a, b) = memory_link(1, 64);
        drop(b);
        assert_eq!(
            a.channel.transmit(Bytes::from_static(b"one")),
            Err(ChannelError::Closed)
        );
    }

    #[tokio::test]
    async fn drop_every_discards_selected_frames() {
        let (a, mut b) = memory_link(8, 64);
        a.channel.drop_every(2);
        for frame in [b"1", b"2", b"3", b"4"] {
            a.channel
                .transmit(Bytes::from_static(frame))
                .expect("transmit");
        }
        assert_eq!(a.channel.dropped(), 2);
        assert_eq!(b.inbound.recv().await, Some(Bytes::from_static(b"1")));
        assert_eq!(b.inbound.recv().await, Some(Bytes::from_static(b"3")));
        assert!(b.inbound.try_recv().is_err());
    }
}

//! Tests for the sender-side driver against scripted peers.

use std::{num::NonZeroUsize, time::Duration};

use rstest::{fixture, rstest};
use tokio::{task::JoinHandle, time::sleep};
use tracing_test::traced_test;

use super::*;
use crate::{
    channel::{LinkEnd, MemoryChannel, memory_link},
    frame::{Acknowledgment, encode_ack},
};

const ACK_TIMEOUT: Duration = Duration::from_millis(200);

#[fixture]
fn config() -> LinkConfig {
    LinkConfig::default()
        .with_max_fragment_bytes(NonZeroUsize::new(4).expect("non-zero"))
        .with_ack_timeout(ACK_TIMEOUT)
        .with_max_retries(3)
}

fn segmenter(end: LinkEnd, config: LinkConfig) -> Segmenter<MemoryChannel> {
    Segmenter::new(end.channel, end.inbound, config).expect("valid config")
}

/// Acknowledge every fragment the peer receives, counting them.
fn spawn_acker(mut peer: LinkEnd) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut seen = 0usize;
        while let Some(frame) = peer.inbound.recv().await {
            seen += 1;
            if let Ok(Frame::Fragment(fragment)) = decode_frame(&frame) {
                let header = fragment.header();
                let ack = Acknowledgment::new(header.message_id(), header.fragment_index());
                peer.channel
                    .transmit(encode_ack(ack).expect("encode ack"))
                    .expect("ack fits");
            }
        }
        seen
    })
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn delivers_when_every_fragment_is_acknowledged(config: LinkConfig) {
    let (local, peer) = memory_link(16, 64);
    let mut segmenter = segmenter(local, config);
    let acker = spawn_acker(peer);

    let outcome = segmenter.send("hello world").await.expect("stage");
    assert_eq!(outcome, DeliveryOutcome::Delivered(MessageId::new(0)));

    drop(segmenter);
    assert_eq!(acker.await.expect("acker"), 3);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn gives_up_after_retry_budget(config: LinkConfig) {
    let (local, mut peer) = memory_link(16, 64);
    let mut segmenter = segmenter(local, config);

    let started = Instant::now();
    let outcome = segmenter.send("silence").await.expect("stage");

    assert_eq!(outcome.failure(), Some(FailureReason::Timeout));
    let mut copies = 0;
    while let Ok(frame) = peer.inbound.try_recv() {
        let Ok(Frame::Fragment(fragment)) = decode_frame(&frame) else {
            panic!("expected only fragments");
        };
        assert_eq!(fragment.header().fragment_index(), FragmentIndex::zero());
        copies += 1;
    }
    assert_eq!(copies, config.max_retries + 1);
    assert_eq!(started.elapsed(), ACK_TIMEOUT * (config.max_retries + 1));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stale_acknowledgments_are_ignored(config: LinkConfig) {
    let (local, peer) = memory_link(16, 64);
    let mut segmenter = segmenter(local, config);
    peer.channel
        .transmit(
            encode_ack(Acknowledgment::new(MessageId::new(99), FragmentIndex::new(5)))
                .expect("encode"),
        )
        .expect("queue stale ack");
    peer.channel
        .transmit(Bytes::from_static(b"noise"))
        .expect("queue noise");
    let _acker = spawn_acker(peer);

    let outcome = segmenter.send("abcdefgh").await.expect("stage");
    assert!(outcome.is_delivered());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn abort_cancels_in_flight_delivery(config: LinkConfig) {
    let (local, _peer) = memory_link(16, 64);
    let mut segmenter = segmenter(local, config);
    let handle = segmenter.abort_handle();
    let message = segmenter.stage("never acknowledged").expect("stage");
    let id = message.message_id();

    let (outcome, ()) = tokio::join!(segmenter.deliver(message), async {
        sleep(ACK_TIMEOUT / 2).await;
        handle.abort(id);
    });

    assert_eq!(outcome, DeliveryOutcome::Failed(id, FailureReason::Cancelled));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn abort_before_delivery_sends_nothing(config: LinkConfig) {
    let (local, mut peer) = memory_link(16, 64);
    let mut segmenter = segmenter(local, config);
    let message = segmenter.stage("queued").expect("stage");
    segmenter.abort_handle().abort(message.message_id());

    let outcome = segmenter.deliver(message).await;

    assert_eq!(outcome.failure(), Some(FailureReason::Cancelled));
    assert!(peer.inbound.try_recv().is_err());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn abort_of_finished_message_does_not_leak(config: LinkConfig) {
    let (local, peer) = memory_link(16, 64);
    let mut segmenter = segmenter(local, config);
    let _acker = spawn_acker(peer);

    let first = segmenter.send("one").await.expect("stage");
    segmenter.abort_handle().abort(first.message_id());
    let second = segmenter.send("two").await.expect("stage");

    assert!(first.is_delivered());
    assert!(second.is_delivered());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn busy_channel_spends_the_retry_budget(config: LinkConfig) {
    // One-slot inbox that is never drained: the first copy fits, every
    // retransmission finds the inbox full.
    let (local, peer) = memory_link(1, 64);
    let mut segmenter = segmenter(local, config);

    let outcome = segmenter.send("busy").await.expect("stage");

    assert_eq!(outcome.failure(), Some(FailureReason::ChannelUnavailable));
    drop(peer);
}

#[rstest]
#[traced_test]
#[tokio::test(start_paused = true)]
async fn exhausted_budget_is_logged(config: LinkConfig) {
    let (local, _peer) = memory_link(16, 64);
    let mut segmenter = segmenter(local, config);

    let outcome = segmenter.send("unheard").await.expect("stage");

    assert_eq!(outcome.failure(), Some(FailureReason::Timeout));
    assert!(logs_contain("retransmitting fragment"));
    assert!(logs_contain("message abandoned"));
    assert!(logs_contain("reason=timed out"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn closed_channel_fails_immediately(config: LinkConfig) {
    let (local, peer) = memory_link(4, 64);
    drop(peer);
    let mut segmenter = segmenter(local, config);

    let started = Instant::now();
    let outcome = segmenter.send("gone").await.expect("stage");

    assert_eq!(outcome.failure(), Some(FailureReason::ChannelUnavailable));
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[rstest]
fn invalid_config_is_rejected(config: LinkConfig) {
    let (local, _peer) = memory_link(4, 64);
    let err = Segmenter::new(
        local.channel,
        local.inbound,
        config.with_ack_timeout(Duration::ZERO),
    )
    .expect_err("zero timeout must be rejected");
    assert!(matches!(err, crate::error::LinkError::Config(_)));
}

//! Tests for outbound text fragmentation and fragment batch helpers.

use std::num::NonZeroUsize;

use proptest::prelude::*;
use rstest::rstest;

use crate::fragment::{FragmentBatch, FragmentIndex, FragmentationError, Fragmenter, MessageId};

fn fragmenter(cap: usize) -> Fragmenter {
    Fragmenter::new(NonZeroUsize::new(cap).expect("non-zero"))
}

fn assert_fragment(batch: &FragmentBatch, index: usize, payload: &[u8], is_last: bool) {
    let fragment = batch
        .fragments()
        .get(index)
        .expect("fragment missing at requested index");
    assert_eq!(fragment.payload(), payload);
    assert_eq!(fragment.header().is_last_fragment(), is_last);
    assert_eq!(
        fragment.header().total_fragments() as usize,
        batch.len(),
        "every header repeats the total"
    );
}

#[test]
fn fragmenter_splits_text_into_multiple_frames() {
    let batch = fragmenter(3)
        .fragment_text("abcdefgh")
        .expect("fragment text");

    assert_eq!(batch.len(), 3);
    assert!(batch.is_fragmented());
    assert_eq!(batch.message_id(), MessageId::new(0));

    assert_fragment(&batch, 0, b"abc", false);
    assert_fragment(&batch, 1, b"def", false);
    assert_fragment(&batch, 2, b"gh", true);
}

#[test]
fn fragmenter_handles_empty_text() {
    let batch = fragmenter(8).fragment_text("").expect("fragment empty");

    assert_eq!(batch.len(), 1);
    assert!(!batch.is_fragmented());
    let fragment = batch
        .fragments()
        .first()
        .expect("batch should contain at least one fragment");
    assert!(fragment.payload().is_empty());
    assert!(fragment.header().is_last_fragment());
    assert_eq!(fragment.header().fragment_index(), FragmentIndex::zero());
    assert_eq!(fragment.header().total_fragments(), 1);
}

#[test]
fn fragmenter_splits_1300_bytes_into_three_fragments() {
    let text = "x".repeat(1_300);
    let batch = fragmenter(500).fragment_text(&text).expect("fragment text");

    let sizes: Vec<usize> = batch.fragments().iter().map(|f| f.payload().len()).collect();
    assert_eq!(sizes, vec![500, 500, 300]);
}

#[rstest]
#[case("aé", 2, &["a", "é"])]
#[case("日本語", 4, &["日", "本", "語"])]
#[case("日本語", 6, &["日本", "語"])]
#[case("a🦀b", 4, &["a", "🦀", "b"])]
#[case("🦀🦀", 5, &["🦀", "🦀"])]
fn fragmenter_never_splits_code_points(
    #[case] text: &str,
    #[case] cap: usize,
    #[case] expected: &[&str],
) {
    let batch = fragmenter(cap).fragment_text(text).expect("fragment text");
    let pieces: Vec<&str> = batch
        .fragments()
        .iter()
        .map(|f| std::str::from_utf8(f.payload()).expect("fragment is valid UTF-8"))
        .collect();
    assert_eq!(pieces, expected);
}

#[test]
fn fragmenter_rejects_cap_narrower_than_code_point() {
    let err = fragmenter(3)
        .fragment_text("ab🦀")
        .expect_err("a four-byte code point cannot fit in three bytes");
    assert_eq!(
        err,
        FragmentationError::CodePointTooWide { offset: 2, cap: 3 }
    );
}

#[test]
fn fragmenter_increments_ids() {
    let fragmenter =
        Fragmenter::with_starting_id(NonZeroUsize::new(4).expect("non-zero"), MessageId::new(7));

    let batch = fragmenter.fragment_text("hello").expect("fragment text");
    assert_eq!(batch.message_id(), MessageId::new(7));
    assert_eq!(batch.len(), 2);

    let next = fragmenter.fragment_text("bye").expect("fragment text");
    assert_eq!(next.message_id(), MessageId::new(8));
    assert!(!next.is_fragmented());
}

#[test]
fn fragmenter_respects_explicit_message_ids() {
    let fragmenter =
        Fragmenter::with_starting_id(NonZeroUsize::new(2).expect("non-zero"), MessageId::new(10));
    let batch = fragmenter
        .fragment_with_id(MessageId::new(500), "xyz")
        .expect("fragment with explicit id");
    assert_eq!(batch.message_id(), MessageId::new(500));
    assert_eq!(batch.len(), 2);

    let next = fragmenter.fragment_text("q").expect("next fragment");
    assert_eq!(next.message_id(), MessageId::new(10));
}

#[test]
fn fragment_batch_into_iterator_yields_all_fragments() {
    let batch = fragmenter(2).fragment_text("abc").expect("split");

    let payloads: Vec<Vec<u8>> = batch
        .into_iter()
        .map(|fragment| fragment.payload().to_vec())
        .collect();
    assert_eq!(payloads, vec![b"ab".to_vec(), b"c".to_vec()]);
}

proptest! {
    #[test]
    fn fragments_concatenate_to_original(text in "\\PC{0,600}", cap in 4usize..64) {
        let batch = fragmenter(cap).fragment_text(&text).expect("fragment text");

        let mut rebuilt = Vec::with_capacity(text.len());
        for (position, fragment) in batch.fragments().iter().enumerate() {
            prop_assert!(fragment.payload().len() <= cap);
            prop_assert!(std::str::from_utf8(fragment.payload()).is_ok());
            prop_assert_eq!(fragment.header().fragment_index().get() as usize, position);
            prop_assert!(!fragment.payload().is_empty() || text.is_empty());
            rebuilt.extend_from_slice(fragment.payload());
        }
        prop_assert_eq!(rebuilt, text.as_bytes());
    }
}

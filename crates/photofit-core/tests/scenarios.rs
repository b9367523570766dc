//! Controller scenarios against the scripted spy codec
//!
//! Covers the fast path, budget-driven iteration, the final fallback, the two
//! failure kinds, and release of superseded scratch outputs.

use photofit_core::prelude::*;
use photofit_core::{
    AttemptKind, CodecErrorKind, CompressionPath, ErrorKind, ResizeInstruction,
    CODEC_FAILURE_PREFIX, MIB,
};
use photofit_test_utils::{spy_controller, CodecStep, MemoryStore, SpyCodec};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn scratch(n: usize) -> ResourceRef {
    ResourceRef::new(format!("mem://scratch/attempt-{n}.jpg"))
}

#[tokio::test]
async fn budget_met_on_second_attempt_stops_loop() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/raw.png", 10 * MIB);
    let codec = SpyCodec::new(&store)
        .then_outputs(&[7 * MIB, 9 * MIB / 2, MIB])
        .into_arc();

    let result = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/raw.png"), &CompressionBudget::default())
        .await
        .unwrap();

    assert_eq!(codec.call_count(), 2);
    assert_eq!(result.path, CompressionPath::Iterative { attempt: 2 });
    assert_eq!(result.bytes, 9 * MIB / 2);
    assert_eq!(result.resource, scratch(2));
    assert!(result
        .attempts
        .iter()
        .all(|a| a.kind == AttemptKind::Iterative));
}

#[tokio::test]
async fn unvalidated_attempt_count_does_not_preallocate() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/raw.png", 10 * MIB);
    let codec = SpyCodec::new(&store).then_outputs(&[MIB]).into_arc();
    let budget = CompressionBudget::default().with_max_attempts(u32::MAX);

    let result = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/raw.png"), &budget)
        .await
        .unwrap();

    assert_eq!(result.path, CompressionPath::Iterative { attempt: 1 });
    assert_eq!(codec.call_count(), 1);
}

#[tokio::test]
async fn small_jpeg_takes_single_fast_pass() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/site.jpg", 2 * MIB);
    let codec = SpyCodec::new(&store).then_outputs(&[6 * MIB]).into_arc();
    let budget = CompressionBudget::default();

    let result = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/site.jpg"), &budget)
        .await
        .unwrap();

    let calls = codec.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].request.quality.to_jpeg_scale(), 80);
    assert_eq!(
        calls[0].request.resize,
        Some(ResizeInstruction::FitLongerEdge(3000))
    );
    assert_eq!(result.path, CompressionPath::FastPath);
    assert_eq!(result.bytes, 6 * MIB);
    assert!(!result.within_budget(&budget));
}

#[tokio::test]
async fn oversized_jpeg_iterates() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/huge.jpg", 8 * MIB);
    let codec = SpyCodec::new(&store).then_outputs(&[3 * MIB]).into_arc();

    let result = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/huge.jpg"), &CompressionBudget::default())
        .await
        .unwrap();

    assert_eq!(result.path, CompressionPath::Iterative { attempt: 1 });
}

#[tokio::test]
async fn exhausted_loop_runs_fixed_final_pass() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/pano.heic", 12 * MIB);
    let codec = SpyCodec::new(&store)
        .with_source_dimensions(8000, 2000)
        .otherwise(CodecStep::Output(8 * MIB))
        .into_arc();

    let result = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/pano.heic"), &CompressionBudget::default())
        .await
        .unwrap();

    let calls = codec.calls();
    assert_eq!(calls.len(), 4);

    let fallback = &calls[3].request;
    assert_eq!(fallback.quality.to_jpeg_scale(), 50);
    assert_eq!(fallback.max_dimension(), Some(1000));

    assert_eq!(result.path, CompressionPath::FinalFallback);
    assert_eq!(result.bytes, 8 * MIB);
    assert_eq!((result.width, result.height), (1000, 250));
    assert_eq!(result.attempts[3].kind, AttemptKind::FinalFallback);
}

#[tokio::test]
async fn each_attempt_encodes_previous_output() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/raw.png", 12 * MIB);
    let codec = SpyCodec::new(&store)
        .otherwise(CodecStep::Output(8 * MIB))
        .into_arc();

    spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/raw.png"), &CompressionBudget::default())
        .await
        .unwrap();

    let inputs: Vec<ResourceRef> = codec.calls().into_iter().map(|c| c.input).collect();
    assert_eq!(
        inputs,
        vec![
            ResourceRef::new("mem://inbox/raw.png"),
            scratch(1),
            scratch(2),
            scratch(3),
        ]
    );
}

#[tokio::test]
async fn loop_parameters_strictly_decrease() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/raw.png", 12 * MIB);
    let codec = SpyCodec::new(&store)
        .otherwise(CodecStep::Output(8 * MIB))
        .into_arc();

    spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/raw.png"), &CompressionBudget::default())
        .await
        .unwrap();

    let loop_calls = &codec.calls()[..3];
    let dims: Vec<Option<u32>> = loop_calls.iter().map(|c| c.request.max_dimension()).collect();
    assert_eq!(dims, vec![Some(3000), Some(2400), Some(1920)]);
    for pair in loop_calls.windows(2) {
        assert!(pair[1].request.quality.value() < pair[0].request.quality.value());
    }
}

#[tokio::test]
async fn missing_source_fails_without_codec_calls() {
    let store = MemoryStore::new();
    let codec = SpyCodec::new(&store).otherwise(CodecStep::Output(MIB)).into_arc();

    let err = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("file:///nowhere/photo.jpg"), &CompressionBudget::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FileNotFound);
    assert_eq!(codec.call_count(), 0);
}

#[tokio::test]
async fn codec_error_fails_after_first_attempt() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/broken.png", 3 * MIB);
    let codec = SpyCodec::new(&store).always_fail("Invalid image data").into_arc();

    let err = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/broken.png"), &CompressionBudget::default())
        .await
        .unwrap_err();

    assert_eq!(codec.call_count(), 1);
    assert_eq!(err.kind(), ErrorKind::CodecFailure);
    let text = err.to_string();
    assert!(text.contains(CODEC_FAILURE_PREFIX));
    assert!(text.contains("Invalid image data"));
    assert!(matches!(
        err,
        CompressionError::CodecFailure {
            kind: CodecErrorKind::CorruptData,
            ..
        }
    ));
}

#[tokio::test]
async fn fast_path_codec_error_is_not_retried() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/site.jpg", MIB);
    let codec = SpyCodec::new(&store).always_fail("truncated scan").into_arc();

    let err = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/site.jpg"), &CompressionBudget::default())
        .await
        .unwrap_err();

    assert_eq!(codec.call_count(), 1);
    assert_eq!(err.kind(), ErrorKind::CodecFailure);
}

#[tokio::test]
async fn superseded_outputs_are_released() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/raw.png", 12 * MIB);
    let codec = SpyCodec::new(&store)
        .otherwise(CodecStep::Output(8 * MIB))
        .into_arc();

    let result = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/raw.png"), &CompressionBudget::default())
        .await
        .unwrap();

    assert_eq!(store.released(), vec![scratch(1), scratch(2), scratch(3)]);
    assert_eq!(store.retained(), vec![scratch(4)]);
    assert_eq!(store.live_scratch(), vec![result.resource]);
    assert!(store.contains("mem://inbox/raw.png"));
}

#[tokio::test]
async fn failure_mid_loop_leaves_no_scratch_behind() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/raw.png", 12 * MIB);
    let codec = SpyCodec::new(&store)
        .then_outputs(&[8 * MIB])
        .always_fail("decoder panicked")
        .into_arc();

    let err = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/raw.png"), &CompressionBudget::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CodecFailure);
    assert_eq!(codec.call_count(), 2);
    assert!(store.live_scratch().is_empty());
    assert!(store.retained().is_empty());
}

#[tokio::test]
async fn phantom_output_is_codec_failure() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/raw.png", 12 * MIB);
    let codec = SpyCodec::new(&store).then(CodecStep::Phantom).into_arc();

    let err = spy_controller(&store, &codec)
        .compress(&ResourceRef::new("mem://inbox/raw.png"), &CompressionBudget::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CompressionError::CodecFailure {
            kind: CodecErrorKind::MissingOutput,
            ..
        }
    ));
}

#[tokio::test]
async fn independent_calls_run_concurrently() {
    let store = MemoryStore::new();
    store.insert("mem://inbox/a.png", 9 * MIB);
    store.insert("mem://inbox/b.png", 9 * MIB);
    let codec = SpyCodec::new(&store).otherwise(CodecStep::Output(MIB)).into_arc();
    let controller = spy_controller(&store, &codec);
    let budget = CompressionBudget::default();
    let (a, b) = (ResourceRef::new("mem://inbox/a.png"), ResourceRef::new("mem://inbox/b.png"));

    let (ra, rb) = tokio::join!(controller.compress(&a, &budget), controller.compress(&b, &budget));

    let (ra, rb) = (ra.unwrap(), rb.unwrap());
    assert_ne!(ra.resource, rb.resource);
    assert_eq!(codec.call_count(), 2);
}

proptest! {
    #[test]
    fn prop_decodable_inputs_always_succeed_within_call_bound(
        source_mib in 1u64..40,
        sizes in proptest::collection::vec(1u64..20, 0..6),
        jpeg in any::<bool>(),
        attempts in 0u32..6,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let store = MemoryStore::new();
        let source = if jpeg { "mem://inbox/p.jpg" } else { "mem://inbox/p.png" };
        store.insert(source, source_mib * MIB);
        let codec = SpyCodec::new(&store)
            .then_outputs(&sizes.iter().map(|s| s * MIB).collect::<Vec<_>>())
            .otherwise(CodecStep::Output(30 * MIB))
            .into_arc();
        let budget = CompressionBudget::new().with_max_attempts(attempts);

        let result = runtime.block_on(
            spy_controller(&store, &codec).compress(&ResourceRef::new(source), &budget),
        );

        let compressed = result.unwrap();
        prop_assert!(codec.call_count() as u32 <= budget.max_codec_calls());
        prop_assert_eq!(compressed.codec_calls(), codec.call_count());
        prop_assert_eq!(store.live_scratch(), vec![compressed.resource.clone()]);
        if let CompressionPath::Iterative { .. } = compressed.path {
            prop_assert!(compressed.within_budget(&budget));
        }
    }
}

/*!
 * End-to-end pipeline scenarios with deterministic correctors
 */

use std::sync::Arc;

use textfix::correction::{
    CancellationFlag, CorrectionPipeline, PipelineEvent, PipelineOptions,
};
use textfix::errors::{CorrectionError, PipelineError};
use textfix::providers::mock::MockCorrector;
use textfix::segmenter::DelimiterSegmenter;

use crate::common;

fn options(chunk_char_limit: usize, output_fraction: f64) -> PipelineOptions {
    PipelineOptions {
        chunk_char_limit,
        output_fraction,
        mismatch_threshold: 0.05,
        retry_count: 2,
        retry_backoff_ms: 0,
        regenerate_attempts: 1,
        language: Some("it".to_string()),
    }
}

fn pipeline(corrector: &MockCorrector, options: PipelineOptions) -> CorrectionPipeline {
    CorrectionPipeline::new(Arc::new(corrector.clone()), options).unwrap()
}

fn fix_accents(text: &str) -> String {
    text.replace("perche", "perché").replace("cosi ", "così ")
}

#[tokio::test]
async fn test_run_echo_shouldReproduceDocumentForAnyChunking() {
    common::init_test_logger();
    let document = common::sample_document().repeat(3);

    for (limit, fraction) in [(60, 0.5), (150, 0.75), (400, 0.3), (10_000, 0.75)] {
        let corrector = MockCorrector::echo();
        let report = pipeline(&corrector, options(limit, fraction))
            .run(&document, |_| {})
            .await
            .unwrap();

        assert_eq!(report.output, document, "limit {} fraction {}", limit, fraction);
        assert!(!report.has_issues());
        assert_eq!(corrector.call_count(), report.chunk_count);
    }
}

#[tokio::test]
async fn test_run_accentFixes_shouldApplyEachFixOnce() {
    common::init_test_logger();
    let document = common::sample_document().repeat(3);
    let corrector = MockCorrector::transform(fix_accents);

    let report = pipeline(&corrector, options(180, 0.6))
        .run(&document, |_| {})
        .await
        .unwrap();

    assert!(report.chunk_count > 3);
    assert_eq!(report.output, fix_accents(&document));
    assert_eq!(report.output.matches("perché").count(), 3);
    assert!(!report.has_issues());
}

#[tokio::test]
async fn test_run_shortDocument_shouldUseOneChunkWithoutReconciling() {
    let document = "Prima frase. Seconda frase. Terza frase.";
    let corrector = MockCorrector::echo();

    let report = pipeline(&corrector, options(1000, 0.75))
        .run(document, |_| {})
        .await
        .unwrap();

    assert_eq!(report.chunk_count, 1);
    assert_eq!(corrector.calls(), vec![document]);
    assert_eq!(report.output, document);
}

#[tokio::test]
async fn test_run_verbatimOverlap_shouldKeepSharedSentencesOnce() {
    let document = common::six_sentences();
    let corrector = MockCorrector::echo();

    let report = pipeline(&corrector, options(44, 0.5))
        .run(&document, |_| {})
        .await
        .unwrap();

    assert_eq!(report.chunk_count, 2);
    assert!(corrector.calls()[1].starts_with("Frase 3aa. Frase 4aa. "));
    assert_eq!(report.output.matches("Frase 3aa.").count(), 1);
    assert_eq!(report.output.matches("Frase 4aa.").count(), 1);
    assert_eq!(report.output, document);
}

#[tokio::test]
async fn test_run_droppedOverlap_shouldFallBackAndReport() {
    common::init_test_logger();
    let document = common::six_sentences();
    let first_chunk: String = document.chars().take(44).collect();
    let corrector = MockCorrector::scripted(vec![
        Ok(first_chunk.clone()),
        Ok("Frase 5aa. Frase 6aa. ".to_string()),
    ]);
    let mut warnings = Vec::new();

    let report = pipeline(&corrector, PipelineOptions {
        regenerate_attempts: 0,
        ..options(44, 0.5)
    })
    .run(&document, |event| {
        if let PipelineEvent::LowConfidence(issue) = event {
            warnings.push(issue.clone());
        }
    })
    .await
    .unwrap();

    assert_eq!(warnings.len(), 1);
    assert_eq!(report.issues, warnings);
    let issue = &report.issues[0];
    assert_eq!(issue.chunk, 1);
    assert_eq!(issue.document_offset, 44);
    assert!(issue.mismatch > issue.threshold);
    assert!(issue.preview.starts_with("Frase 5aa."));
    // The declared overlap covers the whole reply, so nothing new is appended
    assert_eq!(report.output, first_chunk);
}

#[tokio::test]
async fn test_run_droppedOverlapThenGoodRegeneration_shouldRecover() {
    let document = common::six_sentences();
    let first_chunk: String = document.chars().take(44).collect();
    let corrector = MockCorrector::scripted(vec![
        Ok(first_chunk),
        Ok("Frase 5aa. Frase 6aa. ".to_string()),
    ]);

    let report = pipeline(&corrector, options(44, 0.5))
        .run(&document, |_| {})
        .await
        .unwrap();

    // Script exhausted: the regeneration echoes the full chunk
    assert_eq!(corrector.call_count(), 3);
    assert_eq!(report.regenerations, 1);
    assert!(!report.has_issues());
    assert_eq!(report.output, document);
}

#[tokio::test]
async fn test_run_overlapMergedIntoNewSentence_shouldKeepNewText() {
    let document = common::six_sentences();
    let corrector = MockCorrector::scripted(vec![
        Ok(document.chars().take(44).collect()),
        Ok("Frase 3aa. Frase 4aa, Frase 5aa. Frase 6aa. ".to_string()),
    ]);

    let report = pipeline(&corrector, options(44, 0.5))
        .run(&document, |_| {})
        .await
        .unwrap();

    assert!(!report.has_issues());
    assert_eq!(report.regenerations, 0);
    assert_eq!(report.output, document);
}

#[tokio::test]
async fn test_run_intermittentFailures_shouldRetryAndSucceed() {
    let document = common::sample_document().repeat(2);
    let corrector = MockCorrector::intermittent(2);
    let mut retry_events = 0;

    let report = pipeline(&corrector, options(200, 0.75))
        .run(&document, |event| {
            if matches!(event, PipelineEvent::ChunkRetry { .. }) {
                retry_events += 1;
            }
        })
        .await
        .unwrap();

    assert_eq!(report.output, document);
    assert!(report.retries > 0);
    assert_eq!(report.retries, retry_events);
    assert_eq!(corrector.call_count(), report.chunk_count + report.retries as usize);
}

#[tokio::test]
async fn test_run_fatalError_shouldStopWithoutOutput() {
    let document = common::six_sentences();
    let corrector = MockCorrector::scripted(vec![
        Ok(document.chars().take(44).collect()),
        Err(CorrectionError::Fatal("model refused".to_string())),
    ]);

    let error = pipeline(&corrector, options(44, 0.5))
        .run(&document, |_| {})
        .await
        .unwrap_err();

    match error {
        PipelineError::CorrectionFailed { chunk, attempts, source } => {
            assert_eq!(chunk, 1);
            assert_eq!(attempts, 1);
            assert_eq!(source, CorrectionError::Fatal("model refused".to_string()));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_run_cancelledMidway_shouldStopBeforeNextChunk() {
    let document = common::sample_document().repeat(2);
    let corrector = MockCorrector::echo();
    let cancellation = CancellationFlag::new();
    let pipeline = pipeline(&corrector, options(150, 0.75)).with_cancellation(cancellation.clone());

    let error = pipeline
        .run(&document, |event| {
            if let PipelineEvent::ChunkCompleted { index: 0, .. } = event {
                cancellation.cancel();
            }
        })
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::Cancelled { completed: 1, .. }));
    assert_eq!(corrector.call_count(), 1);
}

#[tokio::test]
async fn test_run_events_shouldArriveInChunkOrder() {
    let document = common::sample_document();
    let corrector = MockCorrector::echo();
    let mut events = Vec::new();

    let report = pipeline(&corrector, options(150, 0.75))
        .run(&document, |event| events.push(event.clone()))
        .await
        .unwrap();

    assert!(matches!(events.first(), Some(PipelineEvent::Planned { .. })));
    assert!(matches!(events.last(), Some(PipelineEvent::Finished { .. })));

    let completed: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::ChunkCompleted { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(completed, (0..report.chunk_count).collect::<Vec<_>>());

    let lengths: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::ChunkCompleted { output_len, .. } => Some(*output_len),
            _ => None,
        })
        .collect();
    assert!(lengths.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(lengths.last().copied(), Some(document.len()));
}

#[tokio::test]
async fn test_run_delimiterSegmenter_shouldStillReproduceDocument() {
    let document = common::sample_document();
    let corrector = MockCorrector::echo();

    let report = pipeline(&corrector, options(90, 0.5))
        .with_segmenter(Arc::new(DelimiterSegmenter::new()))
        .run(&document, |_| {})
        .await
        .unwrap();

    assert_eq!(report.output, document);
}

#[tokio::test]
async fn test_run_whitespaceOnlyDocument_shouldProduceEmptyOutput() {
    let corrector = MockCorrector::echo();

    let report = pipeline(&corrector, options(100, 0.75))
        .run(" \n\n  ", |_| {})
        .await
        .unwrap();

    assert_eq!(report.chunk_count, 0);
    assert!(report.output.is_empty());
    assert_eq!(corrector.call_count(), 0);
}

#[test]
fn test_new_invalidOptions_shouldFailBeforeRunning() {
    let corrector = MockCorrector::echo();
    let result = CorrectionPipeline::new(Arc::new(corrector), PipelineOptions {
        output_fraction: 0.0,
        ..PipelineOptions::default()
    });

    assert!(matches!(result, Err(PipelineError::Planning(_))));
}

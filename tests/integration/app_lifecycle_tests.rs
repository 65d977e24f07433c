/*!
 * Full file-to-file runs through the application controller
 */

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use textfix::app_config::{Config, CorrectionProvider};
use textfix::app_controller::Controller;
use textfix::file_utils::FileManager;
use textfix::providers::mock::MockCorrector;

use crate::common;

fn fix_accents(text: &str) -> String {
    text.replace("perche", "perché").replace("cosi ", "così ")
}

fn controller(config: Config) -> Controller {
    Controller::with_config(config).unwrap()
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.language = Some("it".to_string());
    config.chunking.chunk_char_limit = 200;
    config.correction.common.retry_backoff_ms = 0;
    config
}

#[tokio::test]
async fn test_runWithCorrector_echo_shouldWriteIdenticalFile() {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir().unwrap();
    let document = common::sample_document();
    let input = common::create_test_file(temp_dir.path(), "input.txt", &document).unwrap();
    let output = temp_dir.path().join("output.txt");

    let report = controller(fast_config())
        .run_with_corrector(&input, &output, Arc::new(MockCorrector::echo()))
        .await
        .unwrap();

    assert!(report.chunk_count > 1);
    assert_eq!(fs::read_to_string(&output).unwrap(), document);
    assert!(!FileManager::issues_log_path(&output).exists());
}

#[tokio::test]
async fn test_runWithCorrector_sameInputAndOutput_shouldCorrectInPlace() {
    let temp_dir = common::create_temp_dir().unwrap();
    let document = common::sample_document();
    let path = common::create_test_file(temp_dir.path(), "book.txt", &document).unwrap();

    controller(fast_config())
        .run_with_corrector(&path, &path, Arc::new(MockCorrector::transform(fix_accents)))
        .await
        .unwrap();

    let corrected = fs::read_to_string(&path).unwrap();
    assert_eq!(corrected, fix_accents(&document));
    assert!(corrected.contains("Non so perché sia partito così presto."));
}

#[tokio::test]
async fn test_runWithCorrector_failingCorrector_shouldLeaveFilesUntouched() {
    let temp_dir = common::create_temp_dir().unwrap();
    let document = common::sample_document();
    let input = common::create_test_file(temp_dir.path(), "input.txt", &document).unwrap();
    let output = temp_dir.path().join("output.txt");

    let error = controller(fast_config())
        .run_with_corrector(&input, &output, Arc::new(MockCorrector::failing()))
        .await
        .unwrap_err();

    assert!(error.to_string().contains("no output written"));
    assert!(!output.exists());
    assert_eq!(fs::read_to_string(&input).unwrap(), document);
}

#[tokio::test]
async fn test_runWithCorrector_failingInPlace_shouldKeepOriginal() {
    let temp_dir = common::create_temp_dir().unwrap();
    let document = common::sample_document();
    let path = common::create_test_file(temp_dir.path(), "book.txt", &document).unwrap();

    let result = controller(fast_config())
        .run_with_corrector(&path, &path, Arc::new(MockCorrector::failing()))
        .await;

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), document);
}

#[tokio::test]
async fn test_runWithCorrector_lowConfidence_shouldWriteIssuesLog() {
    let temp_dir = common::create_temp_dir().unwrap();
    let document = common::six_sentences();
    let input = common::create_test_file(temp_dir.path(), "input.txt", &document).unwrap();
    let output = temp_dir.path().join("output.txt");
    let corrector = MockCorrector::scripted(vec![
        Ok(document.chars().take(44).collect()),
        Ok("Frase 5aa. Frase 6aa. ".to_string()),
    ]);

    let report = controller(common::small_chunk_config())
        .run_with_corrector(&input, &output, Arc::new(corrector))
        .await
        .unwrap();

    assert_eq!(report.issues.len(), 1);
    assert!(output.exists());

    let log = fs::read_to_string(FileManager::issues_log_path(&output)).unwrap();
    assert!(log.starts_with("Correction Issues - "));
    assert!(log.contains("Context: Ollama - gemma3n"));
    assert!(log.contains("[WARN] chunk 2 (input byte 44)"));
}

#[tokio::test]
async fn test_runWithCorrector_cleanRun_shouldRemoveStaleIssuesLog() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(temp_dir.path(), "input.txt", &common::six_sentences()).unwrap();
    let output = temp_dir.path().join("output.txt");
    let stale_log = FileManager::issues_log_path(&output);
    fs::write(&stale_log, "[WARN] old run").unwrap();

    controller(common::small_chunk_config())
        .run_with_corrector(&input, &output, Arc::new(MockCorrector::echo()))
        .await
        .unwrap();

    assert!(!stale_log.exists());
}

#[tokio::test]
async fn test_runWithCorrector_missingInput_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = temp_dir.path().join("missing.txt");
    let output = temp_dir.path().join("output.txt");

    let error = controller(fast_config())
        .run_with_corrector(&input, &output, Arc::new(MockCorrector::echo()))
        .await
        .unwrap_err();

    assert!(error.to_string().contains("Input file does not exist"));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_runWithCorrector_cancelledBeforeStart_shouldWriteNothing() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(temp_dir.path(), "input.txt", &common::six_sentences()).unwrap();
    let output = temp_dir.path().join("output.txt");
    let controller = controller(common::small_chunk_config());
    controller.cancellation().cancel();

    let result = controller
        .run_with_corrector(&input, &output, Arc::new(MockCorrector::echo()))
        .await;

    assert!(result.is_err());
    assert!(!output.exists());
}

#[test]
fn test_withConfig_invalidConfig_shouldFail() {
    let mut config = Config::default();
    config.correction.provider = CorrectionProvider::Anthropic;

    let error = Controller::with_config(config).err().unwrap();
    assert!(error.to_string().contains("Invalid configuration"));
}

#[test]
fn test_runWithCorrector_blockingRuntime_shouldWork() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(temp_dir.path(), "input.txt", "Una frase sola.").unwrap();
    let output = temp_dir.path().join("output.txt");
    let controller = controller(fast_config());

    let report = tokio_test::block_on(controller.run_with_corrector(
        &input,
        &output,
        Arc::new(MockCorrector::echo()),
    ))
    .unwrap();

    assert_eq!(report.chunk_count, 1);
    assert_eq!(fs::read_to_string(&output).unwrap(), "Una frase sola.");
}

#[test]
fn test_formatDuration_shouldPickLargestUnit() {
    assert_eq!(Controller::format_duration(Duration::from_millis(1500)), "1.500s");
    assert_eq!(Controller::format_duration(Duration::from_secs(125)), "2m 5s");
    assert_eq!(Controller::format_duration(Duration::from_secs(3725)), "1h 2m 5s");
}

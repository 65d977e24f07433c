/*!
 * Provider clients against a local HTTP stub
 *
 * Checks that HTTP outcomes are classified into transient and fatal
 * correction errors the way the pipeline's retry logic expects.
 */

use textfix::app_config::{Config, CorrectionProvider};
use textfix::correction::{CorrectionService, Corrector};
use textfix::errors::{CorrectionError, ProviderError};

use crate::common;
use crate::common::http_stub::{closed_endpoint, serve_once};

fn ollama_service(endpoint: &str) -> CorrectionService {
    let mut config = Config::default();
    let provider = config.correction.active_provider_config_mut();
    provider.endpoint = endpoint.to_string();
    provider.timeout_secs = 5;
    CorrectionService::new(&config.correction, Some("it")).unwrap()
}

fn anthropic_service(endpoint: &str) -> CorrectionService {
    let mut config = Config::default();
    config.correction.provider = CorrectionProvider::Anthropic;
    let provider = config.correction.active_provider_config_mut();
    provider.endpoint = endpoint.to_string();
    provider.api_key = "sk-test".to_string();
    provider.timeout_secs = 5;
    CorrectionService::new(&config.correction, Some("it")).unwrap()
}

const OLLAMA_REPLY: &str = r#"{"model":"gemma3n","created_at":"2024-01-01T00:00:00Z","message":{"role":"assistant","content":"Non so perché.\n"},"done":true}"#;

#[tokio::test]
async fn test_ollama_success_shouldReturnTextWithOriginalPadding() {
    common::init_test_logger();
    let (endpoint, request) = serve_once(200, OLLAMA_REPLY).await.unwrap();
    let service = ollama_service(&endpoint);

    let corrected = service.correct("\n\nNon so perche. ").await.unwrap();
    let request = request.await.unwrap();

    assert_eq!(corrected, "\n\nNon so perché. ");
    assert!(request.starts_with("POST /api/chat"));
    assert!(request.contains(r#""role":"system""#));
    assert!(request.contains("written in Italian"));
    assert!(request.contains(r#""stream":false"#));
}

#[tokio::test]
async fn test_ollama_serverError_shouldBeTransient() {
    let (endpoint, _request) = serve_once(500, r#"{"error":"model crashed"}"#).await.unwrap();

    let error = ollama_service(&endpoint).correct("Ciao.").await.unwrap_err();

    assert!(error.is_transient());
    assert!(error.to_string().contains("model crashed"));
}

#[tokio::test]
async fn test_ollama_modelNotFound_shouldBeFatal() {
    let (endpoint, _request) = serve_once(404, r#"{"error":"model 'gemma3n' not found"}"#).await.unwrap();

    let error = ollama_service(&endpoint).correct("Ciao.").await.unwrap_err();

    assert!(matches!(error, CorrectionError::Fatal(_)));
}

#[tokio::test]
async fn test_ollama_emptyReply_shouldBeFatal() {
    let body = r#"{"model":"gemma3n","message":{"role":"assistant","content":"  "},"done":true}"#;
    let (endpoint, _request) = serve_once(200, body).await.unwrap();

    let error = ollama_service(&endpoint).correct("Ciao.").await.unwrap_err();

    assert!(matches!(error, CorrectionError::Fatal(ref message) if message.contains("empty reply")));
}

#[tokio::test]
async fn test_ollama_unreachable_shouldBeTransient() {
    let endpoint = closed_endpoint().await.unwrap();

    let error = ollama_service(&endpoint).correct("Ciao.").await.unwrap_err();

    assert!(error.is_transient());
}

#[tokio::test]
async fn test_ollama_testConnection_shouldReadVersion() {
    let (endpoint, request) = serve_once(200, r#"{"version":"0.5.1"}"#).await.unwrap();

    ollama_service(&endpoint).test_connection().await.unwrap();

    assert!(request.await.unwrap().starts_with("GET /api/version"));
}

#[tokio::test]
async fn test_anthropic_success_shouldSendKeyAndSystemPrompt() {
    let body = r#"{"content":[{"type":"text","text":"Buongiorno a tutti."}],"stop_reason":"end_turn","usage":{"input_tokens":12,"output_tokens":5}}"#;
    let (endpoint, request) = serve_once(200, body).await.unwrap();

    let corrected = anthropic_service(&endpoint)
        .correct("Buongiorno a tuti.")
        .await
        .unwrap();
    let request = request.await.unwrap().to_lowercase();

    assert_eq!(corrected, "Buongiorno a tutti.");
    assert!(request.starts_with("post /v1/messages"));
    assert!(request.contains("x-api-key: sk-test"));
    assert!(request.contains("anthropic-version: 2023-06-01"));
    assert!(request.contains(r#""system":"#));
}

#[tokio::test]
async fn test_anthropic_unauthorized_shouldBeFatal() {
    let (endpoint, _request) = serve_once(401, r#"{"type":"error","error":{"type":"authentication_error"}}"#)
        .await
        .unwrap();

    let error = anthropic_service(&endpoint).correct("Ciao.").await.unwrap_err();

    assert!(matches!(error, CorrectionError::Fatal(_)));
}

#[tokio::test]
async fn test_anthropic_overloaded_shouldBeTransient() {
    let (endpoint, _request) = serve_once(529, r#"{"type":"error","error":{"type":"overloaded_error"}}"#)
        .await
        .unwrap();

    let error = anthropic_service(&endpoint).correct("Ciao.").await.unwrap_err();

    assert!(error.is_transient());
}

#[tokio::test]
async fn test_anthropic_rateLimited_testConnection_shouldReportRateLimit() {
    let (endpoint, request) = serve_once(429, r#"{"type":"error"}"#).await.unwrap();

    let error = anthropic_service(&endpoint).test_connection().await.unwrap_err();

    assert!(matches!(error, ProviderError::RateLimitExceeded(_)));
    assert!(request.await.unwrap().starts_with("GET /v1/models"));
}

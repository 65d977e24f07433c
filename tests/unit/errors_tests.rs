/*!
 * Tests for error classification and messages
 */

use textfix::errors::{AppError, CorrectionError, PipelineError, PlanningError, ProviderError};

#[test]
fn test_providerError_isRetryable_shouldFollowStatusClass() {
    let cases = vec![
        (ProviderError::ConnectionError("refused".into()), true),
        (ProviderError::RateLimitExceeded("slow down".into()), true),
        (ProviderError::ParseError("truncated".into()), true),
        (ProviderError::RequestFailed("reset".into()), true),
        (ProviderError::AuthenticationError("bad key".into()), false),
        (ProviderError::ApiError { status_code: 500, message: String::new() }, true),
        (ProviderError::ApiError { status_code: 503, message: String::new() }, true),
        (ProviderError::ApiError { status_code: 529, message: String::new() }, true),
        (ProviderError::ApiError { status_code: 408, message: String::new() }, true),
        (ProviderError::ApiError { status_code: 400, message: String::new() }, false),
        (ProviderError::ApiError { status_code: 404, message: String::new() }, false),
    ];

    for (error, expected) in cases {
        assert_eq!(error.is_retryable(), expected, "{}", error);
    }
}

#[test]
fn test_correctionError_fromProviderError_shouldKeepMessage() {
    let transient: CorrectionError = ProviderError::ConnectionError("timed out".into()).into();
    assert!(transient.is_transient());
    assert!(transient.to_string().contains("timed out"));

    let fatal: CorrectionError = ProviderError::ApiError {
        status_code: 400,
        message: "context length exceeded".into(),
    }
    .into();
    assert!(!fatal.is_transient());
    assert!(fatal.to_string().contains("context length exceeded"));
}

#[test]
fn test_pipelineError_display_shouldNameChunkAndAttempts() {
    let error = PipelineError::CorrectionFailed {
        chunk: 3,
        attempts: 4,
        source: CorrectionError::Transient("503".into()),
    };
    let message = error.to_string();
    assert!(message.contains("Chunk 3"));
    assert!(message.contains("4 attempt(s)"));

    let cancelled = PipelineError::Cancelled { completed: 2, total: 5 };
    assert_eq!(cancelled.to_string(), "Correction cancelled after 2 of 5 chunks");
}

#[test]
fn test_pipelineError_fromPlanningError_shouldWrap() {
    let error: PipelineError = PlanningError::InvalidParameters("bad".into()).into();
    assert!(matches!(error, PipelineError::Planning(PlanningError::InvalidParameters(_))));
    assert_eq!(error.to_string(), "Planning error: Invalid chunking parameters: bad");
}

#[test]
fn test_appError_conversions_shouldPickVariant() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    assert!(matches!(AppError::from(io), AppError::File(_)));

    let provider = AppError::from(ProviderError::AuthenticationError("no key".into()));
    assert_eq!(provider.to_string(), "Provider error: Authentication error: no key");

    let pipeline = AppError::from(PipelineError::Cancelled { completed: 0, total: 1 });
    assert!(matches!(pipeline, AppError::Pipeline(_)));

    let other = AppError::from(anyhow::anyhow!("boom"));
    assert!(matches!(other, AppError::Unknown(ref message) if message == "boom"));
}

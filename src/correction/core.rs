/*!
 * Correction client.
 *
 * `Corrector` is the seam between the pipeline and whatever fixes the text.
 * `CorrectionService` implements it over the configured LLM provider with a
 * fixed proofreading instruction; tests and benchmarks use
 * `providers::mock::MockCorrector` instead.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, trace};
use std::fmt::Debug;
use std::time::Instant;
use url::Url;

use crate::app_config::{CorrectionConfig, CorrectionProvider};
use crate::errors::{CorrectionError, ProviderError};
use crate::language_utils;
use crate::providers::Provider;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{ChatRequest, Ollama};

/// Substituted for `{language}` when no language hint is configured
const UNKNOWN_LANGUAGE: &str = "its original language";

/// Corrects one chunk of text
#[async_trait]
pub trait Corrector: Send + Sync + Debug {
    /// Return the corrected version of `chunk_text`
    ///
    /// Errors are either transient (the same input may be retried) or fatal.
    async fn correct(&self, chunk_text: &str) -> Result<String, CorrectionError>;
}

/// Parse an endpoint URL into host (with scheme) and port
fn parse_endpoint(endpoint: &str) -> Result<(String, u16)> {
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    let host = url.host_str()
        .ok_or_else(|| anyhow!("Invalid host in endpoint: {}", endpoint))?
        .to_string();

    let port = url.port_or_known_default().unwrap_or(80);

    Ok((format!("{}://{}", url.scheme(), host), port))
}

/// Correction provider implementation variants
#[derive(Debug)]
enum CorrectionProviderImpl {
    /// Ollama LLM service
    Ollama {
        /// Client instance
        client: Ollama,
    },

    /// Anthropic API service
    Anthropic {
        /// Client instance
        client: Anthropic,
    },
}

/// Provider-backed corrector
#[derive(Debug)]
pub struct CorrectionService {
    provider: CorrectionProviderImpl,
    provider_kind: CorrectionProvider,
    model: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
}

impl CorrectionService {
    /// Create a correction service from configuration
    ///
    /// # Arguments
    /// * `config` - Provider selection and common settings
    /// * `language` - Optional document language code substituted into the prompt
    pub fn new(config: &CorrectionConfig, language: Option<&str>) -> Result<Self> {
        let provider = match config.provider {
            CorrectionProvider::Ollama => {
                let (host, port) = parse_endpoint(&config.get_endpoint())?;
                CorrectionProviderImpl::Ollama {
                    client: Ollama::new_with_config(host, port, config.get_timeout_secs()),
                }
            }
            CorrectionProvider::Anthropic => CorrectionProviderImpl::Anthropic {
                client: Anthropic::new_with_config(
                    config.get_api_key(),
                    config.get_endpoint(),
                    config.get_timeout_secs(),
                ),
            },
        };

        Ok(Self {
            provider,
            provider_kind: config.provider,
            model: config.get_model(),
            system_prompt: render_system_prompt(&config.common.system_prompt, language)?,
            temperature: config.common.temperature,
            max_tokens: config.get_max_tokens(),
        })
    }

    pub fn provider(&self) -> CorrectionProvider {
        self.provider_kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// System prompt with the language placeholder filled in
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Test the connection to the correction provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.provider {
            CorrectionProviderImpl::Ollama { client } => client.test_connection().await,
            CorrectionProviderImpl::Anthropic { client } => client.test_connection().await,
        }
    }

    async fn complete_text(&self, text: &str) -> Result<String, ProviderError> {
        match &self.provider {
            CorrectionProviderImpl::Ollama { client } => {
                let request = ChatRequest::new(&self.model, Vec::new())
                    .system(&self.system_prompt)
                    .user(text)
                    .temperature(self.temperature);
                let response = client.complete(request).await?;
                Ok(Ollama::extract_text(&response))
            }
            CorrectionProviderImpl::Anthropic { client } => {
                let request = AnthropicRequest::new(&self.model, self.max_tokens)
                    .system(&self.system_prompt)
                    .add_message("user", text)
                    .temperature(self.temperature);
                let response = client.complete(request).await?;
                Ok(Anthropic::extract_text(&response))
            }
        }
    }
}

#[async_trait]
impl Corrector for CorrectionService {
    async fn correct(&self, chunk_text: &str) -> Result<String, CorrectionError> {
        if chunk_text.trim().is_empty() {
            return Ok(chunk_text.to_string());
        }

        let start = Instant::now();
        let reply = self.complete_text(chunk_text).await?;
        debug!(
            "{} replied with {} chars in {:.2}s",
            self.provider_kind.display_name(),
            reply.chars().count(),
            start.elapsed().as_secs_f64()
        );
        trace!("Raw reply: {}", reply);

        if reply.trim().is_empty() {
            return Err(CorrectionError::Fatal(format!(
                "{} returned an empty reply for a {} char chunk",
                self.provider_kind.display_name(),
                chunk_text.chars().count()
            )));
        }

        Ok(restore_whitespace(chunk_text, &reply))
    }
}

/// Fill the `{language}` placeholder of a prompt template
pub fn render_system_prompt(template: &str, language: Option<&str>) -> Result<String> {
    let language_name = match language {
        Some(code) => language_utils::get_language_name(code)?,
        None => UNKNOWN_LANGUAGE.to_string(),
    };
    Ok(template.replace("{language}", &language_name))
}

/// Put the original's leading and trailing whitespace around a corrected text
///
/// Models drop surrounding blank lines; without them stitched chunks would
/// lose paragraph breaks at chunk boundaries.
pub fn restore_whitespace(original: &str, corrected: &str) -> String {
    let body = corrected.trim();
    let leading = &original[..original.len() - original.trim_start().len()];
    let trailing = &original[original.trim_end().len()..];

    let mut restored = String::with_capacity(leading.len() + body.len() + trailing.len());
    restored.push_str(leading);
    restored.push_str(body);
    restored.push_str(trailing);
    restored
}

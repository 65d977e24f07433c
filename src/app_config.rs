use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Document language code (ISO 639-1 or 639-3), used as a hint only
    #[serde(default)]
    pub language: Option<String>,

    /// Correction service config
    #[serde(default)]
    pub correction: CorrectionConfig,

    /// Chunking and reconciliation config
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Correction provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: Anthropic
    Anthropic,
}

impl CorrectionProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }
}

// Implement Display trait for CorrectionProvider
impl std::fmt::Display for CorrectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for CorrectionProvider
impl std::str::FromStr for CorrectionProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Max tokens per reply (Anthropic requires it)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: CorrectionProvider) -> Self {
        match provider_type {
            CorrectionProvider::Ollama => Self {
                provider_type: "ollama".to_string(),
                model: default_ollama_model(),
                api_key: String::new(),
                endpoint: default_ollama_endpoint(),
                timeout_secs: default_timeout_secs(),
                max_tokens: default_max_tokens(),
            },
            CorrectionProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                model: default_anthropic_model(),
                api_key: String::new(),
                endpoint: default_anthropic_endpoint(),
                timeout_secs: default_timeout_secs(),
                max_tokens: default_max_tokens(),
            },
        }
    }
}

/// Correction service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorrectionConfig {
    /// Correction provider to use
    #[serde(default)]
    pub provider: CorrectionProvider,

    /// Available correction providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common correction settings
    #[serde(default)]
    pub common: CorrectionCommonConfig,
}

/// Common correction settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorrectionCommonConfig {
    /// System prompt for correction
    /// Placeholder: {language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Extra attempts for a chunk after a transient failure
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    /// Lower values make output more deterministic, higher values more creative
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for CorrectionCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
        }
    }
}

/// Chunk planning and overlap reconciliation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk, overlap included
    #[serde(default = "default_chunk_char_limit")]
    pub chunk_char_limit: usize,

    /// Share of each chunk's characters that is new output (0 < f <= 1)
    ///
    /// The remainder is repeated at the head of the next chunk as context.
    #[serde(default = "default_output_fraction")]
    pub output_fraction: f64,

    /// Largest dissimilarity accepted when matching overlaps (0 <= t <= 1)
    #[serde(default = "default_mismatch_threshold")]
    pub mismatch_threshold: f64,

    /// Fresh corrections requested for a chunk whose overlap does not match
    #[serde(default = "default_regenerate_attempts")]
    pub regenerate_attempts: u32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_char_limit: default_chunk_char_limit(),
            output_fraction: default_output_fraction(),
            mismatch_threshold: default_mismatch_threshold(),
            regenerate_attempts: default_regenerate_attempts(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120 // local models can be slow on long chunks
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.1
}

fn default_chunk_char_limit() -> usize {
    1200
}

fn default_output_fraction() -> f64 {
    0.75
}

fn default_mismatch_threshold() -> f64 {
    0.05
}

fn default_regenerate_attempts() -> u32 {
    1
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_ollama_model() -> String {
    "gemma3n".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_system_prompt() -> String {
    "You are a careful proofreader. The text is written in {language}. \
     Fix only spelling mistakes, wrong accents and basic formatting problems. \
     Do not rephrase sentences, do not change style or meaning, and do not modify HTML tags or other markup. \
     Reply with the corrected text only, in the same language, without comments."
        .to_string()
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Load the configuration, creating the file with defaults when it is missing
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        let config = Self::default();
        config.save(path)?;
        log::info!("Created default configuration at {}", path.display());
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate language hint
        if let Some(language) = &self.language {
            crate::language_utils::validate_language_code(language)?;
        }

        let chunking = &self.chunking;
        if chunking.chunk_char_limit == 0 {
            return Err(anyhow!("chunk_char_limit must be greater than zero"));
        }
        if !(chunking.output_fraction > 0.0 && chunking.output_fraction <= 1.0) {
            return Err(anyhow!(
                "output_fraction must be greater than 0 and at most 1, got {}",
                chunking.output_fraction
            ));
        }
        if !(0.0..=1.0).contains(&chunking.mismatch_threshold) {
            return Err(anyhow!(
                "mismatch_threshold must be between 0 and 1, got {}",
                chunking.mismatch_threshold
            ));
        }

        if !(0.0..=2.0).contains(&self.correction.common.temperature) {
            return Err(anyhow!(
                "temperature must be between 0 and 2, got {}",
                self.correction.common.temperature
            ));
        }

        if self.correction.get_model().trim().is_empty() {
            return Err(anyhow!("A model name is required for the {} provider", self.correction.provider.display_name()));
        }

        // Validate API key for all providers except Ollama
        if self.correction.provider == CorrectionProvider::Anthropic && self.correction.get_api_key().is_empty() {
            return Err(anyhow!("Correction API key is required for Anthropic provider"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            language: None,
            correction: CorrectionConfig::default(),
            chunking: ChunkingConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl CorrectionConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &CorrectionProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider, inserted with defaults when absent
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(position) => position,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            CorrectionProvider::Ollama => default_ollama_model(),
            CorrectionProvider::Anthropic => default_anthropic_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        // Ollama doesn't use API keys
        String::new()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        // Default fallback based on provider type
        match self.provider {
            CorrectionProvider::Ollama => default_ollama_endpoint(),
            CorrectionProvider::Anthropic => default_anthropic_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|&secs| secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Get the reply token cap for the active provider
    pub fn get_max_tokens(&self) -> u32 {
        self.get_active_provider_config()
            .map(|p| p.max_tokens)
            .filter(|&tokens| tokens > 0)
            .unwrap_or_else(default_max_tokens)
    }
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            provider: CorrectionProvider::default(),
            available_providers: vec![
                ProviderConfig::new(CorrectionProvider::Ollama),
                ProviderConfig::new(CorrectionProvider::Anthropic),
            ],
            common: CorrectionCommonConfig::default(),
        }
    }
}

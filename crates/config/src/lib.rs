//! Configuration loading, validation, and management for DocWeave.
//!
//! Loads configuration from `~/.docweave/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use docweave_core::ReasoningConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.docweave/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Chat completion provider
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Provider-specific endpoint overrides
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Embedding settings (tool descriptions, queries, chunks)
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Reasoning loop tunables
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Document store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Tabular snippet execution settings
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

fn default_provider() -> String {
    "groq".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("providers", &self.providers)
            .field("embedding", &self.embedding)
            .field("reasoning", &self.reasoning)
            .field("store", &self.store)
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "local" (on-device sentence model), "hash", "openai", or "ollama"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Local model alias (e.g. "all-MiniLM-L6-v2") or the remote model id.
    /// Unset picks the provider's usual model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Vector size of the hashing embedder
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Where local models are downloaded (default: ~/.docweave/models)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl EmbeddingConfig {
    /// The configured model, or the provider's usual one.
    pub fn model_name(&self) -> &str {
        match (&self.model, self.provider.as_str()) {
            (Some(model), _) => model,
            (None, "local") => "all-MiniLM-L6-v2",
            (None, "ollama") => "nomic-embed-text",
            (None, _) => "text-embedding-3-small",
        }
    }

    pub fn model_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("models"))
    }
}

fn default_embedding_provider() -> String {
    "local".into()
}
fn default_dimensions() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            api_url: None,
            api_key: None,
            dimensions: default_dimensions(),
            cache_dir: None,
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("dimensions", &self.dimensions)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Database file; defaults to `~/.docweave/docweave.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap_chars: usize,
}

fn default_store_backend() -> String {
    "sqlite".into()
}
fn default_chunk_chars() -> usize {
    2048
}
fn default_chunk_overlap() -> usize {
    200
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
            chunk_chars: default_chunk_chars(),
            chunk_overlap_chars: default_chunk_overlap(),
        }
    }
}

impl StoreConfig {
    /// Resolved database path.
    pub fn database_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("docweave.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Interpreter invoked as `<interpreter> -c <program>`
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Captured stdout is cut to this many characters
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
}

fn default_interpreter() -> String {
    "python3".into()
}
fn default_max_output_chars() -> usize {
    8000
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            max_output_chars: default_max_output_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.docweave/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `DOCWEAVE_API_KEY` (highest priority)
    /// - `GROQ_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("DOCWEAVE_API_KEY")
                .or_else(|| lookup("GROQ_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("DOCWEAVE_PROVIDER") {
            self.provider = provider;
        }

        if let Some(model) = lookup("DOCWEAVE_MODEL") {
            self.reasoning.model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".docweave")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.reasoning;
        if !(0.0..=2.0).contains(&r.temperature) {
            return Err(ConfigError::ValidationError(
                "reasoning.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if r.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "reasoning.max_iterations must be at least 1".into(),
            ));
        }

        if r.max_candidates_per_hop == 0 {
            return Err(ConfigError::ValidationError(
                "reasoning.max_candidates_per_hop must be at least 1".into(),
            ));
        }

        if !(-1.0..=1.0).contains(&r.min_similarity) {
            return Err(ConfigError::ValidationError(
                "reasoning.min_similarity must be between -1.0 and 1.0".into(),
            ));
        }

        let timeouts = [
            ("inference_timeout_secs", r.inference_timeout_secs),
            ("retrieval_timeout_secs", r.retrieval_timeout_secs),
            ("embedding_timeout_secs", r.embedding_timeout_secs),
            ("sandbox_timeout_secs", r.sandbox_timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::ValidationError(format!(
                "reasoning.{name} must be greater than 0"
            )));
        }

        if self.store.chunk_chars == 0 || self.store.chunk_overlap_chars >= self.store.chunk_chars {
            return Err(ConfigError::ValidationError(
                "store.chunk_overlap_chars must be smaller than store.chunk_chars".into(),
            ));
        }

        if self.embedding.provider == "hash" && self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            providers: HashMap::new(),
            embedding: EmbeddingConfig::default(),
            reasoning: ReasoningConfig::default(),
            store: StoreConfig::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

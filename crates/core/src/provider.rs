//! Provider traits — the abstraction over model backends.
//!
//! Two capabilities are consumed by the reasoning core:
//! - [`InferenceService`]: prompt in, text (optionally JSON) out
//! - [`Embedder`]: text in, fixed-dimension vector out
//!
//! Implementations: OpenAI-compatible endpoints (Groq, OpenAI, OpenRouter,
//! Ollama) and a local hashing embedder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::{EmbeddingError, InferenceError};

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "llama-3.3-70b-versatile")
    pub model: String,

    /// System instructions
    pub system: String,

    /// The user prompt
    pub prompt: String,

    /// Temperature (0.0 = deterministic)
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// When set, the model is asked for a JSON object matching this schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.0,
            max_tokens: None,
            schema: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// The inference capability.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Provider name (e.g., "groq", "openai").
    fn name(&self) -> &str;

    /// Run a completion and return the raw text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError>;
}

/// The embedding capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed many texts. The default embeds one at a time.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

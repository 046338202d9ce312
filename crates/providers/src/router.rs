//! Provider construction from configuration.
//!
//! Resolves the chat provider and the embedding backend named in
//! [`AppConfig`], filling in well-known endpoints and API keys.

use std::sync::Arc;
use docweave_config::{AppConfig, EmbeddingConfig};
use docweave_core::error::InferenceError;
use docweave_core::provider::{Embedder, InferenceService};
use crate::hashing::HashingEmbedder;
use crate::openai_compat::OpenAiCompatProvider;

/// The model-backed capabilities built from one configuration.
#[derive(Clone)]
pub struct ProviderSet {
    pub inference: Arc<dyn InferenceService>,
    pub embedder: Arc<dyn Embedder>,
}

/// Build the inference provider and embedder from configuration.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderSet, InferenceError> {
    let name = config.provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    let inference: Arc<dyn InferenceService> =
        Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key)?);

    let embedding = &config.embedding;
    let embedder: Arc<dyn Embedder> = match embedding.provider.as_str() {
        "hash" => Arc::new(HashingEmbedder::new(embedding.dimensions)),
        "local" => local_embedder(embedding)?,
        other => {
            let key = embedding
                .api_key
                .clone()
                .or_else(|| config.providers.get(other).and_then(|p| p.api_key.clone()))
                .or_else(|| config.api_key.clone())
                .unwrap_or_default();
            let url = embedding
                .api_url
                .clone()
                .unwrap_or_else(|| default_base_url(other));
            Arc::new(
                OpenAiCompatProvider::new(other, &url, &key)?
                    .with_embedding_model(embedding.model_name()),
            )
        }
    };

    tracing::debug!(
        provider = %name,
        base_url = %base_url,
        embedder = %embedder.name(),
        embedding_model = %embedding.model_name(),
        "Providers configured"
    );

    Ok(ProviderSet { inference, embedder })
}

#[cfg(feature = "local")]
fn local_embedder(embedding: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, InferenceError> {
    let embedder = crate::local::LocalEmbedder::new(embedding.model_name(), embedding.model_cache_dir())
        .map_err(|e| InferenceError::NotConfigured(e.to_string()))?;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "local"))]
fn local_embedder(embedding: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, InferenceError> {
    tracing::warn!(
        model = %embedding.model_name(),
        "Built without the `local` feature; using the hashing embedder"
    );
    Ok(Arc::new(HashingEmbedder::new(embedding.dimensions)))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "groq" => "https://api.groq.com/openai/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

//! Local embedding backend — sentence embeddings on your own hardware.
//!
//! Runs ONNX sentence-transformer models through
//! [fastembed](https://github.com/Anush008/fastembed-rs). The default,
//! `all-MiniLM-L6-v2`, produces 384-dimensional vectors. The model is
//! downloaded into the cache directory on first use and loaded lazily, so
//! building the embedder costs nothing until a text is embedded.

use async_trait::async_trait;
use docweave_core::error::EmbeddingError;
use docweave_core::provider::Embedder;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

// ── Model aliases ─────────────────────────────────────────────────────

/// Resolve a friendly model name to a fastembed model.
pub fn resolve_model(alias: &str) -> Option<EmbeddingModel> {
    let alias = alias.to_ascii_lowercase();
    let alias = alias.trim_start_matches("sentence-transformers/").trim_start_matches("baai/");
    match alias {
        "all-minilm-l6-v2" | "minilm" => Some(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Some(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Some(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Some(EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Some(EmbeddingModel::NomicEmbedTextV15),
        _ => None,
    }
}

// ── Embedder ──────────────────────────────────────────────────────────

/// On-device [`Embedder`] backed by a fastembed model.
///
/// ONNX inference is CPU-bound, so every call runs on the blocking pool.
/// The loaded model sits behind a mutex and is shared by all clones.
#[derive(Clone)]
pub struct LocalEmbedder {
    alias: String,
    model: EmbeddingModel,
    cache_dir: PathBuf,
    engine: Arc<Mutex<Option<TextEmbedding>>>,
}

impl LocalEmbedder {
    pub fn new(alias: &str, cache_dir: impl Into<PathBuf>) -> Result<Self, EmbeddingError> {
        let model = resolve_model(alias)
            .ok_or_else(|| EmbeddingError::NotConfigured(format!("unknown local embedding model '{alias}'")))?;
        Ok(Self {
            alias: alias.to_string(),
            model,
            cache_dir: cache_dir.into(),
            engine: Arc::new(Mutex::new(None)),
        })
    }

    pub fn model_alias(&self) -> &str {
        &self.alias
    }

    fn load(model: EmbeddingModel, cache_dir: PathBuf) -> Result<TextEmbedding, EmbeddingError> {
        info!(model = ?model, cache_dir = %cache_dir.display(), "Loading local embedding model");
        let options = InitOptions::new(model)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(false);
        TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::NotConfigured(format!("failed to load local embedding model: {e}")))
    }
}

impl std::fmt::Debug for LocalEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEmbedder")
            .field("model", &self.alias)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn name(&self) -> &str {
        "local"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::Failed("local model returned no vector".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let engine = Arc::clone(&self.engine);
        let model = self.model.clone();
        let cache_dir = self.cache_dir.clone();
        let texts = texts.to_vec();
        let count = texts.len();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut slot = engine
                .lock()
                .map_err(|_| EmbeddingError::Failed("local embedding model lock poisoned".into()))?;
            let loaded = match slot.take() {
                Some(loaded) => loaded,
                None => Self::load(model, cache_dir)?,
            };
            let loaded = slot.insert(loaded);
            loaded
                .embed(texts, None)
                .map_err(|e| EmbeddingError::Failed(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::Failed(format!("embedding task aborted: {e}")))??;

        if vectors.len() != count {
            return Err(EmbeddingError::Failed(format!(
                "local model returned {} vectors for {count} texts",
                vectors.len()
            )));
        }
        debug!(count, "Embedded texts locally");
        Ok(vectors)
    }
}

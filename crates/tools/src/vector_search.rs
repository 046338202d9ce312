//! Vector search tool — semantic chunk retrieval within one document.

use docweave_core::agent::ReasoningConfig;
use docweave_core::error::{RetrievalError, ToolError};
use docweave_core::memory::{RetrievalService, ScoredChunk};
use docweave_core::provider::Embedder;
use docweave_core::services::Services;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use crate::tool::{ToolBinding, ToolRequest};

/// Returned when a search matches nothing.
pub const NO_CHUNKS: &str = "(No relevant chunks found)";

/// Finds the chunks of one document's collection closest to the query.
pub struct VectorSearchTool {
    binding: ToolBinding,
    collection: String,
    embedder: Arc<dyn Embedder>,
    retrieval: Arc<dyn RetrievalService>,
    top_k: usize,
    embedding_timeout: Duration,
    retrieval_timeout: Duration,
}

impl VectorSearchTool {
    pub fn new(
        binding: ToolBinding,
        collection: impl Into<String>,
        services: &Services,
        config: &ReasoningConfig,
    ) -> Self {
        Self {
            binding,
            collection: collection.into(),
            embedder: Arc::clone(&services.embedder),
            retrieval: Arc::clone(&services.retrieval),
            top_k: config.top_k_chunks,
            embedding_timeout: config.embedding_timeout(),
            retrieval_timeout: config.retrieval_timeout(),
        }
    }

    pub fn binding(&self) -> &ToolBinding {
        &self.binding
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn invoke(&self, request: &ToolRequest) -> Result<String, ToolError> {
        let name = self.binding.name();

        let embedding = tokio::time::timeout(self.embedding_timeout, self.embedder.embed(&request.query))
            .await
            .map_err(|_| ToolError::EmbeddingTimeout {
                tool_name: name.to_string(),
                timeout_secs: self.embedding_timeout.as_secs(),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: e.to_string(),
            })?;

        let hits = tokio::time::timeout(
            self.retrieval_timeout,
            self.retrieval.search(&self.collection, &embedding, self.top_k),
        )
        .await
        .map_err(|_| ToolError::RetrievalTimeout {
            tool_name: name.to_string(),
            timeout_secs: self.retrieval_timeout.as_secs(),
        })?
        .map_err(|e| match e {
            RetrievalError::Timeout { timeout_secs } => ToolError::RetrievalTimeout {
                tool_name: name.to_string(),
                timeout_secs,
            },
            other => ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: other.to_string(),
            },
        })?;

        debug!(tool = %name, hits = hits.len(), "Vector search complete");
        Ok(format_chunks(&hits))
    }
}

/// Render hits as `[Chunk n] text` blocks separated by rules.
pub fn format_chunks(hits: &[ScoredChunk]) -> String {
    if hits.is_empty() {
        return NO_CHUNKS.to_string();
    }
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("[Chunk {}] {}", i + 1, hit.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

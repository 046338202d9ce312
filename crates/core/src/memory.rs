//! Retrieval trait — ranked chunk lookup over per-document collections.
//!
//! Each textual document is chunked and embedded at ingestion time into
//! its own collection. The reasoning core only ever queries by vector.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// A chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Position of the chunk within its document
    pub index: usize,

    pub text: String,

    /// Cosine similarity to the query vector
    pub score: f32,
}

/// A chunk to be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub index: usize,
    pub text: String,

    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// The retrieval capability.
#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Return up to `k` chunks of `collection`, best match first.
    ///
    /// An unknown collection is an error, an empty one is not.
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RetrievalError>;

    /// Replace every chunk of `collection`.
    async fn replace_collection(
        &self,
        collection: &str,
        chunks: Vec<ChunkRecord>,
    ) -> Result<(), RetrievalError>;

    /// Number of chunks stored in `collection`, or `None` if unknown.
    async fn collection_len(&self, collection: &str) -> Result<Option<usize>, RetrievalError>;
}

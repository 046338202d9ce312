//! In-memory retrieval — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use docweave_core::error::RetrievalError;
use docweave_core::memory::{ChunkRecord, RetrievalService, ScoredChunk};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::vector;

/// Named collections of embedded chunks held in a HashMap.
#[derive(Clone, Default)]
pub struct InMemoryRetrieval {
    collections: Arc<RwLock<HashMap<String, Vec<ChunkRecord>>>>,
}

impl InMemoryRetrieval {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all collections, sorted.
    pub async fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl RetrievalService for InMemoryRetrieval {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let collections = self.collections.read().await;
        let chunks = collections
            .get(collection)
            .ok_or_else(|| RetrievalError::CollectionNotFound(collection.to_string()))?;
        Ok(vector::rank_chunks(chunks, query, k))
    }

    async fn replace_collection(
        &self,
        collection: &str,
        mut chunks: Vec<ChunkRecord>,
    ) -> Result<(), RetrievalError> {
        chunks.sort_by_key(|c| c.index);
        self.collections
            .write()
            .await
            .insert(collection.to_string(), chunks);
        Ok(())
    }

    async fn collection_len(&self, collection: &str) -> Result<Option<usize>, RetrievalError> {
        Ok(self.collections.read().await.get(collection).map(Vec::len))
    }
}

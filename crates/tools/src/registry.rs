//! Tool registry and the cross-request registry cache.
//!
//! A registry is the ordered set of tools built for one document set,
//! each paired with the embedding of its description. Registries are
//! immutable once built and shared behind `Arc`.

use docweave_core::document::DocumentSetKey;
use docweave_core::error::ToolError;
use docweave_core::tool::ToolDescriptor;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use crate::tool::Tool;

/// A tool together with its description embedding.
#[derive(Debug)]
pub struct RegisteredTool {
    pub tool: Tool,
    pub embedding: Vec<f32>,
}

/// The tools available for one document set, in insertion order.
#[derive(Debug)]
pub struct ToolRegistry {
    key: DocumentSetKey,
    entries: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
    warnings: Vec<String>,
}

impl ToolRegistry {
    pub fn new(key: DocumentSetKey, entries: Vec<RegisteredTool>, warnings: Vec<String>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.tool.name().to_string(), i))
            .collect();
        Self {
            key,
            entries,
            index,
            warnings,
        }
    }

    /// A registry with no tools.
    pub fn empty(key: DocumentSetKey) -> Self {
        Self::new(key, Vec::new(), Vec::new())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Result<&Tool, ToolError> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i].tool)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Entries in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[RegisteredTool] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.tool.name()).collect()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|e| e.tool.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Documents skipped while building, one line each.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn key(&self) -> &DocumentSetKey {
        &self.key
    }
}

/// Registries keyed by document set.
///
/// Builds happen outside the lock. Two concurrent builds for the same key
/// both complete and the later insert wins; builds are deterministic, so
/// either result is equivalent.
#[derive(Debug, Default, Clone)]
pub struct RegistryCache {
    entries: Arc<RwLock<HashMap<DocumentSetKey, Arc<ToolRegistry>>>>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &DocumentSetKey) -> Option<Arc<ToolRegistry>> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn insert(&self, registry: ToolRegistry) -> Arc<ToolRegistry> {
        let registry = Arc::new(registry);
        self.entries
            .write()
            .await
            .insert(registry.key().clone(), Arc::clone(&registry));
        registry
    }

    /// Return the cached registry for `key`, building and caching it on a miss.
    pub async fn get_or_build<F, Fut, E>(&self, key: &DocumentSetKey, build: F) -> Result<Arc<ToolRegistry>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ToolRegistry, E>>,
    {
        if let Some(hit) = self.get(key).await {
            debug!(key = %key, "Registry cache hit");
            return Ok(hit);
        }
        debug!(key = %key, "Registry cache miss, building");
        let registry = build().await?;
        Ok(self.insert(registry).await)
    }

    /// Drop the cached registry for `key`, e.g. after re-ingesting a document.
    pub async fn invalidate(&self, key: &DocumentSetKey) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

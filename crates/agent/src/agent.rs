//! The document agent — the exposed `run(query, documents)` contract.
//!
//! Builds (or reuses) the tool registry for the enabled documents and hands
//! it to the reasoning loop. Registries are cached by document-set identity
//! and shared between concurrent runs.

use docweave_core::agent::ReasoningConfig;
use docweave_core::document::{Document, DocumentSetKey};
use docweave_core::event::ReasoningEventBus;
use docweave_core::services::Services;
use docweave_tools::{RegistryCache, ToolFactory, ToolRegistry};
use std::sync::Arc;
use tracing::warn;

use crate::error::AgentError;
use crate::loop_runner::{ReasoningLoop, ReasoningOutcome};

pub struct DocumentAgent {
    factory: ToolFactory,
    cache: RegistryCache,
    reasoning: ReasoningLoop,
}

impl DocumentAgent {
    pub fn new(services: Services, config: ReasoningConfig) -> Self {
        let config = Arc::new(config);
        let reasoning = ReasoningLoop::new(
            Arc::clone(&services.inference),
            Arc::clone(&services.embedder),
            Arc::clone(&config),
        );
        Self {
            factory: ToolFactory::new(services, config),
            cache: RegistryCache::new(),
            reasoning,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<ReasoningEventBus>) -> Self {
        self.reasoning = self.reasoning.with_event_bus(bus);
        self
    }

    /// Share a registry cache with other agents.
    pub fn with_cache(mut self, cache: RegistryCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &RegistryCache {
        &self.cache
    }

    pub fn config(&self) -> &ReasoningConfig {
        self.reasoning.config()
    }

    /// The registry for `documents`, built on first use.
    pub async fn try_registry_for(&self, documents: &[Document]) -> Result<Arc<ToolRegistry>, AgentError> {
        let key = DocumentSetKey::of(documents);
        self.cache
            .get_or_build(&key, || self.factory.build(documents))
            .await
            .map_err(|e| AgentError::Registry(e.to_string()))
    }

    /// Like [`try_registry_for`](Self::try_registry_for), but a failed build
    /// degrades to an empty, uncached registry so the query can still be
    /// answered without tools.
    pub async fn registry_for(&self, documents: &[Document]) -> Arc<ToolRegistry> {
        match self.try_registry_for(documents).await {
            Ok(registry) => registry,
            Err(e) => {
                warn!(error = %e, documents = documents.len(), "Tool registry unavailable, answering without tools");
                Arc::new(ToolRegistry::empty(DocumentSetKey::of(documents)))
            }
        }
    }

    /// Answer `query` over the enabled `documents`.
    pub async fn run(&self, query: &str, documents: &[Document]) -> Result<ReasoningOutcome, AgentError> {
        let registry = self.registry_for(documents).await;
        for warning in registry.warnings() {
            warn!(key = %registry.key(), "{warning}");
        }
        self.reasoning.run(query, &registry).await
    }
}

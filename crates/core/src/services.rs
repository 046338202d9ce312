//! The bundle of external capabilities a reasoning run depends on.

use std::sync::Arc;
use crate::memory::RetrievalService;
use crate::provider::{Embedder, InferenceService};
use crate::sandbox::ExecutionSandbox;

/// Shared handles to the four capabilities. Cloning is cheap.
#[derive(Clone)]
pub struct Services {
    pub inference: Arc<dyn InferenceService>,
    pub embedder: Arc<dyn Embedder>,
    pub retrieval: Arc<dyn RetrievalService>,
    pub sandbox: Arc<dyn ExecutionSandbox>,
}

impl Services {
    pub fn new(
        inference: Arc<dyn InferenceService>,
        embedder: Arc<dyn Embedder>,
        retrieval: Arc<dyn RetrievalService>,
        sandbox: Arc<dyn ExecutionSandbox>,
    ) -> Self {
        Self {
            inference,
            embedder,
            retrieval,
            sandbox,
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("inference", &self.inference.name())
            .field("embedder", &self.embedder.name())
            .field("retrieval", &self.retrieval.name())
            .field("sandbox", &self.sandbox.name())
            .finish()
    }
}

//! Shared test doubles for the reasoning loop.

use async_trait::async_trait;
use docweave_core::agent::ReasoningConfig;
use docweave_core::document::{Document, DocumentSetKey};
use docweave_core::error::{EmbeddingError, InferenceError, RetrievalError, SandboxError};
use docweave_core::memory::{ChunkRecord, RetrievalService, ScoredChunk};
use docweave_core::provider::{CompletionRequest, Embedder, InferenceService};
use docweave_core::sandbox::{ExecutionSandbox, SandboxOutput, TableHandle};
use docweave_core::services::Services;
use docweave_providers::HashingEmbedder;
use docweave_tools::{RegisteredTool, SummaryTool, Tool, ToolBinding, ToolRegistry};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An inference service that returns a sequence of scripted replies.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedInference {
    replies: Mutex<VecDeque<Result<String, InferenceError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedInference {
    pub fn new(replies: Vec<Result<String, InferenceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call succeeds with the given texts, in order.
    pub fn texts(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for ScriptedInference {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError> {
        let mut requests = self.requests.lock().unwrap();
        let call = requests.len();
        requests.push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedInference: no more replies (call #{call})"))
    }
}

enum EmbedMode {
    Hashing(HashingEmbedder),
    Fixed(Vec<f32>),
    Failing,
}

/// Embedder that counts calls. Hashes text by default.
pub struct HashEmbedder {
    mode: EmbedMode,
    calls: Mutex<usize>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_mode(EmbedMode::Hashing(HashingEmbedder::default()))
    }

    /// Always returns `vector`.
    pub fn fixed(vector: Vec<f32>) -> Self {
        Self::with_mode(EmbedMode::Fixed(vector))
    }

    pub fn failing() -> Self {
        Self::with_mode(EmbedMode::Failing)
    }

    fn with_mode(mode: EmbedMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "test_hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        *self.calls.lock().unwrap() += 1;
        match &self.mode {
            EmbedMode::Hashing(h) => Ok(h.vectorize(text)),
            EmbedMode::Fixed(v) => Ok(v.clone()),
            EmbedMode::Failing => Err(EmbeddingError::Failed("embedder offline".into())),
        }
    }
}

/// Retrieval with fixed hits per collection, or a forced timeout.
#[derive(Default)]
pub struct StaticRetrieval {
    hits: HashMap<String, Vec<ScoredChunk>>,
    timing_out: bool,
    calls: Mutex<usize>,
}

impl StaticRetrieval {
    pub fn with_hits(mut self, collection: &str, texts: &[&str]) -> Self {
        let hits = texts
            .iter()
            .enumerate()
            .map(|(index, text)| ScoredChunk {
                index,
                text: text.to_string(),
                score: 1.0 - index as f32 * 0.1,
            })
            .collect();
        self.hits.insert(collection.to_string(), hits);
        self
    }

    /// Every search fails with a retrieval timeout.
    pub fn timing_out() -> Self {
        Self {
            timing_out: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl RetrievalService for StaticRetrieval {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, collection: &str, _query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, RetrievalError> {
        *self.calls.lock().unwrap() += 1;
        if self.timing_out {
            return Err(RetrievalError::Timeout { timeout_secs: 15 });
        }
        let hits = self
            .hits
            .get(collection)
            .ok_or_else(|| RetrievalError::CollectionNotFound(collection.to_string()))?;
        Ok(hits.iter().take(k).cloned().collect())
    }

    async fn replace_collection(&self, _collection: &str, _chunks: Vec<ChunkRecord>) -> Result<(), RetrievalError> {
        Ok(())
    }

    async fn collection_len(&self, collection: &str) -> Result<Option<usize>, RetrievalError> {
        Ok(self.hits.get(collection).map(Vec::len))
    }
}

/// Replays queued sandbox outcomes; succeeds with "42" once they run out.
#[derive(Default)]
pub struct ScriptedSandbox {
    outcomes: Mutex<VecDeque<Result<String, SandboxError>>>,
    calls: Mutex<usize>,
}

impl ScriptedSandbox {
    pub fn new(outcomes: Vec<Result<String, SandboxError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ExecutionSandbox for ScriptedSandbox {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, _snippet: &str, _table: &TableHandle, _timeout: Duration) -> Result<SandboxOutput, SandboxError> {
        *self.calls.lock().unwrap() += 1;
        let next = self.outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok("42".into()))
            .map(|stdout| SandboxOutput { stdout, duration_ms: 1 })
    }
}

pub fn services(
    inference: Arc<dyn InferenceService>,
    embedder: Arc<dyn Embedder>,
    retrieval: Arc<dyn RetrievalService>,
    sandbox: Arc<dyn ExecutionSandbox>,
) -> Services {
    Services::new(inference, embedder, retrieval, sandbox)
}

/// A registry of summary tools with hand-picked description embeddings.
///
/// Each tool answers with "summary of <name>" without calling a model.
pub fn registry_with(tools: &[(&str, Vec<f32>)]) -> ToolRegistry {
    let services = services(
        Arc::new(ScriptedInference::new(Vec::new())),
        Arc::new(HashEmbedder::new()),
        Arc::new(StaticRetrieval::default()),
        Arc::new(ScriptedSandbox::default()),
    );
    let config = ReasoningConfig::default();
    let mut documents = Vec::new();
    let entries = tools
        .iter()
        .map(|(name, embedding)| {
            let doc = Document::new(*name, format!("/docs/{name}.txt")).with_summary(format!("summary of {name}"));
            let binding = ToolBinding::new(*name, format!("overview of {name}"), &doc.id, &doc.name);
            let tool = Tool::Summary(SummaryTool::new(binding, &doc, &services, &config));
            documents.push(doc);
            RegisteredTool {
                tool,
                embedding: embedding.clone(),
            }
        })
        .collect();
    ToolRegistry::new(DocumentSetKey::of(&documents), entries, Vec::new())
}

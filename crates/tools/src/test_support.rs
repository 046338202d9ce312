//! Test doubles for tool tests.

use async_trait::async_trait;
use docweave_core::error::{InferenceError, SandboxError};
use docweave_core::provider::{CompletionRequest, InferenceService};
use docweave_core::sandbox::{ExecutionSandbox, SandboxOutput, TableHandle};
use docweave_core::services::Services;
use docweave_memory::InMemoryRetrieval;
use docweave_providers::HashingEmbedder;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

/// Replays queued replies, then falls back to a fixed reply.
#[derive(Default)]
pub struct EchoInference {
    replies: Mutex<VecDeque<Result<String, InferenceError>>>,
    prompts: Mutex<Vec<String>>,
}

impl EchoInference {
    pub fn with_replies(replies: Vec<Result<String, InferenceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for EchoInference {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError> {
        self.prompts.lock().unwrap().push(request.prompt);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("print(42)".into()))
    }
}

/// Replays queued sandbox outcomes and records the snippets it was given.
#[derive(Default)]
pub struct ScriptedSandbox {
    outcomes: Mutex<VecDeque<Result<String, SandboxError>>>,
    snippets: Mutex<Vec<String>>,
}

impl ScriptedSandbox {
    pub fn new(outcomes: Vec<Result<String, SandboxError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            snippets: Mutex::new(Vec::new()),
        }
    }

    pub fn snippets(&self) -> Vec<String> {
        self.snippets.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionSandbox for ScriptedSandbox {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, snippet: &str, _table: &TableHandle, _timeout: Duration) -> Result<SandboxOutput, SandboxError> {
        self.snippets.lock().unwrap().push(snippet.to_string());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("42".into()));
        outcome.map(|stdout| SandboxOutput { stdout, duration_ms: 1 })
    }
}

pub fn services(inference: Arc<dyn InferenceService>) -> Services {
    services_with(inference, Arc::new(ScriptedSandbox::default()), InMemoryRetrieval::default())
}

pub fn services_with(
    inference: Arc<dyn InferenceService>,
    sandbox: Arc<dyn ExecutionSandbox>,
    retrieval: InMemoryRetrieval,
) -> Services {
    Services::new(inference, Arc::new(HashingEmbedder::default()), Arc::new(retrieval), sandbox)
}

//! End-to-end integration tests for the DocWeave reasoning agent.
//!
//! These tests exercise the full pipeline from a document set and a query
//! to an answer: tool factory, description embedding, selection, tool
//! execution with retries, deciding, and answering.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docweave_agent::{AgentError, AnswerKind, DocumentAgent};
use docweave_core::agent::ReasoningConfig;
use docweave_core::document::{ColumnSchema, ColumnType, Document, TableSchema};
use docweave_core::error::{EmbeddingError, InferenceError, RetrievalError, SandboxError};
use docweave_core::memory::{ChunkRecord, RetrievalService, ScoredChunk};
use docweave_core::provider::{CompletionRequest, Embedder, InferenceService};
use docweave_core::sandbox::{ExecutionSandbox, SandboxOutput, TableHandle};
use docweave_core::services::Services;
use docweave_core::tool::ToolKind;
use docweave_memory::InMemoryRetrieval;

// ── Mock Inference ───────────────────────────────────────────────────────

/// Replies to decision requests (those carrying a schema) and to every
/// other request from separate queues. Panics when a queue runs dry.
struct ScriptedInference {
    decisions: Mutex<VecDeque<Result<String, InferenceError>>>,
    texts: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedInference {
    fn new(decisions: &[&str], texts: &[&str]) -> Self {
        Self {
            decisions: Mutex::new(decisions.iter().map(|d| Ok(d.to_string())).collect()),
            texts: Mutex::new(texts.iter().map(|t| t.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing_decision(error: InferenceError) -> Self {
        let inference = Self::new(&[], &[]);
        inference.decisions.lock().unwrap().push_back(Err(error));
        inference
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for ScriptedInference {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError> {
        let is_decision = request.schema.is_some();
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        if is_decision {
            self.decisions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("ScriptedInference: no decision left (call #{call})"))
        } else {
            let text = self.texts.lock().unwrap().pop_front();
            Ok(text.unwrap_or_else(|| panic!("ScriptedInference: no text reply left (call #{call})")))
        }
    }
}

/// Answers every decision with "continue" and every other request with
/// `text`. Used where the number of calls is the thing under test.
struct StubbornInference {
    text: String,
    calls: Mutex<usize>,
}

impl StubbornInference {
    fn new(text: &str) -> Self {
        Self {
            text: text.into(),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl InferenceService for StubbornInference {
    fn name(&self) -> &str {
        "stubborn"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError> {
        *self.calls.lock().unwrap() += 1;
        if request.schema.is_some() {
            Ok(r#"{"action": "continue", "next_sub_question": "what further facts exist?", "reasoning": "not enough"}"#.into())
        } else {
            Ok(self.text.clone())
        }
    }
}

// ── Mock Embedder ────────────────────────────────────────────────────────

const VOCABULARY: &[&str] = &["aggregate", "overview", "facts", "revenue", "weather"];

/// One dimension per vocabulary word, counting occurrences. Text with
/// none of the words embeds to the zero vector.
struct KeywordEmbedder;

impl KeywordEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        VOCABULARY.iter().map(|w| lower.matches(w).count() as f32).collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(Self::vector(text))
    }
}

// ── Mock Retrieval & Sandbox ─────────────────────────────────────────────

/// Every search times out.
#[derive(Default)]
struct TimingOutRetrieval {
    calls: Mutex<usize>,
}

#[async_trait]
impl RetrievalService for TimingOutRetrieval {
    fn name(&self) -> &str {
        "timing_out"
    }

    async fn search(&self, _collection: &str, _query: &[f32], _k: usize) -> Result<Vec<ScoredChunk>, RetrievalError> {
        *self.calls.lock().unwrap() += 1;
        Err(RetrievalError::Timeout { timeout_secs: 15 })
    }

    async fn replace_collection(&self, _collection: &str, _chunks: Vec<ChunkRecord>) -> Result<(), RetrievalError> {
        Ok(())
    }

    async fn collection_len(&self, _collection: &str) -> Result<Option<usize>, RetrievalError> {
        Ok(Some(0))
    }
}

/// Replays one outcome for every run and records what it was asked to run.
struct RecordingSandbox {
    outcome: Result<String, SandboxError>,
    runs: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingSandbox {
    fn ok(stdout: &str) -> Self {
        Self {
            outcome: Ok(stdout.into()),
            runs: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            outcome: Err(SandboxError::Runtime {
                message: message.into(),
            }),
            runs: Mutex::new(Vec::new()),
        }
    }

    fn runs(&self) -> Vec<(String, PathBuf)> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionSandbox for RecordingSandbox {
    fn name(&self) -> &str {
        "recording"
    }

    async fn run(&self, snippet: &str, table: &TableHandle, _timeout: Duration) -> Result<SandboxOutput, SandboxError> {
        self.runs
            .lock()
            .unwrap()
            .push((snippet.to_string(), table.path.clone()));
        self.outcome.clone().map(|stdout| SandboxOutput { stdout, duration_ms: 3 })
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

fn sales_table() -> Document {
    Document::new("sales-1", "/data/sales.csv").with_table(TableSchema {
        columns: vec![
            ColumnSchema {
                name: "region".into(),
                dtype: ColumnType::Text,
            },
            ColumnSchema {
                name: "revenue".into(),
                dtype: ColumnType::Float,
            },
        ],
        row_count: Some(4),
    })
}

fn report() -> Document {
    Document::new("report-1", "/data/report.txt")
        .with_text("Northern sales grew. Southern sales fell.")
        .with_summary("Quarterly results for the northern and southern regions.")
}

fn handbook() -> Document {
    Document::new("handbook-1", "/data/handbook.md").with_summary("Employee policies and benefits.")
}

fn services(
    inference: Arc<dyn InferenceService>,
    retrieval: Arc<dyn RetrievalService>,
    sandbox: Arc<dyn ExecutionSandbox>,
) -> Services {
    Services::new(inference, Arc::new(KeywordEmbedder), retrieval, sandbox)
}

/// Retrieval holding one chunk per collection for the given documents.
async fn indexed(documents: &[Document], chunk: &str) -> Arc<InMemoryRetrieval> {
    let retrieval = Arc::new(InMemoryRetrieval::new());
    for doc in documents {
        retrieval
            .replace_collection(
                &doc.collection,
                vec![ChunkRecord {
                    index: 0,
                    text: chunk.into(),
                    embedding: KeywordEmbedder::vector(chunk),
                }],
            )
            .await
            .unwrap();
    }
    retrieval
}

const FINAL_4200: &str = r#"{"action": "final_answer", "answer": "Total revenue is 4200.", "reasoning": "summed the revenue column"}"#;

// ── Spreadsheet scenario ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_spreadsheet_question_answered_in_one_hop() {
    let inference = Arc::new(ScriptedInference::new(
        &[FINAL_4200],
        &["```python\nprint(df['revenue'].sum())\n```"],
    ));
    let sandbox = Arc::new(RecordingSandbox::ok("4200.0"));
    let agent = DocumentAgent::new(
        services(inference.clone(), Arc::new(InMemoryRetrieval::new()), sandbox.clone()),
        ReasoningConfig::default(),
    );
    let documents = vec![sales_table()];

    let registry = agent.try_registry_for(&documents).await.unwrap();
    assert_eq!(registry.names(), vec!["tabular_analysis_sales"]);

    let outcome = agent.run("What is the aggregate revenue?", &documents).await.unwrap();

    assert_eq!(outcome.kind, AnswerKind::Decided);
    assert_eq!(outcome.answer, "Total revenue is 4200.");
    assert_eq!(outcome.iterations, 1);

    let steps = outcome.steps();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].tool_name, "tabular_analysis_sales");
    assert_eq!(steps[0].tool_kind, ToolKind::TabularAnalysis);
    assert!(steps[0].observation.success);
    assert!(steps[0].observation.result.contains("4200.0"));
    assert!(steps[0].score > 0.9);

    // Only the schema reaches the model; the sandbox reads the file
    let requests = inference.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].prompt.contains("revenue (float)"));
    let runs = sandbox.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, "print(df['revenue'].sum())");
    assert_eq!(runs[0].1, PathBuf::from("/data/sales.csv"));
}

// ── Empty document set ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_empty_document_set_answers_directly() {
    let inference = Arc::new(ScriptedInference::new(&[], &["Paris is the capital of France."]));
    let agent = DocumentAgent::new(
        services(
            inference.clone(),
            Arc::new(InMemoryRetrieval::new()),
            Arc::new(RecordingSandbox::ok("")),
        ),
        ReasoningConfig::default(),
    );

    let outcome = agent.run("What is the capital of France?", &[]).await.unwrap();

    assert_eq!(outcome.kind, AnswerKind::Direct);
    assert_eq!(outcome.answer, "Paris is the capital of France.");
    assert_eq!(outcome.iterations, 0);
    assert!(outcome.steps().is_empty());
    assert_eq!(inference.calls(), 1);
    assert!(inference.requests()[0].prompt.contains("QUESTION: What is the capital of France?"));
}

// ── Double timeout ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_retrieval_timeouts_advance_to_next_candidate() {
    let inference = Arc::new(ScriptedInference::new(
        &[r#"{"action": "final_answer", "answer": "The report covers quarterly results."}"#],
        &[],
    ));
    let retrieval = Arc::new(TimingOutRetrieval::default());
    let agent = DocumentAgent::new(
        services(inference.clone(), retrieval.clone(), Arc::new(RecordingSandbox::ok(""))),
        ReasoningConfig::default(),
    );

    let outcome = agent
        .run("Which facts back the overview? List the facts.", &[report()])
        .await
        .unwrap();

    let steps = outcome.steps();
    assert_eq!(steps.len(), 2);

    assert_eq!(steps[0].tool_name, "vector_search_report");
    assert!(!steps[0].observation.success);
    assert_eq!(steps[0].observation.attempts, 2);
    assert!(steps[0].observation.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(*retrieval.calls.lock().unwrap(), 2);

    assert_eq!(steps[1].tool_name, "summary_report");
    assert!(steps[1].observation.success);
    assert!(steps[1].observation.result.contains("Quarterly results"));
    assert!(steps[0].score > steps[1].score);

    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.kind, AnswerKind::Decided);
    // The summary was precomputed, so only the decision hit the model
    assert_eq!(inference.calls(), 1);
}

// ── Threshold fallback ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_irrelevant_query_falls_back_to_direct_answer() {
    let inference = Arc::new(ScriptedInference::new(&[], &["It will probably rain."]));
    let documents = vec![report(), sales_table()];
    let agent = DocumentAgent::new(
        services(
            inference.clone(),
            indexed(&documents, "facts").await,
            Arc::new(RecordingSandbox::ok("")),
        ),
        ReasoningConfig::default(),
    );

    let outcome = agent.run("Will the weather turn?", &documents).await.unwrap();

    assert_eq!(outcome.kind, AnswerKind::Direct);
    assert!(outcome.steps().is_empty());
    assert_eq!(inference.calls(), 1);
    assert!(inference.requests()[0].prompt.contains("No document in the current selection"));
}

// ── Determinism ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_registry_is_independent_of_document_order() {
    let make_agent = || {
        DocumentAgent::new(
            services(
                Arc::new(ScriptedInference::new(&[], &[])),
                Arc::new(InMemoryRetrieval::new()),
                Arc::new(RecordingSandbox::ok("")),
            ),
            ReasoningConfig::default(),
        )
    };

    let forward = make_agent()
        .try_registry_for(&[report(), sales_table(), handbook()])
        .await
        .unwrap();
    let backward = make_agent()
        .try_registry_for(&[handbook(), sales_table(), report()])
        .await
        .unwrap();

    assert_eq!(
        forward.names(),
        vec![
            "vector_search_handbook",
            "summary_handbook",
            "vector_search_report",
            "summary_report",
            "tabular_analysis_sales",
        ]
    );
    assert_eq!(forward.names(), backward.names());
    for (a, b) in forward.iter().zip(backward.iter()) {
        assert_eq!(a.tool.description(), b.tool.description());
        assert_eq!(a.embedding, b.embedding);
    }
}

#[tokio::test]
async fn e2e_same_inputs_same_trace() {
    async fn run_once(documents: Vec<Document>) -> (String, Vec<String>) {
        let inference = Arc::new(ScriptedInference::new(&[FINAL_4200], &["print(4200)"]));
        let agent = DocumentAgent::new(
            services(
                inference,
                indexed(&documents, "revenue facts").await,
                Arc::new(RecordingSandbox::ok("4200")),
            ),
            ReasoningConfig::default(),
        );
        let outcome = agent
            .run("What is the aggregate revenue? Any facts?", &documents)
            .await
            .unwrap();
        let tools = outcome.steps().iter().map(|s| s.tool_name.clone()).collect();
        (outcome.answer, tools)
    }

    let first = run_once(vec![report(), sales_table()]).await;
    let second = run_once(vec![sales_table(), report()]).await;
    assert_eq!(first, second);
    assert_eq!(first.1[0], "tabular_analysis_sales");
}

#[tokio::test]
async fn e2e_registry_cached_across_queries() {
    let inference = Arc::new(ScriptedInference::new(&[], &["a", "b"]));
    let agent = DocumentAgent::new(
        services(
            inference,
            Arc::new(InMemoryRetrieval::new()),
            Arc::new(RecordingSandbox::ok("")),
        ),
        ReasoningConfig::default(),
    );
    let documents = vec![report(), handbook()];

    let first = agent.try_registry_for(&documents).await.unwrap();
    agent.run("weather?", &documents).await.unwrap();
    agent.run("weather again?", &[handbook(), report()]).await.unwrap();
    let second = agent.try_registry_for(&[handbook(), report(), report()]).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(agent.cache().len().await, 1);
}

// ── Bounded termination ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_never_answerable_stops_at_hop_budget() {
    let inference = Arc::new(StubbornInference::new("Partial answer from what was found."));
    let documents = vec![report()];
    let config = ReasoningConfig {
        max_iterations: 2,
        ..ReasoningConfig::default()
    };
    let caveat = config.incomplete_caveat.clone();
    let agent = DocumentAgent::new(
        services(
            inference.clone(),
            indexed(&documents, "Northern sales grew, these are the facts.").await,
            Arc::new(RecordingSandbox::ok("")),
        ),
        config,
    );

    let outcome = agent.run("What are the key facts?", &documents).await.unwrap();

    assert_eq!(outcome.kind, AnswerKind::Degraded);
    assert!(outcome.is_degraded());
    assert_eq!(outcome.iterations, 2);
    assert!(outcome.answer.starts_with("Partial answer from what was found."));
    assert!(outcome.answer.ends_with(&caveat));
    // Two decisions plus one synthesis
    assert_eq!(inference.calls(), 3);

    let iterations: Vec<u32> = outcome.steps().iter().map(|s| s.iteration).collect();
    assert!(iterations.iter().all(|i| (1..=2).contains(i)));
    // The second hop works on the sub-question
    let second_hop = outcome.steps().iter().find(|s| s.iteration == 2).unwrap();
    assert_eq!(second_hop.observation.input, "what further facts exist?");
}

// ── Tabular runtime error ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_tabular_runtime_error_becomes_failed_observation() {
    let inference = Arc::new(ScriptedInference::new(
        &[r#"{"action": "final_answer", "answer": "The table has no revenue column."}"#],
        &[
            "print(df['revenue'].sum())",
            "print(df['Revenue'].sum())",
            "print(df['REVENUE'].sum())",
        ],
    ));
    let sandbox = Arc::new(RecordingSandbox::failing("KeyError: 'revenue'"));
    let config = ReasoningConfig {
        per_tool_retries: 0,
        tabular_max_retries: 2,
        ..ReasoningConfig::default()
    };
    let agent = DocumentAgent::new(
        services(inference.clone(), Arc::new(InMemoryRetrieval::new()), sandbox.clone()),
        config,
    );

    let outcome = agent.run("Aggregate revenue by region", &[sales_table()]).await.unwrap();

    let steps = outcome.steps();
    assert_eq!(steps.len(), 1);
    assert!(!steps[0].observation.success);
    let error = steps[0].observation.error.as_deref().unwrap();
    assert!(!error.is_empty());
    assert!(error.contains("KeyError"));

    assert_eq!(sandbox.runs().len(), 3);
    // Each regeneration sees the previous failure
    let requests = inference.requests();
    assert!(requests[1].prompt.contains("KeyError"));
    assert_eq!(outcome.kind, AnswerKind::Decided);
    assert_eq!(inference.calls(), 4);
}

// ── Inference failure ────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_inference_outage_while_deciding_is_fatal_with_trace() {
    let inference = Arc::new(ScriptedInference::failing_decision(InferenceError::Unavailable(
        "connection refused".into(),
    )));
    let agent = DocumentAgent::new(
        services(inference, Arc::new(InMemoryRetrieval::new()), Arc::new(RecordingSandbox::ok(""))),
        ReasoningConfig::default(),
    );

    let err = agent
        .run("Give me an overview", &[handbook()])
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Inference { stage: "deciding", .. }));
    let trace = err.trace().unwrap();
    assert_eq!(trace.len(), 1);
    assert_eq!(trace.steps()[0].tool_name, "summary_handbook");
}

// ── Concurrency ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_concurrent_runs_share_one_agent() {
    let inference = Arc::new(StubbornInference::new("Whatever was found."));
    let documents = vec![report(), handbook()];
    let config = ReasoningConfig {
        max_iterations: 1,
        ..ReasoningConfig::default()
    };
    let agent = Arc::new(DocumentAgent::new(
        services(
            inference.clone(),
            indexed(&documents, "facts").await,
            Arc::new(RecordingSandbox::ok("")),
        ),
        config,
    ));

    let a = {
        let agent = Arc::clone(&agent);
        let documents = documents.clone();
        tokio::spawn(async move { agent.run("facts please", &documents).await })
    };
    let b = {
        let agent = Arc::clone(&agent);
        let documents = documents.clone();
        tokio::spawn(async move { agent.run("an overview please", &documents).await })
    };

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.iterations, 1);
    assert_eq!(b.iterations, 1);
    assert_eq!(a.steps()[0].tool_name, "vector_search_handbook");
    assert_eq!(b.steps()[0].tool_name, "summary_handbook");
    assert_eq!(inference.calls(), 4);
}

//! Tool selector — rank registry tools against the current focus.
//!
//! Ranking is cosine similarity between the focus embedding and each
//! tool's description embedding. Scores within `tie_epsilon` of each other
//! fall back to registry order. Tools already tried on the same input are
//! moved behind untried ones, and tools that failed on it go last.

use docweave_core::agent::ReasoningConfig;
use docweave_core::provider::Embedder;
use docweave_core::trace::Scratchpad;
use docweave_memory::cosine_similarity;
use docweave_tools::ToolRegistry;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Ordering class of a candidate within one ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Not yet tried on this input
    Fresh,
    /// Already succeeded on this input
    Repeat,
    /// Last attempt on this input failed
    Failed,
}

/// One ranked tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Index into the registry
    pub position: usize,
    pub tool_name: String,
    pub score: f32,
    pub priority: Priority,
}

impl Candidate {
    pub fn is_deprioritized(&self) -> bool {
        self.priority != Priority::Fresh
    }
}

/// Rank every tool in `registry` for `focus`.
///
/// Returns an empty list when the registry is empty or the best raw score
/// is below `min_similarity`.
pub fn rank(
    focus_embedding: &[f32],
    focus: &str,
    scratchpad: &Scratchpad,
    registry: &ToolRegistry,
    min_similarity: f32,
    tie_epsilon: f32,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = registry
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let name = entry.tool.name();
            let priority = match scratchpad.last_outcome(name, focus) {
                None => Priority::Fresh,
                Some(true) => Priority::Repeat,
                Some(false) => Priority::Failed,
            };
            Candidate {
                position,
                tool_name: name.to_string(),
                score: cosine_similarity(focus_embedding, &entry.embedding),
                priority,
            }
        })
        .collect();

    let top = candidates.iter().map(|c| c.score).fold(f32::NEG_INFINITY, f32::max);
    if candidates.is_empty() || top < min_similarity {
        debug!(top_score = top, min_similarity, "No tool clears the similarity threshold");
        return Vec::new();
    }

    candidates.sort_by_key(|c| (c.priority, Reverse(score_bucket(c.score, tie_epsilon)), c.position));
    candidates
}

/// Scores quantized to `epsilon` so near-equal scores compare equal.
fn score_bucket(score: f32, epsilon: f32) -> i64 {
    let step = f64::from(epsilon.max(f32::EPSILON));
    (f64::from(score) / step).round() as i64
}

/// Per-run selector. Embeddings of each distinct focus text are computed
/// once and reused across hops.
pub struct ToolSelector {
    embedder: Arc<dyn Embedder>,
    min_similarity: f32,
    tie_epsilon: f32,
    embedding_timeout: Duration,
    cache: HashMap<String, Vec<f32>>,
}

impl ToolSelector {
    pub fn new(embedder: Arc<dyn Embedder>, config: &ReasoningConfig) -> Self {
        Self {
            embedder,
            min_similarity: config.min_similarity,
            tie_epsilon: config.tie_epsilon,
            embedding_timeout: config.embedding_timeout(),
            cache: HashMap::new(),
        }
    }

    /// Rank the registry for the scratchpad's current focus.
    ///
    /// An embedding failure yields no candidates, which sends the loop to
    /// answering with what it already has.
    pub async fn select(&mut self, scratchpad: &Scratchpad, registry: &ToolRegistry) -> Vec<Candidate> {
        if registry.is_empty() {
            return Vec::new();
        }
        let (min_similarity, tie_epsilon) = (self.min_similarity, self.tie_epsilon);
        let focus = scratchpad.current_focus().to_string();
        let Some(embedding) = self.embedding_for(&focus).await else {
            return Vec::new();
        };
        rank(embedding, &focus, scratchpad, registry, min_similarity, tie_epsilon)
    }

    async fn embedding_for(&mut self, text: &str) -> Option<&[f32]> {
        if !self.cache.contains_key(text) {
            let embedded = tokio::time::timeout(self.embedding_timeout, self.embedder.embed(text)).await;
            let vector = match embedded {
                Ok(Ok(vector)) => vector,
                Ok(Err(e)) => {
                    warn!(error = %e, "Could not embed focus text");
                    return None;
                }
                Err(_) => {
                    warn!(timeout_secs = self.embedding_timeout.as_secs(), "Embedding focus text timed out");
                    return None;
                }
            };
            self.cache.insert(text.to_string(), vector);
        }
        self.cache.get(text).map(Vec::as_slice)
    }

    /// Number of distinct texts embedded so far.
    pub fn cached_embeddings(&self) -> usize {
        self.cache.len()
    }
}

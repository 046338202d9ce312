//! Reasoning configuration, threaded explicitly into the agent at construction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of the reasoning loop, the tool selector, and the tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Model used for decisions, synthesis, summaries, and snippets
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum decision cycles per query (safety limit)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Extra attempts per candidate tool within one hop
    #[serde(default = "default_per_tool_retries")]
    pub per_tool_retries: u32,

    /// Candidates tried per hop before the hop is given up
    #[serde(default = "default_max_candidates")]
    pub max_candidates_per_hop: usize,

    /// Top selector score below which the loop answers without tools
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Scores closer than this are treated as tied
    #[serde(default = "default_tie_epsilon")]
    pub tie_epsilon: f32,

    /// Snippet regenerations after a sandbox error
    #[serde(default = "default_tabular_retries")]
    pub tabular_max_retries: u32,

    #[serde(default = "default_top_k")]
    pub top_k_chunks: usize,

    /// Character budget of the rendered scratchpad
    #[serde(default = "default_scratchpad_chars")]
    pub max_scratchpad_chars: usize,

    /// Per-observation cap applied when rendering
    #[serde(default = "default_observation_chars")]
    pub max_observation_chars: usize,

    /// Leading characters of a document used to generate its summary
    #[serde(default = "default_summary_source_chars")]
    pub summary_source_chars: usize,

    /// Summary excerpt appended to tool descriptions
    #[serde(default = "default_description_snippet_chars")]
    pub description_snippet_chars: usize,

    #[serde(default = "default_inference_timeout")]
    pub inference_timeout_secs: u64,

    #[serde(default = "default_retrieval_timeout")]
    pub retrieval_timeout_secs: u64,

    #[serde(default = "default_embedding_timeout")]
    pub embedding_timeout_secs: u64,

    #[serde(default = "default_sandbox_timeout")]
    pub sandbox_timeout_secs: u64,

    /// Appended to answers produced after the iteration budget ran out
    #[serde(default = "default_caveat")]
    pub incomplete_caveat: String,
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_max_iterations() -> u32 {
    3
}
fn default_per_tool_retries() -> u32 {
    1
}
fn default_max_candidates() -> usize {
    3
}
fn default_min_similarity() -> f32 {
    0.15
}
fn default_tie_epsilon() -> f32 {
    1e-6
}
fn default_tabular_retries() -> u32 {
    2
}
fn default_top_k() -> usize {
    5
}
fn default_scratchpad_chars() -> usize {
    12_000
}
fn default_observation_chars() -> usize {
    4_000
}
fn default_summary_source_chars() -> usize {
    6_000
}
fn default_description_snippet_chars() -> usize {
    200
}
fn default_inference_timeout() -> u64 {
    60
}
fn default_retrieval_timeout() -> u64 {
    15
}
fn default_embedding_timeout() -> u64 {
    15
}
fn default_sandbox_timeout() -> u64 {
    20
}
fn default_caveat() -> String {
    "Note: reasoning was incomplete. The step limit was reached before the question could be fully resolved, so this answer may be partial.".into()
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            max_iterations: default_max_iterations(),
            per_tool_retries: default_per_tool_retries(),
            max_candidates_per_hop: default_max_candidates(),
            min_similarity: default_min_similarity(),
            tie_epsilon: default_tie_epsilon(),
            tabular_max_retries: default_tabular_retries(),
            top_k_chunks: default_top_k(),
            max_scratchpad_chars: default_scratchpad_chars(),
            max_observation_chars: default_observation_chars(),
            summary_source_chars: default_summary_source_chars(),
            description_snippet_chars: default_description_snippet_chars(),
            inference_timeout_secs: default_inference_timeout(),
            retrieval_timeout_secs: default_retrieval_timeout(),
            embedding_timeout_secs: default_embedding_timeout(),
            sandbox_timeout_secs: default_sandbox_timeout(),
            incomplete_caveat: default_caveat(),
        }
    }
}

impl ReasoningConfig {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval_timeout_secs)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    pub fn sandbox_timeout(&self) -> Duration {
        Duration::from_secs(self.sandbox_timeout_secs)
    }

    /// Attempts made per candidate tool in one hop.
    pub fn attempts_per_tool(&self) -> u32 {
        1 + self.per_tool_retries
    }
}

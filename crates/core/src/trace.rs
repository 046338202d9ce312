//! Reasoning trace — the per-query scratchpad.
//!
//! The scratchpad is created when a query arrives, grows by appending
//! [`ReasoningStep`]s, and is returned with the answer. Steps are never
//! edited or removed once recorded; prompt-size limits are handled when
//! the scratchpad is rendered, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::tool::ToolKind;

// ── Data Structures ───────────────────────────────────────────────────────

/// The result of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Name of the tool that produced this observation
    pub tool_name: String,

    /// The query or sub-question the tool was called with
    pub input: String,

    /// Result text; empty when the invocation failed
    pub result: String,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Invocations made before this outcome (1 = no retry)
    pub attempts: u32,

    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    pub fn success(tool_name: impl Into<String>, input: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            input: input.into(),
            result: result.into(),
            success: true,
            error: None,
            attempts: 1,
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(tool_name: impl Into<String>, input: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            input: input.into(),
            result: String::new(),
            success: false,
            error: Some(error.into()),
            attempts: 1,
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// One hop of the reasoning loop: which tool ran, why, and what came back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// 1-based hop index
    pub iteration: u32,

    pub tool_name: String,
    pub tool_kind: ToolKind,

    /// Similarity score that got this tool selected
    pub score: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,

    pub observation: Observation,
}

/// The running verdict of the deciding phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// No decision has been made yet.
    #[default]
    Undecided,

    /// More information is needed, optionally about a narrower question.
    NeedsMore {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sub_question: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },

    /// The gathered observations are enough to answer.
    CanAnswer,
}

/// Per-query reasoning state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scratchpad {
    query: String,
    steps: Vec<ReasoningStep>,
    verdict: Verdict,
    started_at: DateTime<Utc>,
}

// ── Implementation ────────────────────────────────────────────────────────

impl Scratchpad {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            steps: Vec::new(),
            verdict: Verdict::Undecided,
            started_at: Utc::now(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append a step. Iteration indices never go backwards.
    pub fn record(&mut self, step: ReasoningStep) {
        debug_assert!(
            self.steps.last().is_none_or(|last| last.iteration <= step.iteration),
            "reasoning steps must be appended in iteration order"
        );
        self.steps.push(step);
    }

    pub fn set_verdict(&mut self, verdict: Verdict) {
        self.verdict = verdict;
    }

    /// The sub-question requested by the last decision, if any.
    pub fn sub_question(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::NeedsMore { sub_question, .. } => sub_question.as_deref(),
            _ => None,
        }
    }

    /// The text the next hop should work on: the pending sub-question, or
    /// the original query.
    pub fn current_focus(&self) -> &str {
        self.sub_question().unwrap_or(&self.query)
    }

    /// Most recent outcome of `tool_name` called with `input`:
    /// `Some(true)` succeeded, `Some(false)` failed, `None` never tried.
    pub fn last_outcome(&self, tool_name: &str, input: &str) -> Option<bool> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.tool_name == tool_name && s.observation.input == input)
            .map(|s| s.observation.success)
    }

    pub fn successful_steps(&self) -> impl Iterator<Item = &ReasoningStep> {
        self.steps.iter().filter(|s| s.observation.success)
    }

    /// Highest iteration recorded so far.
    pub fn last_iteration(&self) -> u32 {
        self.steps.last().map(|s| s.iteration).unwrap_or(0)
    }

    /// Export as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

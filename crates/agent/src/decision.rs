//! The deciding step's structured output.
//!
//! The model is asked for a JSON object matching [`decision_schema`]. The
//! parser accepts the object bare or embedded in surrounding prose, and
//! anything it cannot understand counts as "continue" so the iteration
//! bound still applies.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

/// What the deciding step concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// More information is needed.
    Continue {
        sub_question: Option<String>,
        reasoning: Option<String>,
    },

    /// The query is answerable. `answer` is absent when the model said so
    /// without writing the answer; the loop then synthesizes one.
    Final {
        answer: Option<String>,
        reasoning: Option<String>,
    },
}

impl Decision {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final { .. })
    }

    pub fn reasoning(&self) -> Option<&str> {
        match self {
            Self::Continue { reasoning, .. } | Self::Final { reasoning, .. } => reasoning.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    action: String,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    next_sub_question: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// JSON schema sent with every deciding request.
pub fn decision_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "action": { "type": "string", "enum": ["continue", "final_answer"] },
            "answer": { "type": "string" },
            "next_sub_question": { "type": "string" },
            "reasoning": { "type": "string" }
        },
        "required": ["action"]
    })
}

/// Interpret a deciding reply.
pub fn parse_decision(reply: &str) -> Decision {
    let Some(raw) = extract_object(reply) else {
        warn!(chars = reply.len(), "Unparseable decision, continuing");
        return Decision::Continue {
            sub_question: None,
            reasoning: None,
        };
    };

    let answer = non_empty(raw.answer);
    let reasoning = non_empty(raw.reasoning);
    match raw.action.trim().to_ascii_lowercase().as_str() {
        "final_answer" | "final" | "answer" => Decision::Final { answer, reasoning },
        "continue" => Decision::Continue {
            sub_question: non_empty(raw.next_sub_question),
            reasoning,
        },
        other => {
            warn!(action = %other, "Unknown decision action, continuing");
            Decision::Continue {
                sub_question: non_empty(raw.next_sub_question),
                reasoning,
            }
        }
    }
}

fn extract_object(reply: &str) -> Option<RawDecision> {
    let trimmed = reply.trim();
    if let Ok(raw) = serde_json::from_str::<RawDecision>(trimmed) {
        return Some(raw);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

//! Reasoning events — observable progress of a reasoning run.
//!
//! The loop publishes an event at every state transition that matters
//! to an observer: tool selection, recorded observations, decisions,
//! and the final outcome. Subscribers are optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All reasoning events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReasoningEvent {
    /// A query started processing against a tool registry
    RunStarted {
        run_id: String,
        query: String,
        tool_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The selector ranked a candidate for the current hop
    ToolSelected {
        run_id: String,
        iteration: u32,
        tool_name: String,
        score: f32,
        timestamp: DateTime<Utc>,
    },

    /// An observation was appended to the scratchpad
    ObservationRecorded {
        run_id: String,
        iteration: u32,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The deciding phase produced a verdict
    DecisionMade {
        run_id: String,
        iteration: u32,
        answerable: bool,
        timestamp: DateTime<Utc>,
    },

    /// The run produced an answer
    RunFinished {
        run_id: String,
        iterations: u32,
        degraded: bool,
        timestamp: DateTime<Utc>,
    },

    /// The run aborted on an unrecoverable error
    RunFailed {
        run_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for reasoning events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct ReasoningEventBus {
    sender: broadcast::Sender<Arc<ReasoningEvent>>,
}

impl ReasoningEventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: ReasoningEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ReasoningEvent>> {
        self.sender.subscribe()
    }
}

impl Default for ReasoningEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

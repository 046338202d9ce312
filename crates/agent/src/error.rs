//! Agent error types.
//!
//! Tool failures never appear here: they become failed observations in
//! the scratchpad. Only an unreachable inference service during deciding
//! or answering aborts a run.

use docweave_core::error::InferenceError;
use docweave_core::trace::Scratchpad;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The inference service failed while deciding or answering.
    #[error("Inference service failed during {stage}: {source}")]
    Inference {
        stage: &'static str,
        #[source]
        source: InferenceError,
        /// Everything gathered before the failure
        trace: Box<Scratchpad>,
    },

    #[error("Tool registry error: {0}")]
    Registry(String),
}

impl AgentError {
    /// The partial scratchpad of a failed run, if any.
    pub fn trace(&self) -> Option<&Scratchpad> {
        match self {
            Self::Inference { trace, .. } => Some(trace),
            Self::Registry(_) => None,
        }
    }
}

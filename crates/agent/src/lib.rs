//! # DocWeave Agent
//!
//! The reasoning core. Given a query and the enabled documents, the
//! [`DocumentAgent`] builds a tool registry and drives the
//! [`ReasoningLoop`]: select a tool by semantic similarity, execute it,
//! observe the result, and ask the model whether the query is answerable.
//! Every run terminates within the configured hop budget and returns the
//! full scratchpad alongside the answer.

pub mod agent;
pub mod decision;
pub mod error;
pub mod loop_runner;
pub mod prompt;
pub mod scratchpad;
pub mod selector;

#[cfg(test)]
mod test_helpers;

pub use agent::DocumentAgent;
pub use decision::{Decision, decision_schema, parse_decision};
pub use error::AgentError;
pub use loop_runner::{AnswerKind, ReasoningLoop, ReasoningOutcome};
pub use selector::{Candidate, Priority, ToolSelector};

//! # DocWeave Core
//!
//! Domain types, capability traits, and error definitions for the DocWeave
//! multi-document reasoning agent. This crate has **no framework
//! dependencies**: it defines the domain model that every other crate
//! implements against.
//!
//! ## Capabilities
//!
//! The reasoning core talks to the outside world through four traits:
//! [`InferenceService`], [`Embedder`], [`RetrievalService`], and
//! [`ExecutionSandbox`]. Implementations live in their respective crates,
//! which keeps the loop testable with scripted doubles.

pub mod agent;
pub mod document;
pub mod error;
pub mod event;
pub mod memory;
pub mod provider;
pub mod sandbox;
pub mod services;
pub mod text;
pub mod tool;
pub mod trace;

// Re-export key types at crate root for ergonomics
pub use agent::ReasoningConfig;
pub use document::{ColumnSchema, ColumnType, Document, DocumentSetKey, MediaType, TableSchema, slugify};
pub use error::{
    EmbeddingError, Error, InferenceError, Result, RetrievalError, SandboxError, ToolError,
};
pub use event::{ReasoningEvent, ReasoningEventBus};
pub use memory::{ChunkRecord, RetrievalService, ScoredChunk};
pub use provider::{CompletionRequest, Embedder, InferenceService};
pub use sandbox::{ExecutionSandbox, SandboxOutput, TableHandle};
pub use services::Services;
pub use tool::{ToolDescriptor, ToolKind};
pub use trace::{Observation, ReasoningStep, Scratchpad, Verdict};

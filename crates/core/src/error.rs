//! Error types for the DocWeave domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all DocWeave operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inference errors ---
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    // --- Embedding errors ---
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Sandbox errors ---
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the language-model completion capability.
///
/// Any of these raised while deciding or answering aborts a reasoning run.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Inference service unavailable: {0}")]
    Unavailable(String),

    #[error("Inference timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("Embedding generation failed: {0}")]
    Failed(String),

    #[error("Embedding timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Embedding provider not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Retrieval timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum SandboxError {
    #[error("Sandbox execution timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Failed to start interpreter: {0}")]
    Spawn(String),

    #[error("Snippet failed: {message}")]
    Runtime { message: String },
}

/// Failures local to a single tool invocation.
///
/// These are recorded as failed observations and never abort a run.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Snippet generation failed for {tool_name}: {reason}")]
    SnippetGeneration { tool_name: String, reason: String },

    #[error("Retrieval timed out in {tool_name} after {timeout_secs}s")]
    RetrievalTimeout { tool_name: String, timeout_secs: u64 },

    #[error("Embedding timed out in {tool_name} after {timeout_secs}s")]
    EmbeddingTimeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_error_displays_correctly() {
        let err = Error::Inference(InferenceError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::RetrievalTimeout {
            tool_name: "vector_search_report".into(),
            timeout_secs: 15,
        });
        assert!(err.to_string().contains("vector_search_report"));
        assert!(err.to_string().contains("15s"));
    }

    #[test]
    fn sandbox_error_converts_into_top_level() {
        let err: Error = SandboxError::Runtime {
            message: "KeyError: 'revenue'".into(),
        }
        .into();
        assert!(matches!(err, Error::Sandbox(_)));
        assert!(err.to_string().contains("KeyError"));
    }
}

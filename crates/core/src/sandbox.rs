//! Sandbox trait — isolated execution of generated analysis snippets.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::document::MediaType;
use crate::error::SandboxError;

/// The table a snippet runs against. The sandbox loads it as `df`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableHandle {
    pub path: PathBuf,
    pub media_type: MediaType,
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxOutput {
    pub stdout: String,
    pub duration_ms: u64,
}

/// The sandboxed execution capability.
///
/// Implementations must enforce `timeout` themselves and must not let
/// a snippet outlive the call.
#[async_trait]
pub trait ExecutionSandbox: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        snippet: &str,
        table: &TableHandle,
        timeout: Duration,
    ) -> Result<SandboxOutput, SandboxError>;
}

//! Process sandbox — run analysis snippets in a child interpreter.
//!
//! Each snippet runs in a fresh process with the table path exposed as
//! `DOCWEAVE_TABLE` and a prelude that loads it into `df`. The child is
//! killed when the wall-clock timeout elapses, so a hung snippet cannot
//! stall the reasoning loop. Only the first bytes of stdout and stderr
//! are kept in memory; the rest is read and discarded.

use async_trait::async_trait;
use docweave_core::error::SandboxError;
use docweave_core::sandbox::{ExecutionSandbox, SandboxOutput, TableHandle};
use docweave_core::text::truncate_chars;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Loads the bound table into a pandas DataFrame named `df`.
pub const PANDAS_PRELUDE: &str = r#"import os
import pandas as pd
_path = os.environ["DOCWEAVE_TABLE"]
_lower = _path.lower()
if _lower.endswith((".xlsx", ".xls", ".ods")):
    df = pd.read_excel(_path)
elif _lower.endswith(".tsv"):
    df = pd.read_csv(_path, sep="\t")
else:
    df = pd.read_csv(_path)
"#;

/// Execute snippets with an external interpreter.
pub struct ProcessSandbox {
    interpreter: String,
    prelude: String,
    max_output_chars: usize,
}

impl ProcessSandbox {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            prelude: PANDAS_PRELUDE.to_string(),
            max_output_chars: 8000,
        }
    }

    /// Replace the code run before every snippet.
    pub fn with_prelude(mut self, prelude: impl Into<String>) -> Self {
        self.prelude = prelude.into();
        self
    }

    pub fn with_max_output_chars(mut self, max_output_chars: usize) -> Self {
        self.max_output_chars = max_output_chars;
        self
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Bytes kept per stream: enough for `max_output_chars` of UTF-8.
    fn capture_bytes(&self) -> usize {
        self.max_output_chars.saturating_mul(4).max(1)
    }

    fn program(&self, snippet: &str) -> String {
        if self.prelude.is_empty() {
            snippet.to_string()
        } else {
            format!("{}\n{}\n", self.prelude.trim_end(), snippet)
        }
    }
}

#[async_trait]
impl ExecutionSandbox for ProcessSandbox {
    fn name(&self) -> &str {
        "process"
    }

    async fn run(
        &self,
        snippet: &str,
        table: &TableHandle,
        timeout: Duration,
    ) -> Result<SandboxOutput, SandboxError> {
        debug!(interpreter = %self.interpreter, table = %table.path.display(), "Running snippet");

        let started = Instant::now();
        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(self.program(snippet))
            .env("DOCWEAVE_TABLE", &table.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::Spawn(format!("{}: {e}", self.interpreter)))?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(SandboxError::Spawn("child output pipes unavailable".into()));
        };
        let cap = self.capture_bytes();
        let finished = async {
            tokio::try_join!(child.wait(), read_capped(stdout, cap), read_capped(stderr, cap))
        };

        let (status, stdout, stderr) = match tokio::time::timeout(timeout, finished).await {
            Ok(result) => result.map_err(|e| SandboxError::Spawn(e.to_string()))?,
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Snippet timed out, child killed");
                return Err(SandboxError::Timeout {
                    timeout_secs: timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&stdout);
        let stderr = String::from_utf8_lossy(&stderr);

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
            warn!(exit_code = code, "Snippet failed");
            return Err(SandboxError::Runtime {
                message: format!(
                    "[exit code: {code}] {}",
                    truncate_chars(detail, self.max_output_chars)
                ),
            });
        }

        Ok(SandboxOutput {
            stdout: truncate_chars(stdout.trim(), self.max_output_chars).to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Keep the first `cap` bytes of `pipe`, then drain it so the child never
/// blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(mut pipe: R, cap: usize) -> std::io::Result<Vec<u8>> {
    let mut kept = Vec::with_capacity(cap.min(64 * 1024));
    (&mut pipe).take(cap as u64).read_to_end(&mut kept).await?;
    tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
    Ok(kept)
}

//! Tabular analysis tool — answer questions over a table with generated code.
//!
//! The model sees only the table's schema. It writes a pandas snippet, the
//! sandbox runs it against the real file, and a failing snippet's error is
//! fed back for a bounded number of regenerations.

use docweave_core::agent::ReasoningConfig;
use docweave_core::document::{Document, TableSchema};
use docweave_core::error::ToolError;
use docweave_core::provider::{CompletionRequest, InferenceService};
use docweave_core::sandbox::{ExecutionSandbox, TableHandle};
use docweave_core::services::Services;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use crate::tool::{ToolBinding, ToolRequest};

const SNIPPET_SYSTEM: &str = "You write short Python pandas snippets that answer questions about a table. \
A DataFrame named `df` is already loaded. Print the answer with print(). \
Do not read or write files and do not access the network. Reply with code only.";

/// Extra time granted to a sandbox beyond its own timeout before the
/// call is abandoned.
const SANDBOX_GRACE: Duration = Duration::from_secs(5);

/// Build the snippet-generation prompt.
pub fn snippet_prompt(
    table_name: &str,
    schema: &TableSchema,
    question: &str,
    previous_error: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Table: {table_name}\nColumns:\n{}\n\nQuestion: {question}\n",
        schema.describe()
    );
    if let Some(error) = previous_error {
        prompt.push_str(&format!(
            "\nThe previous snippet failed with this error:\n{error}\n\
             Write a corrected snippet that avoids it.\n"
        ));
    }
    prompt.push_str("\nPython code:");
    prompt
}

/// Pull code out of a model reply, dropping Markdown fences.
pub fn extract_snippet(reply: &str) -> Option<String> {
    let trimmed = reply.trim();
    let code = match trimmed.find("```") {
        Some(start) => {
            let after = &trimmed[start + 3..];
            // Skip a language tag on the fence line
            let body = after.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
            match body.find("```") {
                Some(end) => &body[..end],
                None => body,
            }
        }
        None => trimmed,
    };
    let code = code.trim();
    (!code.is_empty()).then(|| code.to_string())
}

pub struct TabularAnalysisTool {
    binding: ToolBinding,
    table: TableHandle,
    schema: TableSchema,
    inference: Arc<dyn InferenceService>,
    sandbox: Arc<dyn ExecutionSandbox>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    inference_timeout: Duration,
    sandbox_timeout: Duration,
}

impl TabularAnalysisTool {
    pub fn new(
        binding: ToolBinding,
        document: &Document,
        services: &Services,
        config: &ReasoningConfig,
    ) -> Self {
        Self {
            binding,
            table: TableHandle {
                path: document.path.clone(),
                media_type: document.media_type.clone(),
            },
            schema: document.table.clone().unwrap_or_default(),
            inference: Arc::clone(&services.inference),
            sandbox: Arc::clone(&services.sandbox),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.tabular_max_retries,
            inference_timeout: config.inference_timeout(),
            sandbox_timeout: config.sandbox_timeout(),
        }
    }

    pub fn binding(&self) -> &ToolBinding {
        &self.binding
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub async fn invoke(&self, request: &ToolRequest) -> Result<String, ToolError> {
        let name = self.binding.name();
        let mut last_error = request.previous_error.clone();

        for attempt in 0..=self.max_retries {
            let snippet = self.generate_snippet(&request.query, last_error.as_deref()).await?;
            debug!(tool = %name, attempt, "Executing snippet");

            let run = tokio::time::timeout(
                self.sandbox_timeout + SANDBOX_GRACE,
                self.sandbox.run(&snippet, &self.table, self.sandbox_timeout),
            )
            .await;

            let error = match run {
                Ok(Ok(output)) => {
                    return Ok(format!(
                        "Snippet:\n```python\n{snippet}\n```\nResult:\n{}",
                        output.stdout
                    ));
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!(
                    "Sandbox did not return within {}s",
                    (self.sandbox_timeout + SANDBOX_GRACE).as_secs()
                ),
            };

            warn!(tool = %name, attempt, error = %error, "Snippet failed");
            last_error = Some(error);
        }

        Err(ToolError::ExecutionFailed {
            tool_name: name.to_string(),
            reason: last_error.unwrap_or_else(|| "snippet failed".into()),
        })
    }

    async fn generate_snippet(&self, question: &str, previous_error: Option<&str>) -> Result<String, ToolError> {
        let name = self.binding.name();
        let prompt = snippet_prompt(self.binding.document_name(), &self.schema, question, previous_error);
        let request = CompletionRequest::new(&self.model, SNIPPET_SYSTEM, prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let reply = tokio::time::timeout(self.inference_timeout, self.inference.complete(request))
            .await
            .map_err(|_| ToolError::SnippetGeneration {
                tool_name: name.to_string(),
                reason: format!("timed out after {}s", self.inference_timeout.as_secs()),
            })?
            .map_err(|e| ToolError::SnippetGeneration {
                tool_name: name.to_string(),
                reason: e.to_string(),
            })?;

        extract_snippet(&reply).ok_or_else(|| ToolError::SnippetGeneration {
            tool_name: name.to_string(),
            reason: "model returned no code".into(),
        })
    }
}

//! Summary tool — thematic overview of one document.
//!
//! Uses the summary stored at ingestion when there is one; otherwise the
//! overview is generated on first use and memoized for the lifetime of
//! the registry.

use docweave_core::agent::ReasoningConfig;
use docweave_core::document::Document;
use docweave_core::error::ToolError;
use docweave_core::provider::{CompletionRequest, InferenceService};
use docweave_core::services::Services;
use docweave_core::text::truncate_chars;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use crate::tool::{ToolBinding, ToolRequest};

/// System prompt for document overviews.
pub const SUMMARY_SYSTEM: &str = "You summarize documents accurately. Only state what the text supports.";

/// Build the prompt asking for a document overview.
pub fn summary_prompt(document_name: &str, excerpt: &str) -> String {
    format!(
        "Provide a comprehensive summary of the following document '{document_name}'. \
         Cover the main themes, key topics, important facts and figures, and the overall purpose.\n\n\
         DOCUMENT:\n{excerpt}\n\nSUMMARY:"
    )
}

pub struct SummaryTool {
    binding: ToolBinding,
    text: Option<Arc<str>>,
    summary: OnceCell<String>,
    inference: Arc<dyn InferenceService>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    source_chars: usize,
    inference_timeout: Duration,
}

impl SummaryTool {
    pub fn new(
        binding: ToolBinding,
        document: &Document,
        services: &Services,
        config: &ReasoningConfig,
    ) -> Self {
        Self {
            binding,
            text: document.text.clone(),
            summary: OnceCell::new_with(document.summary.clone()),
            inference: Arc::clone(&services.inference),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            source_chars: config.summary_source_chars,
            inference_timeout: config.inference_timeout(),
        }
    }

    pub fn binding(&self) -> &ToolBinding {
        &self.binding
    }

    /// Whether the overview is already available without a model call.
    pub fn is_ready(&self) -> bool {
        self.summary.initialized()
    }

    pub async fn invoke(&self, _request: &ToolRequest) -> Result<String, ToolError> {
        self.summary
            .get_or_try_init(|| self.generate())
            .await
            .cloned()
    }

    async fn generate(&self) -> Result<String, ToolError> {
        let name = self.binding.name();
        let text = self
            .text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: format!("no text available for '{}'", self.binding.document_name()),
            })?;

        let excerpt = truncate_chars(text, self.source_chars);
        debug!(tool = %name, chars = excerpt.len(), "Generating summary");

        let request = CompletionRequest::new(
            &self.model,
            SUMMARY_SYSTEM,
            summary_prompt(self.binding.document_name(), excerpt),
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        let summary = tokio::time::timeout(self.inference_timeout, self.inference.complete(request))
            .await
            .map_err(|_| ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: format!(
                    "summary generation timed out after {}s",
                    self.inference_timeout.as_secs()
                ),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: e.to_string(),
            })?;

        let summary = summary.trim().to_string();
        if summary.is_empty() {
            return Err(ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: "model returned an empty summary".into(),
            });
        }

        info!(tool = %name, "Summary generated");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{services, EchoInference};
    use docweave_core::error::InferenceError;

    #[test]
    fn prompt_contains_name_and_excerpt() {
        let prompt = summary_prompt("report.pdf", "Revenue grew.");
        assert!(prompt.contains("'report.pdf'"));
        assert!(prompt.contains("DOCUMENT:\nRevenue grew."));
        assert!(prompt.ends_with("SUMMARY:"));
    }

    fn tool(document: &Document, inference: Arc<EchoInference>) -> SummaryTool {
        let binding = ToolBinding::new("summary_report", "overview", &document.id, &document.name);
        SummaryTool::new(binding, document, &services(inference), &ReasoningConfig::default())
    }

    #[tokio::test]
    async fn precomputed_summary_needs_no_model_call() {
        let inference = Arc::new(EchoInference::default());
        let doc = Document::new("d1", "/docs/report.txt").with_summary("Revenue grew 12%.");
        let summary = tool(&doc, Arc::clone(&inference));
        assert!(summary.is_ready());
        let out = summary.invoke(&ToolRequest::new("overview?")).await.unwrap();
        assert_eq!(out, "Revenue grew 12%.");
        assert_eq!(inference.calls(), 0);
    }

    #[tokio::test]
    async fn generated_summary_is_memoized() {
        let inference = Arc::new(EchoInference::with_replies(vec![Ok("  A report on revenue. ".into())]));
        let doc = Document::new("d1", "/docs/report.txt").with_text("Revenue was $4.2M in Q3.");
        let summary = tool(&doc, Arc::clone(&inference));
        assert!(!summary.is_ready());

        let first = summary.invoke(&ToolRequest::new("overview?")).await.unwrap();
        let second = summary.invoke(&ToolRequest::new("themes?")).await.unwrap();
        assert_eq!(first, "A report on revenue.");
        assert_eq!(second, first);
        assert_eq!(inference.calls(), 1);
        assert!(inference.prompts()[0].contains("Revenue was $4.2M"));
    }

    #[tokio::test]
    async fn failed_generation_is_retried_on_next_call() {
        let inference = Arc::new(EchoInference::with_replies(vec![
            Err(InferenceError::Unavailable("down".into())),
            Ok("Recovered summary".into()),
        ]));
        let doc = Document::new("d1", "/docs/report.txt").with_text("Some text");
        let summary = tool(&doc, Arc::clone(&inference));

        let err = summary.invoke(&ToolRequest::new("overview?")).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
        let out = summary.invoke(&ToolRequest::new("overview?")).await.unwrap();
        assert_eq!(out, "Recovered summary");
    }

    #[tokio::test]
    async fn document_without_text_fails() {
        let inference = Arc::new(EchoInference::default());
        let doc = Document::new("d1", "/docs/scan.pdf");
        let err = tool(&doc, Arc::clone(&inference))
            .invoke(&ToolRequest::new("overview?"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no text available"));
        assert_eq!(inference.calls(), 0);
    }
}

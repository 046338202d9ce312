//! Tool factory — turn a document set into a tool registry.
//!
//! Text-like documents (text, markdown, pdf) get a vector search tool and
//! a summary tool; tables (csv, spreadsheet) get one tabular analysis tool.
//! Documents of unknown type are skipped with a warning. Output is fully
//! determined by the document set: documents are processed sorted by
//! (name, id) and duplicate ids are dropped.

use docweave_core::agent::ReasoningConfig;
use docweave_core::document::{Document, DocumentSetKey, MediaType};
use docweave_core::error::ToolError;
use docweave_core::services::Services;
use docweave_core::text::truncate_chars;
use docweave_core::tool::ToolKind;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::registry::{RegisteredTool, ToolRegistry};
use crate::summary::SummaryTool;
use crate::tabular::TabularAnalysisTool;
use crate::tool::{Tool, ToolBinding};
use crate::vector_search::VectorSearchTool;

const FACTORY: &str = "tool_factory";

/// Builds tools bound to documents.
#[derive(Debug, Clone)]
pub struct ToolFactory {
    services: Services,
    config: Arc<ReasoningConfig>,
}

impl ToolFactory {
    pub fn new(services: Services, config: Arc<ReasoningConfig>) -> Self {
        Self { services, config }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Construct the tools for `documents` without embedding descriptions.
    ///
    /// Returns the tools in registry order and one warning per skipped document.
    pub fn instantiate(&self, documents: &[Document]) -> (Vec<Tool>, Vec<String>) {
        let mut ordered: Vec<&Document> = documents.iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        let mut seen_ids = HashSet::new();
        ordered.retain(|d| seen_ids.insert(d.id.as_str()));

        let mut tools = Vec::new();
        let mut warnings = Vec::new();
        let mut names = UniqueNames::default();

        for doc in ordered {
            match &doc.media_type {
                MediaType::Text | MediaType::Markdown | MediaType::Pdf => {
                    let binding = self.bind(&mut names, ToolKind::VectorSearch, doc);
                    tools.push(Tool::VectorSearch(VectorSearchTool::new(
                        binding,
                        doc.collection.clone(),
                        &self.services,
                        &self.config,
                    )));
                    let binding = self.bind(&mut names, ToolKind::Summary, doc);
                    tools.push(Tool::Summary(SummaryTool::new(binding, doc, &self.services, &self.config)));
                }
                MediaType::Csv | MediaType::Spreadsheet => {
                    let binding = self.bind(&mut names, ToolKind::TabularAnalysis, doc);
                    tools.push(Tool::TabularAnalysis(TabularAnalysisTool::new(
                        binding,
                        doc,
                        &self.services,
                        &self.config,
                    )));
                }
                MediaType::Unknown(ext) => {
                    let message = format!("Skipped '{}': unsupported media type '{ext}'", doc.name);
                    warn!(document = %doc.name, media_type = %ext, "Skipping document");
                    warnings.push(message);
                }
            }
        }

        (tools, warnings)
    }

    /// Build a registry for `documents`, embedding every tool description.
    pub async fn build(&self, documents: &[Document]) -> Result<ToolRegistry, ToolError> {
        let key = DocumentSetKey::of(documents);
        let (tools, warnings) = self.instantiate(documents);

        if tools.is_empty() {
            info!(key = %key, skipped = warnings.len(), "Built empty tool registry");
            return Ok(ToolRegistry::new(key, Vec::new(), warnings));
        }

        let descriptions: Vec<String> = tools.iter().map(|t| t.description().to_string()).collect();
        let timeout = self.config.embedding_timeout();
        let embeddings = tokio::time::timeout(timeout, self.services.embedder.embed_batch(&descriptions))
            .await
            .map_err(|_| ToolError::EmbeddingTimeout {
                tool_name: FACTORY.into(),
                timeout_secs: timeout.as_secs(),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: FACTORY.into(),
                reason: format!("embedding tool descriptions: {e}"),
            })?;

        if embeddings.len() != tools.len() {
            return Err(ToolError::ExecutionFailed {
                tool_name: FACTORY.into(),
                reason: format!(
                    "embedder returned {} vectors for {} descriptions",
                    embeddings.len(),
                    tools.len()
                ),
            });
        }

        let entries: Vec<RegisteredTool> = tools
            .into_iter()
            .zip(embeddings)
            .map(|(tool, embedding)| RegisteredTool { tool, embedding })
            .collect();

        info!(key = %key, tools = entries.len(), skipped = warnings.len(), "Built tool registry");
        Ok(ToolRegistry::new(key, entries, warnings))
    }

    fn bind(&self, names: &mut UniqueNames, kind: ToolKind, doc: &Document) -> ToolBinding {
        let name = names.claim(format!("{}_{}", kind.prefix(), doc.slug()));
        let description = self.describe(kind, doc);
        debug!(tool = %name, document = %doc.name, "Tool bound");
        ToolBinding::new(name, description, doc.id.clone(), doc.name.clone())
    }

    fn describe(&self, kind: ToolKind, doc: &Document) -> String {
        let mut description = match kind {
            ToolKind::VectorSearch => format!(
                "Search for specific facts, figures, names, dates, definitions, \
                 or detailed information within the document '{}'.",
                doc.name
            ),
            ToolKind::Summary => format!(
                "Get a high-level overview, themes, main topics, or general \
                 understanding of the document '{}'.",
                doc.name
            ),
            ToolKind::TabularAnalysis => {
                let columns = doc
                    .table
                    .as_ref()
                    .filter(|t| !t.is_empty())
                    .map(|t| format!(" (columns: {})", t.column_names()))
                    .unwrap_or_default();
                format!(
                    "Compute aggregates, filters, counts, and other numeric answers \
                     over the table '{}'{columns}.",
                    doc.name
                )
            }
        };

        if let Some(summary) = doc.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            let snippet = truncate_chars(summary, self.config.description_snippet_chars).replace('\n', " ");
            description.push_str(&format!(" This document covers: {snippet}..."));
        }
        description
    }
}

/// Hands out names, suffixing `_2`, `_3`... on collision.
#[derive(Default)]
struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    fn claim(&mut self, base: String) -> String {
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{services, EchoInference};
    use docweave_core::document::{ColumnSchema, ColumnType, TableSchema};
    use docweave_core::tool::ToolKind;

    fn factory() -> ToolFactory {
        ToolFactory::new(services(Arc::new(EchoInference::default())), Arc::new(ReasoningConfig::default()))
    }

    fn sales_table() -> TableSchema {
        TableSchema {
            columns: vec![
                ColumnSchema {
                    name: "region".into(),
                    dtype: ColumnType::Text,
                },
                ColumnSchema {
                    name: "revenue".into(),
                    dtype: ColumnType::Float,
                },
            ],
            row_count: Some(12),
        }
    }

    #[test]
    fn text_documents_get_search_and_summary() {
        let docs = vec![Document::new("d1", "/docs/Annual Report.pdf")];
        let (tools, warnings) = factory().instantiate(&docs);
        assert!(warnings.is_empty());
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["vector_search_annual_report", "summary_annual_report"]);
        assert_eq!(tools[0].kind(), ToolKind::VectorSearch);
        assert_eq!(tools[1].kind(), ToolKind::Summary);
    }

    #[test]
    fn tables_get_one_tabular_tool() {
        let docs = vec![Document::new("s1", "/docs/sales.csv").with_table(sales_table())];
        let (tools, _) = factory().instantiate(&docs);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].kind(), ToolKind::TabularAnalysis);
        assert_eq!(tools[0].name(), "tabular_analysis_sales");
        assert!(tools[0].description().contains("(columns: region, revenue)"));
    }

    #[test]
    fn unknown_media_type_is_skipped_with_warning() {
        let docs = vec![
            Document::new("x", "/docs/archive.zip"),
            Document::new("n", "/docs/notes.md"),
        ];
        let (tools, warnings) = factory().instantiate(&docs);
        assert_eq!(tools.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("archive.zip"));
    }

    #[test]
    fn ordering_is_independent_of_input_order() {
        let a = Document::new("a", "/docs/alpha.txt");
        let b = Document::new("b", "/docs/beta.csv");
        let f = factory();
        let (first, _) = f.instantiate(&[b.clone(), a.clone()]);
        let (second, _) = f.instantiate(&[a, b]);
        let first: Vec<&str> = first.iter().map(|t| t.name()).collect();
        let second: Vec<&str> = second.iter().map(|t| t.name()).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], "vector_search_alpha");
    }

    #[test]
    fn duplicate_slugs_get_suffixes() {
        let docs = vec![
            Document::new("1", "/a/report.txt"),
            Document::new("2", "/b/report.md"),
        ];
        let (tools, _) = factory().instantiate(&docs);
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "vector_search_report",
                "summary_report",
                "vector_search_report_2",
                "summary_report_2"
            ]
        );
    }

    #[test]
    fn duplicate_ids_are_dropped() {
        let doc = Document::new("1", "/a/report.txt");
        let (tools, _) = factory().instantiate(&[doc.clone(), doc]);
        assert_eq!(tools.len(), 2);
    }

    #[test]
    fn summary_snippet_is_appended_to_descriptions() {
        let long = "x".repeat(500);
        let doc = Document::new("1", "/a/report.txt").with_summary(format!("Quarterly\nresults {long}"));
        let (tools, _) = factory().instantiate(&[doc]);
        let description = tools[0].description();
        assert!(description.contains("This document covers: Quarterly results"));
        assert!(description.ends_with("..."));
        assert!(description.len() < 400);
    }

    #[tokio::test]
    async fn build_embeds_every_description() {
        let docs = vec![
            Document::new("1", "/a/report.txt"),
            Document::new("2", "/a/sales.csv").with_table(sales_table()),
        ];
        let registry = factory().build(&docs).await.unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.iter().all(|e| !e.embedding.is_empty()));
        assert_eq!(registry.key(), &DocumentSetKey::of(&docs));
        assert!(registry.get("tabular_analysis_sales").is_ok());
    }

    #[tokio::test]
    async fn build_twice_is_identical() {
        let docs = vec![
            Document::new("2", "/a/sales.csv"),
            Document::new("1", "/a/report.txt"),
            Document::new("3", "/a/memo.md"),
        ];
        let f = factory();
        let first = f.build(&docs).await.unwrap();
        let second = f.build(&docs).await.unwrap();
        assert_eq!(first.names(), second.names());
        let kinds = |r: &ToolRegistry| r.iter().map(|e| e.tool.kind()).collect::<Vec<_>>();
        assert_eq!(kinds(&first), kinds(&second));
        let vectors = |r: &ToolRegistry| r.iter().map(|e| e.embedding.clone()).collect::<Vec<_>>();
        assert_eq!(vectors(&first), vectors(&second));
    }

    #[tokio::test]
    async fn build_with_no_documents_is_empty() {
        let registry = factory().build(&[]).await.unwrap();
        assert!(registry.is_empty());
        assert!(registry.warnings().is_empty());
    }
}

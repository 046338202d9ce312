//! The closed set of document tools.
//!
//! Every tool is bound to exactly one document at construction and exposes
//! the same `invoke` operation. Dispatch is a `match` over [`Tool`]; there
//! is no open-ended tool trait.

use docweave_core::error::ToolError;
use docweave_core::tool::{ToolDescriptor, ToolKind};
use crate::summary::SummaryTool;
use crate::tabular::TabularAnalysisTool;
use crate::vector_search::VectorSearchTool;

/// Input to a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    /// The question or sub-question to work on
    pub query: String,

    /// Error from the previous attempt, used to reformulate a retry
    pub previous_error: Option<String>,
}

impl ToolRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            previous_error: None,
        }
    }

    pub fn with_previous_error(mut self, error: impl Into<String>) -> Self {
        self.previous_error = Some(error.into());
        self
    }
}

/// Identity shared by all tool variants. Fixed after construction.
#[derive(Debug, Clone)]
pub struct ToolBinding {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) document_id: String,
    pub(crate) document_name: String,
}

impl ToolBinding {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        document_id: impl Into<String>,
        document_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            document_id: document_id.into(),
            document_name: document_name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }
}

/// A document-bound capability.
pub enum Tool {
    VectorSearch(VectorSearchTool),
    Summary(SummaryTool),
    TabularAnalysis(TabularAnalysisTool),
}

impl Tool {
    pub fn binding(&self) -> &ToolBinding {
        match self {
            Self::VectorSearch(t) => t.binding(),
            Self::Summary(t) => t.binding(),
            Self::TabularAnalysis(t) => t.binding(),
        }
    }

    pub fn name(&self) -> &str {
        self.binding().name()
    }

    pub fn description(&self) -> &str {
        self.binding().description()
    }

    pub fn document_id(&self) -> &str {
        self.binding().document_id()
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::VectorSearch(_) => ToolKind::VectorSearch,
            Self::Summary(_) => ToolKind::Summary,
            Self::TabularAnalysis(_) => ToolKind::TabularAnalysis,
        }
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            kind: self.kind(),
            document_id: self.document_id().to_string(),
        }
    }

    /// Run the tool. Errors are tool-local and never fatal to a run.
    pub async fn invoke(&self, request: &ToolRequest) -> Result<String, ToolError> {
        if request.query.trim().is_empty() {
            return Err(ToolError::InvalidInput(format!(
                "{} called with an empty query",
                self.name()
            )));
        }

        match self {
            Self::VectorSearch(t) => t.invoke(request).await,
            Self::Summary(t) => t.invoke(request).await,
            Self::TabularAnalysis(t) => t.invoke(request).await,
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("document_id", &self.document_id())
            .finish()
    }
}

//! Tool descriptors — what the agent knows about a tool without running it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three tool families generated per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    VectorSearch,
    Summary,
    TabularAnalysis,
}

impl ToolKind {
    /// Prefix of every tool name of this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::VectorSearch => "vector_search",
            Self::Summary => "summary",
            Self::TabularAnalysis => "tabular_analysis",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Public view of a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub kind: ToolKind,

    /// Id of the document the tool is bound to
    pub document_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ToolKind::TabularAnalysis).unwrap();
        assert_eq!(json, "\"tabular_analysis\"");
        assert_eq!(ToolKind::VectorSearch.to_string(), "vector_search");
    }
}

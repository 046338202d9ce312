//! Document model — the units the agent reasons over.
//!
//! A [`Document`] is an ingested file with a stable identifier, a media
//! type that decides which tools it gets, and whatever content the
//! ingestion step could extract (text, summary, table schema).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Media types the tool factory knows how to serve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Text,
    Markdown,
    Pdf,
    /// Comma or tab separated values.
    Csv,
    /// Excel-style workbooks (xlsx, xls, ods).
    Spreadsheet,
    /// Anything else; carries the raw extension.
    Unknown(String),
}

impl MediaType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "text" => Self::Text,
            "md" | "markdown" => Self::Markdown,
            "pdf" => Self::Pdf,
            "csv" | "tsv" => Self::Csv,
            "xlsx" | "xls" | "ods" => Self::Spreadsheet,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or_else(|| Self::Unknown(String::new()))
    }

    /// Text-bearing documents get retrieval and summary tools.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text | Self::Markdown | Self::Pdf)
    }

    /// Tabular documents get a code-execution tool.
    pub fn is_tabular(&self) -> bool {
        matches!(self, Self::Csv | Self::Spreadsheet)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Spreadsheet => "spreadsheet",
            Self::Unknown(ext) => ext,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(ext) if ext.is_empty() => write!(f, "unknown"),
            Self::Unknown(ext) => write!(f, "unknown (.{ext})"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Inferred type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
}

/// Column names and types of a tabular document.
///
/// Only the schema ever reaches the model; rows stay on disk and are
/// read by the sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnSchema>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

impl TableSchema {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// One line per column, e.g. `- revenue (float)`.
    pub fn describe(&self) -> String {
        if self.columns.is_empty() {
            return "(schema unknown; inspect df.columns and df.dtypes first)".into();
        }
        let mut out = self
            .columns
            .iter()
            .map(|c| format!("- {} ({})", c.name, c.dtype.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        if let Some(rows) = self.row_count {
            out.push_str(&format!("\n({rows} rows)"));
        }
        out
    }

    /// Comma separated column names for short descriptions.
    pub fn column_names(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// An ingested document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, unique within a document set
    pub id: String,

    /// Human-readable name (usually the file name)
    pub name: String,

    /// Location of the source file
    pub path: PathBuf,

    pub media_type: MediaType,

    /// Retrieval collection holding this document's chunks
    pub collection: String,

    /// Extracted text, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Arc<str>>,

    /// Summary produced at ingestion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Column schema for tabular documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableSchema>,
}

impl Document {
    /// Create a document, inferring media type from the path and deriving
    /// the collection name from the file stem.
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let media_type = MediaType::from_path(&path);
        let collection = format!("doc_{}", slugify(&name));
        Self {
            id: id.into(),
            name,
            path,
            media_type,
            collection,
            text: None,
            summary: None,
            table: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.table = Some(table);
        self
    }

    /// Slug used in tool names.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

/// Identity of a document set, independent of order and duplicates.
///
/// Used as the key of the tool registry cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentSetKey(String);

impl DocumentSetKey {
    pub fn of(documents: &[Document]) -> Self {
        let mut ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        Self(ids.join("\u{1f}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.replace('\u{1f}', ","))
    }
}

/// Turn a file name into an identifier fragment: lowercase stem, runs of
/// non-alphanumerics collapsed to `_`, at least 3 and at most 63 chars.
pub fn slugify(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let mut slug = String::with_capacity(stem.len());
    let mut pending_sep = false;
    for ch in stem.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch);
        } else {
            pending_sep = true;
        }
    }

    if slug.len() < 3 {
        slug.push_str("_doc");
        let trimmed = slug.trim_start_matches('_').to_string();
        slug = if trimmed.len() < 3 { "doc".into() } else { trimmed };
    }
    slug.truncate(63);
    slug.trim_end_matches('_').to_string()
}

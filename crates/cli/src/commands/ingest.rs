//! `docweave ingest` — Catalog a directory of documents.
//!
//! Every supported file is hashed; a file whose path was already ingested
//! with the same content is skipped. Text (including text extracted from
//! PDFs) is chunked with overlap, embedded, and written to a per-document
//! collection, and a summary is generated for the tool descriptions.
//! CSV/TSV and `.xlsx` files get an inferred column schema instead.

use docweave_core::document::{ColumnSchema, ColumnType, Document, MediaType, TableSchema};
use docweave_core::memory::ChunkRecord;
use docweave_core::provider::CompletionRequest;
use docweave_core::text::truncate_chars;
use docweave_tools::summary::{SUMMARY_SYSTEM, summary_prompt};
use calamine::{Data, Range, Reader};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::runtime::Runtime;

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "csv", "tsv", "xlsx"];

/// Rows read when guessing column types.
const SCHEMA_SAMPLE_ROWS: usize = 500;

/// Chunks embedded per request.
const EMBED_BATCH: usize = 32;

pub async fn run(dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::load().await?;
    let dir = dir
        .canonicalize()
        .map_err(|e| format!("Cannot read directory {}: {e}", dir.display()))?;

    let files = discover(&dir)?;
    if files.is_empty() {
        println!("⚠️  No supported files in {} ({})", dir.display(), SUPPORTED_EXTENSIONS.join(", "));
        return Ok(());
    }

    println!("📚 Ingesting {} file(s) from {}\n", files.len(), dir.display());

    let (mut ingested, mut skipped, mut failed) = (0, 0, 0);
    for path in &files {
        match ingest_file(&runtime, path).await {
            Ok(Ingested::Stored(doc)) => {
                ingested += 1;
                println!("  ✅ {} ({}) → {}", doc.name, doc.media_type, doc.id);
            }
            Ok(Ingested::Unchanged(doc)) => {
                skipped += 1;
                println!("  ·  {} unchanged (stored as {})", display_name(path), doc.id);
            }
            Err(e) => {
                failed += 1;
                println!("  ❌ {}: {e}", display_name(path));
            }
        }
    }

    println!("\n🎉 {ingested} ingested, {skipped} unchanged, {failed} failed.");
    Ok(())
}

enum Ingested {
    Stored(Document),
    Unchanged(Document),
}

async fn ingest_file(runtime: &Runtime, path: &Path) -> Result<Ingested, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    let hash = content_hash(&bytes);

    if let Some(existing) = runtime.store.unchanged_document(path, &hash).await? {
        debug!(path = %path.display(), id = %existing.id, "Content unchanged, skipping");
        return Ok(Ingested::Unchanged(existing));
    }

    let mut doc = Document::new("", path);
    let slug = doc.slug();
    doc.id = format!("{slug}-{}", &hash[..12]);
    doc.collection = format!("doc_{slug}_{}", &hash[..8]);

    match &doc.media_type {
        MediaType::Text | MediaType::Markdown | MediaType::Pdf => {
            let text = match doc.media_type {
                MediaType::Pdf => extract_pdf_text(bytes).await?,
                _ => String::from_utf8_lossy(&bytes).into_owned(),
            };
            if text.trim().is_empty() {
                warn!(path = %path.display(), "No extractable text; the document will have no searchable chunks");
            }
            let chunks = index_text(runtime, &doc.collection, &text).await?;
            info!(id = %doc.id, chunks, "Indexed document text");
            doc.summary = summarize(runtime, &doc.name, &text).await;
            if !text.trim().is_empty() {
                doc = doc.with_text(text);
            }
        }
        MediaType::Csv => {
            let schema = infer_table_schema(path)?;
            info!(id = %doc.id, columns = schema.columns.len(), rows = ?schema.row_count, "Inferred table schema");
            doc = doc.with_table(schema);
        }
        MediaType::Spreadsheet => {
            let schema = infer_workbook_schema(path)?;
            info!(id = %doc.id, columns = schema.columns.len(), rows = ?schema.row_count, "Inferred workbook schema");
            doc = doc.with_table(schema);
        }
        MediaType::Unknown(ext) => return Err(format!("unsupported media type '{ext}'").into()),
    }

    runtime.store.upsert_document(&doc, &hash).await?;
    Ok(Ingested::Stored(doc))
}

/// Chunk, embed, and store `text`. Returns the number of chunks.
async fn index_text(runtime: &Runtime, collection: &str, text: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let store = &runtime.config.store;
    let chunks = chunk_text(text, store.chunk_chars, store.chunk_overlap_chars);
    let timeout = runtime.config.reasoning.embedding_timeout();

    let mut records = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(EMBED_BATCH) {
        let embeddings = tokio::time::timeout(timeout, runtime.services.embedder.embed_batch(batch))
            .await
            .map_err(|_| format!("embedding timed out after {}s", timeout.as_secs()))??;
        if embeddings.len() != batch.len() {
            return Err(format!("embedder returned {} vectors for {} chunks", embeddings.len(), batch.len()).into());
        }
        for (text, embedding) in batch.iter().zip(embeddings) {
            records.push(ChunkRecord {
                index: records.len(),
                text: text.clone(),
                embedding,
            });
        }
    }

    let count = records.len();
    runtime.services.retrieval.replace_collection(collection, records).await?;
    Ok(count)
}

/// Ask the model for an overview. Failures only lose the description hint.
async fn summarize(runtime: &Runtime, name: &str, text: &str) -> Option<String> {
    let reasoning = &runtime.config.reasoning;
    let excerpt = truncate_chars(text, reasoning.summary_source_chars);
    if excerpt.trim().is_empty() {
        return None;
    }
    let request = CompletionRequest::new(&reasoning.model, SUMMARY_SYSTEM, summary_prompt(name, excerpt))
        .with_temperature(reasoning.temperature)
        .with_max_tokens(reasoning.max_tokens);

    match tokio::time::timeout(reasoning.inference_timeout(), runtime.services.inference.complete(request)).await {
        Ok(Ok(summary)) if !summary.trim().is_empty() => Some(summary.trim().to_string()),
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            warn!(document = %name, error = %e, "Summary generation failed");
            None
        }
        Err(_) => {
            warn!(document = %name, "Summary generation timed out");
            None
        }
    }
}

/// Plain text of a PDF. Parsing runs off the async runtime; a parser
/// panic on a malformed file is reported as an error.
async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, String> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| format!("PDF parser aborted: {e}"))?
        .map_err(|e| format!("PDF text extraction failed: {e}"))
}

/// Supported files directly under `dir`, sorted by path.
fn discover(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    files.sort();
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Hex-encoded SHA-256 of the file content.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Split `text` into windows of `chunk_chars` characters, each starting
/// `chunk_chars - overlap_chars` after the previous one. Blank windows
/// are dropped.
pub fn chunk_text(text: &str, chunk_chars: usize, overlap_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_chars == 0 {
        return Vec::new();
    }
    let step = chunk_chars.saturating_sub(overlap_chars).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_chars).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Column names from the header row and types guessed from sampled rows.
///
/// `.tsv` files are read tab-separated. Empty cells do not affect the
/// guess; a column with no values is `text`.
pub fn infer_table_schema(path: &Path) -> Result<TableSchema, csv::Error> {
    let tab_separated = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(if tab_separated { b'\t' } else { b',' })
        .flexible(true)
        .from_path(path)?;

    let mut guesser = ColumnGuesser::new(reader.headers()?.iter());
    for record in reader.records() {
        guesser.observe(record?.iter());
    }
    Ok(guesser.finish())
}

/// Schema of the first worksheet of an `.xlsx` workbook.
pub fn infer_workbook_schema(path: &Path) -> Result<TableSchema, calamine::Error> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    match workbook.worksheet_range_at(0) {
        Some(range) => Ok(worksheet_schema(&range?)),
        None => {
            warn!(path = %path.display(), "Workbook has no worksheets");
            Ok(TableSchema::default())
        }
    }
}

/// The first row names the columns; the rest are data.
fn worksheet_schema(range: &Range<Data>) -> TableSchema {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return TableSchema::default();
    };
    let mut guesser = ColumnGuesser::new(header.iter().map(|cell| cell.to_string()));
    for row in rows {
        guesser.observe(row.iter().map(|cell| cell.to_string()));
    }
    guesser.finish()
}

/// Accumulates per-column type guesses over the first
/// [`SCHEMA_SAMPLE_ROWS`] rows while counting every row.
struct ColumnGuesser {
    names: Vec<String>,
    guesses: Vec<Option<ColumnType>>,
    rows: u64,
}

impl ColumnGuesser {
    fn new<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().trim().to_string()).collect();
        Self {
            guesses: vec![None; names.len()],
            names,
            rows: 0,
        }
    }

    fn observe<S: AsRef<str>>(&mut self, fields: impl IntoIterator<Item = S>) {
        if self.rows < SCHEMA_SAMPLE_ROWS as u64 {
            for (guess, field) in self.guesses.iter_mut().zip(fields) {
                *guess = widen(*guess, field.as_ref());
            }
        }
        self.rows += 1;
    }

    fn finish(self) -> TableSchema {
        let columns = self
            .names
            .into_iter()
            .zip(self.guesses)
            .map(|(name, guess)| ColumnSchema {
                name,
                dtype: guess.unwrap_or(ColumnType::Text),
            })
            .collect();
        TableSchema {
            columns,
            row_count: Some(self.rows),
        }
    }
}

fn classify(field: &str) -> Option<ColumnType> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    Some(if field.parse::<i64>().is_ok() {
        ColumnType::Integer
    } else if field.parse::<f64>().is_ok() {
        ColumnType::Float
    } else if field.eq_ignore_ascii_case("true") || field.eq_ignore_ascii_case("false") {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    })
}

fn widen(current: Option<ColumnType>, field: &str) -> Option<ColumnType> {
    let Some(seen) = classify(field) else {
        return current;
    };
    Some(match (current, seen) {
        (None, t) => t,
        (Some(a), b) if a == b => a,
        (Some(ColumnType::Integer), ColumnType::Float) | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
        _ => ColumnType::Text,
    })
}

//! SQLite document store.
//!
//! Uses a single SQLite database file with three tables:
//! - `documents` — the ingested document catalog (text, summary, schema, hash)
//! - `collections` — names of chunk collections, including empty ones
//! - `chunks` — embedded chunks, one collection per document
//!
//! Similarity ranking is brute-force cosine in Rust; collections are small
//! (one document each) so a full scan per query is cheap.

use crate::vector;
use async_trait::async_trait;
use chrono::Utc;
use docweave_core::document::{Document, MediaType, TableSchema};
use docweave_core::error::RetrievalError;
use docweave_core::memory::{ChunkRecord, RetrievalService, ScoredChunk};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// A persistent document catalog and retrieval service.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    ///
    /// The database and all tables/indexes are created automatically.
    /// An in-memory database lives on one connection that is never
    /// recycled, since every SQLite connection to `:memory:` is private.
    pub async fn new(path: &str) -> Result<Self, RetrievalError> {
        let in_memory = path.contains(":memory:");
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| RetrievalError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| RetrievalError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite document store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, RetrievalError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run schema migrations.
    async fn run_migrations(&self) -> Result<(), RetrievalError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id           TEXT PRIMARY KEY,
                name         TEXT NOT NULL,
                path         TEXT NOT NULL,
                media_type   TEXT NOT NULL,
                collection   TEXT NOT NULL,
                content      TEXT,
                summary      TEXT,
                table_schema TEXT,
                file_hash    TEXT NOT NULL,
                ingested_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RetrievalError::MigrationFailed(format!("documents table: {e}")))?;

        sqlx::query("CREATE TABLE IF NOT EXISTS collections (name TEXT PRIMARY KEY)")
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::MigrationFailed(format!("collections table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                collection   TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
                chunk_index  INTEGER NOT NULL,
                content      TEXT NOT NULL,
                embedding    BLOB NOT NULL,
                PRIMARY KEY (collection, chunk_index)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RetrievalError::MigrationFailed(format!("chunks table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_path ON documents(path)")
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::MigrationFailed(format!("path index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse a `Document` from a SQLite row.
    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, RetrievalError> {
        let column = |name: &str, e: sqlx::Error| RetrievalError::QueryFailed(format!("{name} column: {e}"));

        let id: String = row.try_get("id").map_err(|e| column("id", e))?;
        let name: String = row.try_get("name").map_err(|e| column("name", e))?;
        let path: String = row.try_get("path").map_err(|e| column("path", e))?;
        let media_type: String = row.try_get("media_type").map_err(|e| column("media_type", e))?;
        let collection: String = row.try_get("collection").map_err(|e| column("collection", e))?;
        let content: Option<String> = row.try_get("content").map_err(|e| column("content", e))?;
        let summary: Option<String> = row.try_get("summary").map_err(|e| column("summary", e))?;
        let schema: Option<String> = row.try_get("table_schema").map_err(|e| column("table_schema", e))?;

        let media_type: MediaType = serde_json::from_str(&media_type)
            .map_err(|e| RetrievalError::QueryFailed(format!("media_type value: {e}")))?;
        let table: Option<TableSchema> = schema
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| RetrievalError::QueryFailed(format!("table_schema value: {e}")))?;

        Ok(Document {
            id,
            name,
            path: PathBuf::from(path),
            media_type,
            collection,
            text: content.map(Arc::from),
            summary,
            table,
        })
    }

    /// Insert or update a document. Any other document previously stored
    /// for the same path is removed.
    pub async fn upsert_document(&self, document: &Document, file_hash: &str) -> Result<(), RetrievalError> {
        let media_type = serde_json::to_string(&document.media_type)
            .map_err(|e| RetrievalError::Storage(format!("media_type serialization: {e}")))?;
        let schema = document
            .table
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RetrievalError::Storage(format!("table_schema serialization: {e}")))?;
        let path = document.path.to_string_lossy().to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RetrievalError::Storage(format!("BEGIN failed: {e}")))?;

        sqlx::query(
            r#"
            DELETE FROM collections WHERE name IN (
                SELECT collection FROM documents
                WHERE path = ?1 AND id <> ?2 AND collection <> ?3
            )
            "#,
        )
        .bind(&path)
        .bind(&document.id)
        .bind(&document.collection)
        .execute(&mut *tx)
        .await
        .map_err(|e| RetrievalError::Storage(format!("DELETE stale collections failed: {e}")))?;

        sqlx::query("DELETE FROM documents WHERE path = ?1 AND id <> ?2")
            .bind(&path)
            .bind(&document.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RetrievalError::Storage(format!("DELETE stale failed: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, name, path, media_type, collection, content, summary, table_schema, file_hash, ingested_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                path = excluded.path,
                media_type = excluded.media_type,
                collection = excluded.collection,
                content = excluded.content,
                summary = excluded.summary,
                table_schema = excluded.table_schema,
                file_hash = excluded.file_hash,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(&document.id)
        .bind(&document.name)
        .bind(&path)
        .bind(&media_type)
        .bind(&document.collection)
        .bind(document.text.as_deref())
        .bind(&document.summary)
        .bind(schema.as_deref())
        .bind(file_hash)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RetrievalError::Storage(format!("INSERT failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| RetrievalError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(id = %document.id, "Stored document");
        Ok(())
    }

    /// All documents, ordered by name then id.
    pub async fn list_documents(&self) -> Result<Vec<Document>, RetrievalError> {
        let rows = sqlx::query("SELECT * FROM documents ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RetrievalError::QueryFailed(format!("list documents: {e}")))?;
        rows.iter().map(Self::row_to_document).collect()
    }

    /// The document ingested from `path` when its content hash still
    /// matches. Identical content under another path does not count.
    pub async fn unchanged_document(&self, path: &Path, file_hash: &str) -> Result<Option<Document>, RetrievalError> {
        let row = sqlx::query("SELECT * FROM documents WHERE path = ?1 AND file_hash = ?2 LIMIT 1")
            .bind(path.to_string_lossy().as_ref())
            .bind(file_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RetrievalError::QueryFailed(format!("unchanged document: {e}")))?;
        row.as_ref().map(Self::row_to_document).transpose()
    }

    /// Delete a document and its chunk collection.
    pub async fn remove_document(&self, id: &str) -> Result<bool, RetrievalError> {
        let collection: Option<String> = sqlx::query_scalar("SELECT collection FROM documents WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RetrievalError::QueryFailed(format!("lookup document: {e}")))?;

        let Some(collection) = collection else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM collections WHERE name = ?1")
            .bind(&collection)
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::Storage(format!("DELETE collection failed: {e}")))?;
        sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::Storage(format!("DELETE document failed: {e}")))?;
        Ok(true)
    }

    /// Number of stored documents.
    pub async fn document_count(&self) -> Result<usize, RetrievalError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RetrievalError::QueryFailed(format!("count documents: {e}")))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl RetrievalService for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        if self.collection_len(collection).await?.is_none() {
            return Err(RetrievalError::CollectionNotFound(collection.to_string()));
        }

        let rows = sqlx::query(
            "SELECT chunk_index, content, embedding FROM chunks WHERE collection = ?1 ORDER BY chunk_index",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RetrievalError::QueryFailed(format!("chunk scan: {e}")))?;

        let chunks = rows
            .iter()
            .map(|row| {
                let index: i64 = row
                    .try_get("chunk_index")
                    .map_err(|e| RetrievalError::QueryFailed(format!("chunk_index column: {e}")))?;
                let text: String = row
                    .try_get("content")
                    .map_err(|e| RetrievalError::QueryFailed(format!("content column: {e}")))?;
                let blob: Vec<u8> = row
                    .try_get("embedding")
                    .map_err(|e| RetrievalError::QueryFailed(format!("embedding column: {e}")))?;
                Ok(ChunkRecord {
                    index: index as usize,
                    text,
                    embedding: vector::blob_to_embedding(&blob),
                })
            })
            .collect::<Result<Vec<_>, RetrievalError>>()?;

        Ok(vector::rank_chunks(&chunks, query, k))
    }

    async fn replace_collection(
        &self,
        collection: &str,
        chunks: Vec<ChunkRecord>,
    ) -> Result<(), RetrievalError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RetrievalError::Storage(format!("BEGIN failed: {e}")))?;

        sqlx::query("INSERT OR IGNORE INTO collections (name) VALUES (?1)")
            .bind(collection)
            .execute(&mut *tx)
            .await
            .map_err(|e| RetrievalError::Storage(format!("INSERT collection failed: {e}")))?;

        sqlx::query("DELETE FROM chunks WHERE collection = ?1")
            .bind(collection)
            .execute(&mut *tx)
            .await
            .map_err(|e| RetrievalError::Storage(format!("DELETE chunks failed: {e}")))?;

        for chunk in &chunks {
            sqlx::query(
                "INSERT INTO chunks (collection, chunk_index, content, embedding) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(collection)
            .bind(chunk.index as i64)
            .bind(&chunk.text)
            .bind(vector::embedding_to_blob(&chunk.embedding))
            .execute(&mut *tx)
            .await
            .map_err(|e| RetrievalError::Storage(format!("INSERT chunk failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| RetrievalError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(collection, count = chunks.len(), "Replaced collection");
        Ok(())
    }

    async fn collection_len(&self, collection: &str) -> Result<Option<usize>, RetrievalError> {
        let exists: Option<String> = sqlx::query_scalar("SELECT name FROM collections WHERE name = ?1")
            .bind(collection)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RetrievalError::QueryFailed(format!("collection lookup: {e}")))?;
        if exists.is_none() {
            return Ok(None);
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RetrievalError::QueryFailed(format!("chunk count: {e}")))?;
        Ok(Some(count as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docweave_core::document::{ColumnSchema, ColumnType};

    async fn test_store(dir: &tempfile::TempDir) -> SqliteStore {
        let path = dir.path().join("docweave.db");
        SqliteStore::new(&format!("sqlite://{}", path.display())).await.unwrap()
    }

    fn chunk(index: usize, text: &str, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            index,
            text: text.into(),
            embedding,
        }
    }

    #[tokio::test]
    async fn store_and_search_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store
            .replace_collection(
                "doc_report",
                vec![
                    chunk(0, "Company history", vec![0.0, 1.0]),
                    chunk(1, "Revenue was $4.2M", vec![1.0, 0.2]),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("doc_report", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "Revenue was $4.2M");
        assert_eq!(hits[0].index, 1);
    }

    #[tokio::test]
    async fn missing_and_empty_collections() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        assert!(matches!(
            store.search("doc_missing", &[1.0], 3).await.unwrap_err(),
            RetrievalError::CollectionNotFound(_)
        ));

        store.replace_collection("doc_scan", vec![]).await.unwrap();
        assert!(store.search("doc_scan", &[1.0], 3).await.unwrap().is_empty());
        assert_eq!(store.collection_len("doc_scan").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn replace_collection_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store
            .replace_collection("doc_a", vec![chunk(0, "v1", vec![1.0]), chunk(1, "v1b", vec![1.0])])
            .await
            .unwrap();
        store
            .replace_collection("doc_a", vec![chunk(0, "v2", vec![1.0])])
            .await
            .unwrap();
        assert_eq!(store.collection_len("doc_a").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn document_catalog_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        let sales = Document::new("sales-1", "/data/sales.csv").with_table(TableSchema {
            columns: vec![ColumnSchema {
                name: "revenue".into(),
                dtype: ColumnType::Float,
            }],
            row_count: Some(3),
        });
        let notes = Document::new("notes-1", "/data/notes.md")
            .with_text("Quarterly notes")
            .with_summary("Notes about the quarter");

        store.upsert_document(&sales, "hash-sales").await.unwrap();
        store.upsert_document(&notes, "hash-notes").await.unwrap();

        let docs = store.list_documents().await.unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["notes.md", "sales.csv"]);
        assert_eq!(docs[0].text.as_deref(), Some("Quarterly notes"));
        assert_eq!(docs[1].media_type, MediaType::Csv);
        assert_eq!(docs[1].table.as_ref().unwrap().columns[0].name, "revenue");

        let found = store
            .unchanged_document(Path::new("/data/notes.md"), "hash-notes")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "notes-1");
        assert!(store.unchanged_document(Path::new("/data/notes.md"), "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn in_memory_store_is_shared_across_calls() {
        let store = SqliteStore::new("sqlite::memory:").await.unwrap();
        for i in 0..6 {
            let doc = Document::new(format!("doc-{i}"), format!("/m/{i}.txt")).with_text("x");
            store.upsert_document(&doc, &format!("h{i}")).await.unwrap();
        }
        store
            .replace_collection("doc_0", vec![chunk(0, "x", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.document_count().await.unwrap(), 6);
        assert_eq!(store.collection_len("doc_0").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn same_content_under_another_path_is_not_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        let a = Document::new("a-0123", "/data/a.txt").with_text("same words");
        store.upsert_document(&a, "same-hash").await.unwrap();

        let copy = Path::new("/data/b.txt");
        assert!(store.unchanged_document(copy, "same-hash").await.unwrap().is_none());

        let b = Document::new("b-0123", copy).with_text("same words");
        store.upsert_document(&b, "same-hash").await.unwrap();
        assert_eq!(store.document_count().await.unwrap(), 2);
        let ids: Vec<String> = store.list_documents().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a-0123", "b-0123"]);
    }

    #[tokio::test]
    async fn reingesting_a_path_replaces_the_old_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        let v1 = Document::new("report-aaa", "/data/report.txt").with_text("v1");
        let v2 = Document::new("report-bbb", "/data/report.txt").with_text("v2");
        store.upsert_document(&v1, "aaa").await.unwrap();
        store.upsert_document(&v2, "bbb").await.unwrap();

        assert_eq!(store.document_count().await.unwrap(), 1);
        let docs = store.list_documents().await.unwrap();
        assert_eq!(docs[0].id, "report-bbb");
    }

    #[tokio::test]
    async fn remove_document_drops_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        let doc = Document::new("d1", "/data/a.txt");
        store.upsert_document(&doc, "h").await.unwrap();
        store
            .replace_collection(&doc.collection, vec![chunk(0, "x", vec![1.0])])
            .await
            .unwrap();

        assert!(store.remove_document("d1").await.unwrap());
        assert!(!store.remove_document("d1").await.unwrap());
        assert_eq!(store.collection_len(&doc.collection).await.unwrap(), None);
    }
}

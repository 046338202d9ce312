//! Shared setup for commands that need the store and the model providers.

use docweave_config::{AppConfig, StoreConfig};
use docweave_core::document::Document;
use docweave_core::error::RetrievalError;
use docweave_core::memory::RetrievalService;
use docweave_core::services::Services;
use docweave_memory::SqliteStore;
use docweave_tools::ProcessSandbox;
use std::sync::Arc;

/// Loaded configuration plus the capabilities built from it.
pub struct Runtime {
    pub config: AppConfig,
    pub store: Arc<SqliteStore>,
    pub services: Services,
}

impl Runtime {
    /// Load `~/.docweave/config.toml` and build everything from it.
    pub async fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = Arc::new(open_store(&config.store).await?);
        let providers = docweave_providers::build_from_config(&config)
            .map_err(|e| format!("Failed to build providers: {e}"))?;
        let sandbox = ProcessSandbox::new(&config.sandbox.interpreter)
            .with_max_output_chars(config.sandbox.max_output_chars);

        let retrieval: Arc<dyn RetrievalService> = store.clone();
        let services = Services::new(providers.inference, providers.embedder, retrieval, Arc::new(sandbox));
        Ok(Self {
            config,
            store,
            services,
        })
    }

    /// Ingested documents matching `names` (by name, id, or slug).
    ///
    /// An empty selection means every ingested document.
    pub async fn documents(&self, names: &[String]) -> Result<Vec<Document>, Box<dyn std::error::Error>> {
        let all = self.store.list_documents().await?;
        if names.is_empty() {
            return Ok(all);
        }

        let mut selected = Vec::new();
        for name in names {
            let matches: Vec<Document> = all
                .iter()
                .filter(|d| d.name == *name || d.id == *name || d.slug() == *name)
                .cloned()
                .collect();
            if matches.is_empty() {
                return Err(format!("No ingested document matches '{name}'. Run `docweave ingest <dir>` first.").into());
            }
            selected.extend(matches);
        }
        Ok(selected)
    }
}

/// SQLite connection string for the configured backend.
///
/// The `memory` backend keeps nothing between invocations.
pub fn database_url(store: &StoreConfig) -> String {
    match store.backend.as_str() {
        "memory" => "sqlite::memory:".into(),
        _ => format!("sqlite://{}", store.database_path().display()),
    }
}

/// Open the document store, creating its directory if needed.
pub async fn open_store(store: &StoreConfig) -> Result<SqliteStore, RetrievalError> {
    if store.backend != "memory" {
        if let Some(parent) = store.database_path().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RetrievalError::Storage(format!("Cannot create {}: {e}", parent.display())))?;
        }
    }
    SqliteStore::new(&database_url(store)).await
}

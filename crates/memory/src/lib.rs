//! Retrieval service implementations for DocWeave.

pub mod in_memory;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryRetrieval;
pub use vector::{cosine_similarity, rank_chunks};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

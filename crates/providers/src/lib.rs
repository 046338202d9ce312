//! Model provider implementations for DocWeave.
//!
//! All chat providers implement `docweave_core::InferenceService`; embedding
//! backends implement `docweave_core::Embedder`. `build_from_config`
//! selects them from configuration. The on-device sentence embedder lives
//! behind the default `local` feature; the hashing embedder is the
//! dependency-free fallback.

pub mod hashing;
#[cfg(feature = "local")]
pub mod local;
pub mod openai_compat;
pub mod router;

pub use hashing::HashingEmbedder;
#[cfg(feature = "local")]
pub use local::LocalEmbedder;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderSet, build_from_config, default_base_url};

//! Document tools for DocWeave.
//!
//! Tools are bound to a single document when a registry is built:
//! vector search and summary for text-like documents, tabular analysis
//! for tables. The [`ToolFactory`] builds a [`ToolRegistry`] for a
//! document set and [`RegistryCache`] shares registries across requests.

pub mod factory;
pub mod registry;
pub mod sandbox;
pub mod summary;
pub mod tabular;
pub mod tool;
pub mod vector_search;

#[cfg(test)]
mod test_support;

pub use factory::ToolFactory;
pub use registry::{RegisteredTool, RegistryCache, ToolRegistry};
pub use sandbox::{PANDAS_PRELUDE, ProcessSandbox};
pub use summary::SummaryTool;
pub use tabular::TabularAnalysisTool;
pub use tool::{Tool, ToolBinding, ToolRequest};
pub use vector_search::VectorSearchTool;

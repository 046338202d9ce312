//! `docweave tools` — Show the tool registry for the selected documents.

use docweave_agent::DocumentAgent;

use super::runtime::Runtime;

pub async fn run(docs: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::load().await?;
    let documents = runtime.documents(&docs).await?;
    if documents.is_empty() {
        println!("⚠️  No documents ingested yet. Run `docweave ingest <dir>` first.");
        return Ok(());
    }

    let agent = DocumentAgent::new(runtime.services.clone(), runtime.config.reasoning.clone());
    let registry = agent.try_registry_for(&documents).await?;

    println!("🔧 {} tool(s) for {} document(s)\n", registry.len(), documents.len());
    let width = registry.names().iter().map(|n| n.len()).max().unwrap_or(0);
    for entry in registry.iter() {
        let tool = &entry.tool;
        println!(
            "  {:<width$}  {:<16}  {}",
            tool.name(),
            tool.kind().to_string(),
            tool.binding().document_name()
        );
    }

    for warning in registry.warnings() {
        println!("  ⚠️  {warning}");
    }

    Ok(())
}

//! `docweave ask` — Single question or interactive mode.

use docweave_agent::{DocumentAgent, ReasoningOutcome};
use docweave_core::document::Document;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::runtime::Runtime;

pub async fn run(docs: Vec<String>, trace: bool, message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::load().await?;

    // Fail early with setup instructions when no key is set
    if !runtime.config.has_api_key() && runtime.config.provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DOCWEAVE_API_KEY   (generic)");
        eprintln!("    GROQ_API_KEY       (for Groq, the default provider)");
        eprintln!("    OPENAI_API_KEY     (for OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", docweave_config::AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let documents = runtime.documents(&docs).await?;
    let agent = DocumentAgent::new(runtime.services.clone(), runtime.config.reasoning.clone());

    if let Some(msg) = message {
        // Single message mode
        if !answer(&agent, &msg, &documents, trace).await {
            return Err("Reasoning failed. See above for details.".into());
        }
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        DocWeave — Interactive Mode           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:   {}", runtime.config.provider);
    println!("  Model:      {}", runtime.config.reasoning.model);
    println!("  Documents:  {}", document_list(&documents));
    println!("  Max hops:   {}", runtime.config.reasoning.max_iterations);
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit" | "q") {
            break;
        }
        answer(&agent, query, &documents, trace).await;
        println!();
    }

    println!("  Goodbye!");
    Ok(())
}

/// Run one query and print the result. Returns false on a hard failure.
async fn answer(agent: &DocumentAgent, query: &str, documents: &[Document], trace: bool) -> bool {
    eprint!("  Thinking...");
    let result = agent.run(query, documents).await;
    eprint!("\r              \r");

    match result {
        Ok(outcome) => {
            print_outcome(&outcome);
            if trace {
                print_trace(outcome.scratchpad.to_json());
            }
            true
        }
        Err(e) => {
            eprintln!("  ❌ Could not answer: {e}");
            if let (true, Some(pad)) = (trace, e.trace()) {
                print_trace(pad.to_json());
            }
            false
        }
    }
}

fn print_outcome(outcome: &ReasoningOutcome) {
    println!("{}", outcome.answer);
    println!();
    let marker = if outcome.is_degraded() { "⚠️ " } else { "✅" };
    println!(
        "  {marker} {} · {} iteration(s), {} observation(s)",
        outcome.kind,
        outcome.iterations,
        outcome.steps().len()
    );
}

fn print_trace(json: Result<String, serde_json::Error>) {
    match json {
        Ok(json) => println!("\n{json}"),
        Err(e) => warn!(error = %e, "Failed to serialize trace"),
    }
}

fn document_list(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "(none ingested)".into();
    }
    documents
        .iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

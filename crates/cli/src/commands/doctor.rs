//! `docweave doctor` — Diagnose system health.

use docweave_config::AppConfig;
use std::process::Stdio;

use super::runtime::open_store;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 DocWeave Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults. Run `docweave onboard` to create one.");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid (provider: {}, model: {})", config.provider, config.reasoning.model);
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else if config.provider == "ollama" {
        println!("  ✅ No API key needed for ollama");
    } else {
        println!("  ⚠️  No API key configured — set DOCWEAVE_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    println!(
        "  ✅ Embedder: {} ({})",
        config.embedding.provider,
        config.embedding.model_name()
    );

    match open_store(&config.store).await {
        Ok(store) => match store.document_count().await {
            Ok(count) => println!("  ✅ Document store reachable ({count} document(s))"),
            Err(e) => {
                println!("  ❌ Document store query failed: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Document store unavailable: {e}");
            issues += 1;
        }
    }

    let interpreter = &config.sandbox.interpreter;
    if interpreter_available(interpreter).await {
        println!("  ✅ Interpreter `{interpreter}` available");
    } else {
        println!("  ⚠️  Interpreter `{interpreter}` not found — tabular analysis will fail");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

async fn interpreter_available(interpreter: &str) -> bool {
    tokio::process::Command::new(interpreter)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok_and(|status| status.success())
}

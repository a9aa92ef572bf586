//! Info command - show version, paths and backend status

use anyhow::Result;
use semcode::core::language::Language;
use semcode::embed::OllamaEmbedder;

use super::Workspace;

pub async fn run(ws: &Workspace) -> Result<()> {
    println!("semcode v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("System Information:");
    println!("  OS: {} {}", std::env::consts::OS, std::env::consts::ARCH);

    println!();
    println!("Paths:");
    println!("  Config dir: {}", config_dir());
    println!("  Project root: {}", ws.root.display());
    println!("  Index: {}", ws.db_path.display());
    let rules = ws.rules_path();
    let rules_state = if rules.exists() { "" } else { " (absent, using built-in rules)" };
    println!("  Rules: {}{}", rules.display(), rules_state);

    println!();
    println!("Languages:");
    let names: Vec<&str> = Language::ALL.iter().map(|l| l.name()).collect();
    println!("  {}", names.join(", "));

    println!();
    println!("Embedding Backend:");
    println!("  Provider: {}", ws.config.embedding.provider);
    println!("  Model: {}", ws.config.embedding.model);
    let status = if ws.config.embedding.provider != "ollama" {
        "unknown provider"
    } else {
        match OllamaEmbedder::new(&ws.config.embedding) {
            Ok(client) => {
                if client.is_available().await {
                    "reachable"
                } else {
                    "not reachable"
                }
            }
            Err(_) => "not reachable",
        }
    };
    println!("  Endpoint: {} ({})", ws.config.embedding.endpoint, status);

    Ok(())
}

fn config_dir() -> String {
    directories::ProjectDirs::from("dev", "semcode", "semcode")
        .map(|p| p.config_dir().to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

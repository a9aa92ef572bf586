//! Rules command - inspect, validate or scaffold classification rules

use std::path::Path;

use anyhow::{Context, Result};
use semcode::heuristics::{HeuristicsConfig, RulesSource};

use super::Workspace;
use crate::ui;

pub fn run(ws: &Workspace, check: Option<&str>, init: bool) -> Result<()> {
    if let Some(path) = check {
        return check_file(Path::new(path));
    }
    if init {
        return init_file(ws);
    }

    let snapshot = ws.heuristics().snapshot();
    match &snapshot.source {
        RulesSource::Builtin => println!("# built-in rules"),
        RulesSource::File(path) => println!("# rules from {}", path.display()),
    }
    let text = snapshot
        .config
        .to_toml_string()
        .context("Failed to render rules")?;
    println!("{}", text);
    Ok(())
}

fn check_file(path: &Path) -> Result<()> {
    let config = HeuristicsConfig::load(path).with_context(|| format!("Invalid rules file {}", path.display()))?;
    ui::print_success(&format!(
        "{} is valid: {} purpose rules, {} domain rules, {} type clusters",
        path.display(),
        config.purpose.rules.len(),
        config.domains.len(),
        config.type_clusters.len()
    ));
    for (section, label, raw) in config.unrecognized_conditions() {
        ui::print_warning(&format!("Rule `{}` in `{}`: unrecognized condition {} never matches", label, section, raw));
    }
    Ok(())
}

fn init_file(ws: &Workspace) -> Result<()> {
    let path = ws.rules_path();
    if path.exists() {
        println!("Rules file already exists at {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let text = HeuristicsConfig::builtin()
        .to_toml_string()
        .context("Failed to render built-in rules")?;
    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;

    ui::print_success(&format!("Built-in rules written to {}", path.display()));
    Ok(())
}

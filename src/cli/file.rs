//! File command - show the stored chunks of one file

use anyhow::Result;

use super::search::print_chunk_line;
use super::Workspace;
use crate::ui::{self, symbols, Palette};

pub fn run(ws: &Workspace, path: &str, show_code: bool, json: bool) -> Result<()> {
    let file_path = ws.relative(path);
    let chunks = ws.store.get_chunks_by_file(&file_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    if chunks.is_empty() {
        ui::print_warning(&format!("No chunks stored for {}", file_path));
        return Ok(());
    }

    let palette = Palette::new();
    println!();
    println!(
        "{} {} {}",
        palette.primary.apply_to(symbols::FILE),
        palette.fg.apply_to(&file_path).bold(),
        palette.muted.apply_to(format!("({} chunks)", chunks.len()))
    );
    println!("{}", palette.muted.apply_to(symbols::DIVIDER.repeat(60)));

    for chunk in &chunks {
        print_chunk_line(chunk, None);
        println!(
            "      {}",
            palette.muted.apply_to(format!(
                "{} · complexity {} ({}) · {}",
                chunk.node_kind,
                chunk.complexity.score,
                chunk.complexity.level.as_str(),
                chunk.tags.join(", ")
            ))
        );
        if show_code {
            for line in chunk.code.lines() {
                println!("      {}", palette.fg.apply_to(line));
            }
            println!();
        }
    }
    println!();
    Ok(())
}

//! Search commands - vector similarity and plain text over stored chunks

use anyhow::{Context, Result};
use semcode::core::chunk::{ChunkCategory, SemanticChunk};
use semcode::search::{SearchHit, SimilaritySearch};

use super::Workspace;
use crate::ui::{self, symbols, Palette};

const SNIPPET_LINES: usize = 4;

pub async fn run(ws: &Workspace, query: &str, limit: Option<usize>, threshold: Option<f32>, json: bool) -> Result<()> {
    let limit = limit.unwrap_or(ws.config.search.default_limit);
    let threshold = threshold.unwrap_or(ws.config.search.threshold);

    let service = ws.embedding_service()?;
    let search = SimilaritySearch::new(service, ws.config.search.batch_size);
    let hits = search.search(query, limit, threshold).await.with_context(|| {
        format!(
            "Search failed. Is the embedding backend running at {}? `semcode grep` works offline.",
            ws.config.embedding.endpoint
        )
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    print_header(query);
    if hits.is_empty() {
        print_no_results(query, threshold);
        return Ok(());
    }
    for (rank, hit) in hits.iter().enumerate() {
        print_hit(rank + 1, hit);
    }
    Ok(())
}

pub fn grep(ws: &Workspace, query: &str, limit: usize, json: bool) -> Result<()> {
    let chunks = ws.store.search_chunks_by_text(query, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    print_header(query);
    if chunks.is_empty() {
        ui::print_warning(&format!("No chunks contain \"{}\"", query));
        return Ok(());
    }
    for chunk in &chunks {
        print_chunk_line(chunk, None);
    }
    println!();
    Ok(())
}

fn print_header(query: &str) {
    let palette = Palette::new();
    println!();
    println!(
        "{} {}",
        palette.primary.apply_to(symbols::SEARCH),
        palette.fg.apply_to(format!("\"{}\"", query)).bold()
    );
    println!("{}", palette.muted.apply_to(symbols::DIVIDER.repeat(60)));
}

fn print_no_results(query: &str, threshold: f32) {
    ui::print_warning(&format!("No chunks reach similarity {:.2} for \"{}\"", threshold, query));
    println!("  Try a lower --threshold, or run `semcode embed` if the index is new.");
}

pub fn print_chunk_line(chunk: &SemanticChunk, similarity: Option<f32>) {
    let palette = Palette::new();
    let icon = match chunk.category {
        ChunkCategory::Function => symbols::FUNCTION,
        ChunkCategory::Structure => symbols::STRUCT,
    };
    let score = similarity
        .map(|s| format!("{:>5.1}% ", s * 100.0))
        .unwrap_or_default();

    println!(
        "  {}{} {} {}",
        palette.accent.apply_to(score),
        palette.primary.apply_to(icon),
        palette.fg.apply_to(&chunk.name).bold(),
        palette.muted.apply_to(format!(
            "{}:{}-{}  {}",
            chunk.file_path, chunk.start_line, chunk.end_line, chunk.purpose
        ))
    );
}

fn print_hit(rank: usize, hit: &SearchHit) {
    let palette = Palette::new();
    print!("{} ", palette.muted.apply_to(format!("{:>2}.", rank)));
    print_chunk_line(&hit.chunk, Some(hit.similarity));

    let mut tags: Vec<&str> = hit.chunk.business_domain.iter().map(String::as_str).collect();
    tags.extend(hit.chunk.technical_patterns.iter().map(String::as_str));
    if !tags.is_empty() {
        println!("      {}", palette.muted.apply_to(tags.join(" · ")));
    }

    let body = hit.chunk.code.lines().filter(|l| !l.trim().is_empty());
    for line in body.take(SNIPPET_LINES) {
        println!("      {}", palette.fg.apply_to(line));
    }
    println!();
}

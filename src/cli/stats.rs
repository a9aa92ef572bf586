//! Stats command - aggregate index statistics

use anyhow::Result;

use super::Workspace;
use crate::ui::{self, symbols, Palette};

pub fn run(ws: &Workspace, json: bool) -> Result<()> {
    let stats = ws.store.stats(ws.model_name())?;
    let missing = ws.store.count_missing_embeddings(ws.model_name())?;

    if json {
        let value = serde_json::json!({
            "totalFiles": stats.total_files,
            "totalChunks": stats.total_chunks,
            "totalEmbeddings": stats.total_embeddings,
            "missingEmbeddings": missing,
            "avgChunkSize": stats.avg_chunk_size,
            "model": ws.model_name(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let palette = Palette::new();
    ui::print_panel(
        &palette.primary,
        symbols::LOADING,
        "Index Statistics",
        &[
            ("Files".to_string(), stats.total_files.to_string()),
            ("Chunks".to_string(), stats.total_chunks.to_string()),
            ("Avg Chunk Size".to_string(), format!("{:.0} chars", stats.avg_chunk_size)),
            (
                "Embeddings".to_string(),
                format!("{} ({})", stats.total_embeddings, ws.model_name()),
            ),
            ("Missing".to_string(), missing.to_string()),
        ],
    );
    Ok(())
}

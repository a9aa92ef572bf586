//! Embed command - backfill vectors for chunks that have none

use anyhow::{Context, Result};

use super::Workspace;
use crate::ui;

pub async fn run(ws: &Workspace) -> Result<()> {
    let missing = ws.store.count_missing_embeddings(ws.model_name())?;
    if missing == 0 {
        ui::print_success(&format!("Every chunk already has a `{}` embedding", ws.model_name()));
        return Ok(());
    }

    let service = ws.embedding_service()?;
    let pb = ui::progress_bar(missing as u64, "Embedding")?;
    pb.set_message(ws.model_name().to_string());

    let report = service
        .embed_missing(ws.config.embedding.batch_size, |done| pb.set_position(done as u64))
        .await
        .with_context(|| {
            format!(
                "Embedding failed. Is the backend running at {}?",
                ws.config.embedding.endpoint
            )
        })?;
    pb.finish_and_clear();

    ui::print_success(&format!(
        "Generated {} embeddings with `{}`",
        report.embedded,
        ws.model_name()
    ));
    Ok(())
}

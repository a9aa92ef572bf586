//! Nearest-neighbour search over stored embeddings
//!
//! Vectors for the active model are scanned in fixed-size batches and ranked
//! by cosine similarity. The scan yields to the runtime between batches so a
//! large index never monopolises the executor.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::core::chunk::SemanticChunk;
use crate::embed::EmbeddingService;
use crate::error::SearchError;

/// A chunk and how close it is to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub chunk: SemanticChunk,
    pub similarity: f32,
}

/// Cosine similarity in `[-1, 1]`; 0 when either vector has zero magnitude
/// or the dimensions differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

fn has_magnitude(v: &[f32]) -> bool {
    v.iter().any(|x| *x != 0.0)
}

pub struct SimilaritySearch {
    embeddings: Arc<EmbeddingService>,
    batch_size: usize,
}

impl SimilaritySearch {
    pub fn new(embeddings: Arc<EmbeddingService>, batch_size: usize) -> Self {
        Self {
            embeddings,
            batch_size: batch_size.max(1),
        }
    }

    /// Chunks whose similarity to `query` is at least `threshold`, best
    /// first, at most `limit` of them
    pub async fn search(&self, query: &str, limit: usize, threshold: f32) -> Result<Vec<SearchHit>, SearchError> {
        let query_vector = self.embeddings.embed_query(query).await?;
        self.search_vector(&query_vector, limit, threshold).await
    }

    pub async fn search_vector(
        &self,
        query_vector: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if limit == 0 || !has_magnitude(query_vector) {
            return Ok(Vec::new());
        }

        let store = self.embeddings.store();
        let model = self.embeddings.model_name().to_string();

        let mut scored: Vec<(String, f32)> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut scanned = 0usize;

        loop {
            let batch = store.embedding_batch(&model, cursor.as_deref(), self.batch_size)?;
            let Some((last_id, _)) = batch.last() else {
                break;
            };
            cursor = Some(last_id.clone());
            scanned += batch.len();

            for (chunk_id, vector) in batch {
                // Zero or mismatched vectors carry no signal and never rank
                if vector.len() != query_vector.len() || !has_magnitude(&vector) {
                    continue;
                }
                let similarity = cosine_similarity(query_vector, &vector);
                if similarity >= threshold {
                    scored.push((chunk_id, similarity));
                }
            }

            tokio::task::yield_now().await;
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(limit);
        debug!("Scanned {} vectors, {} above threshold {}", scanned, scored.len(), threshold);

        let ids: Vec<String> = scored.iter().map(|(id, _)| id.clone()).collect();
        let mut chunks: HashMap<String, SemanticChunk> = store
            .get_chunks_by_ids(&ids)?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        Ok(scored
            .into_iter()
            .filter_map(|(id, similarity)| chunks.remove(&id).map(|chunk| SearchHit { chunk, similarity }))
            .collect())
    }
}

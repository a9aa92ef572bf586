//! Embedding generation
//!
//! A [`Vectorizer`] turns text into a vector. [`EmbeddingService`] computes
//! at most one embedding per `(chunk id, model)` and persists it.

pub mod ollama;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::EmbeddingConfig;
use crate::core::chunk::SemanticChunk;
use crate::core::context::truncate_chars;
use crate::error::EmbedError;
use crate::store::ChunkStore;

pub use ollama::OllamaEmbedder;

/// Embedding backend
#[async_trait]
pub trait Vectorizer: Send + Sync {
    /// Name the vectors are stored under
    fn model_name(&self) -> &str;

    async fn vectorize(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Build the configured backend
pub fn vectorizer_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Vectorizer>, EmbedError> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        other => Err(EmbedError::UnknownProvider(other.to_string())),
    }
}

/// Text sent to the backend for a chunk: name, purpose and code
pub fn embedding_input(chunk: &SemanticChunk, max_chars: usize) -> String {
    let text = format!("{}\n{}\n{}", chunk.name, chunk.purpose, chunk.code);
    truncate_chars(&text, max_chars).to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbedReport {
    pub embedded: usize,
    pub batches: usize,
}

pub struct EmbeddingService {
    store: Arc<ChunkStore>,
    vectorizer: Arc<dyn Vectorizer>,
    max_input_chars: usize,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl EmbeddingService {
    pub fn new(store: Arc<ChunkStore>, vectorizer: Arc<dyn Vectorizer>, max_input_chars: usize) -> Self {
        Self {
            store,
            vectorizer,
            max_input_chars,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn model_name(&self) -> &str {
        self.vectorizer.model_name()
    }

    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    /// Stored vector for `chunk`, computing and persisting it on first use
    pub async fn embed(&self, chunk: &SemanticChunk) -> Result<Vec<f32>, EmbedError> {
        let model = self.vectorizer.model_name().to_string();

        let key_lock = {
            let mut in_flight = self.in_flight.lock();
            in_flight
                .entry(chunk.id.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let guard = key_lock.lock().await;

        let result = self.embed_locked(chunk, &model).await;

        drop(guard);
        {
            let mut in_flight = self.in_flight.lock();
            // Last holder cleans up; the map keeps one clone, we hold the other
            if Arc::strong_count(&key_lock) <= 2 {
                in_flight.remove(&chunk.id);
            }
        }
        result
    }

    async fn embed_locked(&self, chunk: &SemanticChunk, model: &str) -> Result<Vec<f32>, EmbedError> {
        if let Some(existing) = self.store.get_embedding(&chunk.id, model)? {
            return Ok(existing);
        }

        let vector = self
            .vectorizer
            .vectorize(&embedding_input(chunk, self.max_input_chars))
            .await?;
        if vector.is_empty() {
            return Err(EmbedError::EmptyVector);
        }

        self.store.upsert_embedding(&chunk.id, model, &vector)?;
        debug!("Embedded {} ({} dims)", chunk.id, vector.len());
        Ok(vector)
    }

    /// Vector for free text, never cached
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let vector = self
            .vectorizer
            .vectorize(truncate_chars(text, self.max_input_chars))
            .await?;
        if vector.is_empty() {
            return Err(EmbedError::EmptyVector);
        }
        Ok(vector)
    }

    /// Embed every chunk that has no vector for the active model, in
    /// batches of `batch_size`, yielding to the runtime between batches.
    /// `on_batch` receives the running total after each batch.
    pub async fn embed_missing<F>(&self, batch_size: usize, mut on_batch: F) -> Result<EmbedReport, EmbedError>
    where
        F: FnMut(usize),
    {
        let model = self.model_name().to_string();
        let batch_size = batch_size.max(1);
        let mut report = EmbedReport::default();

        loop {
            let pending = self.store.chunks_missing_embeddings(&model, batch_size)?;
            if pending.is_empty() {
                break;
            }

            for chunk in &pending {
                self.embed(chunk).await?;
                report.embedded += 1;
            }
            report.batches += 1;
            on_batch(report.embedded);

            tokio::task::yield_now().await;
        }

        info!("Generated {} embeddings in {} batches", report.embedded, report.batches);
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Deterministic in-process backend that counts its calls
    pub struct SpyVectorizer {
        pub calls: AtomicUsize,
        pub inputs: Mutex<Vec<String>>,
    }

    impl SpyVectorizer {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Bag-of-letters vector: texts sharing letters point the same way
        pub fn vector_for(text: &str) -> Vec<f32> {
            let mut v = vec![0.0f32; 26];
            for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
            v
        }
    }

    #[async_trait]
    impl Vectorizer for SpyVectorizer {
        fn model_name(&self) -> &str {
            "spy"
        }

        async fn vectorize(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inputs.lock().push(text.to_string());
            tokio::task::yield_now().await;
            Ok(Self::vector_for(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::SpyVectorizer;
    use super::*;
    use crate::core::chunk::{chunk_id, ChunkCategory, Complexity, ComplexityLevel, Includes};

    fn chunk(name: &str, line: usize, code: &str) -> SemanticChunk {
        SemanticChunk {
            id: chunk_id("src/a.ts", name, line),
            name: name.to_string(),
            file_path: "src/a.ts".to_string(),
            category: ChunkCategory::Function,
            node_kind: "function_declaration".to_string(),
            code: code.to_string(),
            start_line: line,
            end_line: line,
            complexity: Complexity { score: 1, level: ComplexityLevel::Low },
            purpose: "general logic".to_string(),
            business_domain: Vec::new(),
            technical_patterns: Vec::new(),
            includes: Includes::default(),
            is_exported: false,
            is_async: false,
            tags: vec!["minimal-context".to_string()],
            bundles: Vec::new(),
        }
    }

    fn service(chunks: &[SemanticChunk]) -> (EmbeddingService, Arc<SpyVectorizer>) {
        let store = Arc::new(ChunkStore::open_in_memory().unwrap());
        store.upsert_chunks(chunks).unwrap();
        let spy = Arc::new(SpyVectorizer::new());
        (EmbeddingService::new(store, spy.clone(), 8192), spy)
    }

    #[tokio::test]
    async fn test_embed_computes_at_most_once() {
        let c = chunk("getUser", 1, "function getUser() {}");
        let (service, spy) = service(&[c.clone()]);

        let first = service.embed(&c).await.unwrap();
        let second = service.embed(&c).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(spy.calls(), 1);
    }

    #[tokio::test]
    async fn test_reindexed_chunk_keeps_its_embedding() {
        let mut c = chunk("f", 1, "function f() {}");
        let (service, spy) = service(&[c.clone()]);
        let first = service.embed(&c).await.unwrap();

        c.code = "function f() { return 42; }".to_string();
        service.store().upsert_chunks(&[c.clone()]).unwrap();
        let second = service.embed(&c).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(spy.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_embeds_share_one_computation() {
        let c = chunk("getUser", 1, "function getUser() {}");
        let (service, spy) = service(&[c.clone()]);

        let (a, b) = tokio::join!(service.embed(&c), service.embed(&c));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(spy.calls(), 1);
        assert!(service.in_flight.lock().is_empty());
    }

    #[tokio::test]
    async fn test_embed_missing_covers_every_chunk() {
        let chunks: Vec<_> = (0..7).map(|i| chunk(&format!("f{}", i), i + 1, "body")).collect();
        let (service, spy) = service(&chunks);
        service.embed(&chunks[0]).await.unwrap();

        let mut progress = Vec::new();
        let report = service.embed_missing(3, |n| progress.push(n)).await.unwrap();
        assert_eq!(report, EmbedReport { embedded: 6, batches: 2 });
        assert_eq!(progress, vec![3, 6]);
        assert_eq!(spy.calls(), 7);
        assert_eq!(service.store().count_missing_embeddings("spy").unwrap(), 0);

        let again = service.embed_missing(3, |_| {}).await.unwrap();
        assert_eq!(again.embedded, 0);
        assert_eq!(spy.calls(), 7);
    }

    #[tokio::test]
    async fn test_input_is_name_purpose_code_and_bounded() {
        let long = chunk("big", 1, &"x".repeat(20_000));
        let (service, spy) = service(&[long.clone()]);
        service.embed(&long).await.unwrap();

        let inputs = spy.inputs.lock();
        assert!(inputs[0].starts_with("big\ngeneral logic\nxxx"));
        assert_eq!(inputs[0].chars().count(), 8192);
    }

    #[test]
    fn test_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "carrier-pigeon".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            vectorizer_from_config(&config),
            Err(EmbedError::UnknownProvider(p)) if p == "carrier-pigeon"
        ));
    }
}

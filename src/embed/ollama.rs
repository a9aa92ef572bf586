//! Ollama embedding client
//!
//! Talks to a local (or `OLLAMA_HOST`) Ollama server through
//! `POST /api/embeddings`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Vectorizer;
use crate::config::EmbeddingConfig;
use crate::error::EmbedError;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is running
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client.get(&url).send().await.is_ok()
    }
}

#[async_trait]
impl Vectorizer for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn vectorize(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Backend { status, body });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        if parsed.embedding.is_empty() {
            return Err(EmbedError::EmptyVector);
        }

        debug!("Embedded {} chars into {} dimensions", text.len(), parsed.embedding.len());
        Ok(parsed.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = EmbeddingConfig {
            endpoint: "http://localhost:11434/".to_string(),
            ..EmbeddingConfig::default()
        };
        let client = OllamaEmbedder::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(EmbeddingRequest {
            model: "nomic-embed-text",
            prompt: "fn main() {}",
        })
        .unwrap();
        assert_eq!(body["model"], "nomic-embed-text");
        assert_eq!(body["prompt"], "fn main() {}");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_transport_error() {
        let config = EmbeddingConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..EmbeddingConfig::default()
        };
        let client = OllamaEmbedder::new(&config).unwrap();
        assert!(matches!(client.vectorize("x").await, Err(EmbedError::Transport(_))));
    }
}

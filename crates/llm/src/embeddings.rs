//! Sentence embeddings from Ollama's `/api/embed`
//!
//! Only needed by the similarity confirmation strategy and exit-intent
//! detection; the default prompt strategy never builds an embedder.

use async_trait::async_trait;
use convoform_config::EmbeddingSettings;
use convoform_core::{Embedder, Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct OllamaEmbeddingConfig {
    pub endpoint: String,
    pub model: String,
    /// Expected vector length; answers of another length are rejected
    pub embedding_dim: usize,
}

impl Default for OllamaEmbeddingConfig {
    fn default() -> Self {
        Self::from(&EmbeddingSettings::default())
    }
}

impl From<&EmbeddingSettings> for OllamaEmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            embedding_dim: settings.dimension,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedBody<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedReply {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaEmbedder {
    client: Client,
    config: OllamaEmbeddingConfig,
}

impl OllamaEmbedder {
    pub fn new(config: OllamaEmbeddingConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.config.endpoint.trim_end_matches('/'));
        let body = EmbedBody {
            model: &self.config.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!("{} returned {}: {}", url, status, detail)));
        }

        let reply: EmbedReply = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Malformed embed reply: {}", e)))?;
        self.check(texts.len(), reply.embeddings)
    }

    fn check(&self, expected: usize, vectors: Vec<Vec<f32>>) -> Result<Vec<Vec<f32>>> {
        if vectors.len() != expected {
            return Err(Error::Embedding(format!(
                "Asked for {} embeddings, received {}",
                expected,
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.config.embedding_dim) {
            return Err(Error::Embedding(format!(
                "Model {} produced {} dimensions, configured {}",
                self.config.model,
                bad.len(),
                self.config.embedding_dim
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("Empty embed reply".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline(dim: usize) -> OllamaEmbedder {
        OllamaEmbedder::new(OllamaEmbeddingConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            embedding_dim: dim,
            ..Default::default()
        })
    }

    #[test]
    fn test_defaults_follow_settings() {
        let config = OllamaEmbeddingConfig::default();
        assert_eq!(config.model, "qwen3-embedding:0.6b");
        assert_eq!(config.embedding_dim, 1024);
    }

    #[test]
    fn test_body_sends_batch() {
        let texts = ["yes", "no"];
        let body = EmbedBody { model: "m", input: &texts };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["input"][1], "no");
    }

    #[test]
    fn test_reply_checks() {
        let embedder = offline(3);
        assert!(embedder.check(1, vec![vec![0.1, 0.2, 0.3]]).is_ok());
        assert!(embedder.check(2, vec![vec![0.1, 0.2, 0.3]]).is_err());
        assert!(embedder.check(1, vec![vec![0.1, 0.2]]).is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let embedder = offline(1024);
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(embedder.dimension(), 1024);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let embedder = offline(1024);
        assert!(matches!(embedder.embed("hello").await, Err(Error::Embedding(_))));
    }
}

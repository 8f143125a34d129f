// Recall Engine — Embedding Client
//
// Calls Ollama or OpenAI-compatible embedding APIs to produce the query
// vector for the local fast path. One embedding per search, shared by both
// tier queries.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::Embedder;
use crate::engine::config::EmbeddingConfig;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Embedding client — calls Ollama or an OpenAI-compatible embedding API.
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
    dims: usize,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Self {
        EmbeddingClient {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dims: config.dims,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the embedding vector for a text string.
    /// Tries the Ollama API first, then the OpenAI-compatible endpoint.
    pub async fn embed_text(&self, text: &str) -> EngineResult<Vec<f32>> {
        let ollama_err = match self.embed_ollama(text).await {
            Ok(vec) => return Ok(vec),
            Err(e) => e,
        };
        debug!("[memory] Ollama embed failed ({}) — trying OpenAI format", ollama_err);

        match self.embed_openai(text).await {
            Ok(vec) => Ok(vec),
            Err(openai_err) => Err(EngineError::Embedding(format!(
                "Ollama: {} | OpenAI: {}",
                ollama_err, openai_err
            ))),
        }
    }

    /// Ollama current API: POST /api/embed { model, input } → { embeddings: [[f32...]] }
    /// Falls back to legacy: POST /api/embeddings { model, prompt } → { embedding: [f32...] }
    async fn embed_ollama(&self, text: &str) -> EngineResult<Vec<f32>> {
        let new_url = format!("{}/api/embed", self.base_url);
        let new_result = self
            .client
            .post(&new_url)
            .json(&json!({ "model": self.model, "input": text }))
            .timeout(Duration::from_secs(60))
            .send()
            .await;

        if let Ok(resp) = new_result {
            if resp.status().is_success() {
                if let Ok(v) = resp.json::<Value>().await {
                    // Some Ollama versions return singular "embedding" even on /api/embed
                    let vec = parse_vector(&v["embeddings"][0]).or_else(|| parse_vector(&v["embedding"]));
                    if let Some(vec) = vec {
                        return Ok(vec);
                    }
                }
            } else {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                if status.as_u16() == 404 || body.contains("not found") || body.contains("does not exist") {
                    return Err(EngineError::Embedding(format!(
                        "model '{}' not found — {}",
                        self.model, body
                    )));
                }
                info!("[memory] /api/embed returned {} — trying legacy endpoint", status);
            }
        }

        let legacy_url = format!("{}/api/embeddings", self.base_url);
        let resp = self
            .client
            .post(&legacy_url)
            .json(&json!({ "model": self.model, "prompt": text }))
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| {
                EngineError::Embedding(format!("Ollama not reachable at {}: {}", self.base_url, e))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Embedding(format!("Ollama embed {} — {}", status, body)));
        }

        let v: Value = resp.json().await?;
        parse_vector(&v["embedding"])
            .ok_or_else(|| EngineError::Embedding("no usable 'embedding' array in Ollama response".into()))
    }

    /// OpenAI-compatible format: POST /v1/embeddings { model, input }
    async fn embed_openai(&self, text: &str) -> EngineResult<Vec<f32>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "input": text }))
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Embedding(format!("OpenAI embed {} — {}", status, body)));
        }

        let v: Value = resp.json().await?;
        parse_vector(&v["data"][0]["embedding"])
            .ok_or_else(|| EngineError::Embedding("no usable 'data[0].embedding' array".into()))
    }

    /// Embed a probe string and return the vector dimension.
    pub async fn test_connection(&self) -> EngineResult<usize> {
        let vec = self.embed_text("test connection").await?;
        Ok(vec.len())
    }

    /// Check whether the Ollama server answers at all.
    pub async fn check_reachable(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).timeout(Duration::from_secs(3)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        self.embed_text(text).await
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dims)
    }
}

/// Read a JSON array of numbers as an f32 vector. Empty or missing → None.
fn parse_vector(v: &Value) -> Option<Vec<f32>> {
    let vec: Vec<f32> = v
        .as_array()?
        .iter()
        .filter_map(|x| x.as_f64().map(|f| f as f32))
        .collect();
    if vec.is_empty() {
        None
    } else {
        Some(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector_new_format() {
        let v = json!({ "embeddings": [[0.5, -0.25, 1.0]] });
        assert_eq!(parse_vector(&v["embeddings"][0]), Some(vec![0.5, -0.25, 1.0]));
    }

    #[test]
    fn test_parse_vector_rejects_empty_and_missing() {
        let v = json!({ "embedding": [] });
        assert_eq!(parse_vector(&v["embedding"]), None);
        assert_eq!(parse_vector(&v["nope"]), None);
    }

    #[test]
    fn test_openai_shape() {
        let v = json!({ "data": [{ "embedding": [1, 2, 3] }] });
        assert_eq!(parse_vector(&v["data"][0]["embedding"]), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = EmbeddingClient::new(&EmbeddingConfig {
            base_url: "http://localhost:11434/".into(),
            ..Default::default()
        });
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.dimensions(), Some(768));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_embedding_error() {
        // Port 9 (discard) on localhost is not an HTTP server.
        let client = EmbeddingClient::new(&EmbeddingConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        });
        let err = client.embed_text("hello").await.unwrap_err();
        assert!(matches!(err, EngineError::Embedding(_)), "got {:?}", err);
        assert!(!client.check_reachable().await);
    }
}

use crate::types::{AppError, Result};
use crate::utils::toml_config::EmbeddingsConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Turns texts into embedding vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LLM("Embedding service returned no vector".to_string()))
    }

    fn model_name(&self) -> &str;
}

/// OpenAI `/embeddings` client (`text-embedding-3-small` by default)
pub struct OpenAIEmbedder {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    pub fn new(api_key: String, api_base: String, model: String, batch_size: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            batch_size: batch_size.max(1),
        }
    }

    /// Build from the `[embeddings]` section, reading the key from the
    /// environment
    pub fn from_config(config: &EmbeddingsConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            AppError::Configuration(format!(
                "Environment variable '{}' for embeddings is not set",
                config.api_key_env
            ))
        })?;
        Ok(Self::new(
            api_key,
            config.api_base.clone(),
            config.model.clone(),
            config.batch_size,
        ))
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .http
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: batch,
            })
            .send()
            .await
            .map_err(|e| crate::llm::client::network_error("Embeddings", e))?;

        if !response.status().is_success() {
            return Err(crate::llm::client::status_error("Embeddings", response).await);
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Invalid embeddings response: {}", e)))?;

        if body.data.len() != batch.len() {
            return Err(AppError::LLM(format!(
                "Embeddings response has {} vectors for {} inputs",
                body.data.len(),
                batch.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

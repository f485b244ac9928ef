//! OpenAI-compatible HTTP embedding backend.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::types::VaultError;

/// Configuration for an OpenAI-compatible `/embeddings` endpoint.
///
/// The defaults match the reference deployment: `text-embedding-ada-002`
/// at 1536 dimensions against the public OpenAI API. Any server speaking
/// the same wire format works by pointing `base_url` elsewhere.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL up to and including the API version segment.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Vector dimension the model produces.
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimension: 1536,
        }
    }
}

/// Embedding provider backed by an OpenAI-compatible HTTP API.
#[derive(Clone, Debug)]
pub struct OpenAiEmbeddings {
    client: Client,
    config: EmbeddingConfig,
    api_key: String,
}

impl OpenAiEmbeddings {
    /// Creates a provider with the default [`EmbeddingConfig`].
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(api_key, EmbeddingConfig::default())
    }

    /// Creates a provider with an explicit configuration.
    pub fn with_config(api_key: impl Into<String>, config: EmbeddingConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            api_key: api_key.into(),
        }
    }

    /// Creates a provider from the environment.
    ///
    /// Reads `OPENAI_API_KEY` (required) and `OPENAI_BASE_URL` (optional),
    /// loading a `.env` file first when one is present.
    pub fn from_env() -> Result<Self, VaultError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            VaultError::EmbeddingBackend("OPENAI_API_KEY is not set".to_string())
        })?;
        let mut config = EmbeddingConfig::default();
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(Self::with_config(api_key, config))
    }

    /// The active configuration.
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Deserialize)]
struct EmbeddingObject {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VaultError> {
        super::reject_empty_batch(texts)?;

        let request = EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
        };
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: EmbeddingsResponse = response.json().await.map_err(|err| {
            VaultError::EmbeddingBackend(format!("malformed embeddings response: {err}"))
        })?;

        // The API is free to reorder entries; `index` restores input order.
        let mut data = body.data;
        data.sort_by_key(|item| item.index);
        let vectors: Vec<Vec<f32>> = data.into_iter().map(|item| item.embedding).collect();

        super::ensure_batch_shape(texts.len(), &vectors, self.config.dimension)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

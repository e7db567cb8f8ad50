//! Text embedding backends.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use docqa_shared::{DocQaError, EmbeddingSection, Result, resolve_api_key};

/// Maps texts to fixed-length, unit-length vectors.
///
/// Implementations must be deterministic for a given model: the same input
/// always yields the same vector, or query and document vectors are not
/// comparable.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every returned vector.
    fn dimension(&self) -> usize;

    /// Preferred number of inputs per call. Callers may pass more.
    fn batch_size(&self) -> usize {
        64
    }

    /// Embed `inputs`, returning one L2-normalized vector per input, in order.
    async fn embed(&self, inputs: &[&str], cancel: &CancellationToken) -> Result<Vec<Vec<f32>>>;
}

/// Scale `vector` to unit length in place.
///
/// Fails on vectors whose norm is zero or not finite, which cannot be
/// compared by inner product.
pub fn normalize(vector: &mut [f32]) -> Result<()> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(DocQaError::Embedding(format!(
            "cannot normalize vector with norm {norm}"
        )));
    }
    for v in vector.iter_mut() {
        *v /= norm;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// OpenAI-compatible HTTP embedder
// ---------------------------------------------------------------------------

/// Embeddings client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
        dimension: usize,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        if dimension == 0 || batch_size == 0 {
            return Err(DocQaError::config(
                "embedding dimension and batch size must be at least 1",
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DocQaError::Embedding(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
            batch_size,
        })
    }

    /// Build from the `[embedding]` config section, reading the key from its env var.
    pub fn from_config(section: &EmbeddingSection) -> Result<Self> {
        let api_key = resolve_api_key(&section.api_key_env)?;
        Self::new(
            api_key,
            &section.base_url,
            section.model.clone(),
            section.dimension,
            section.batch_size,
            Duration::from_secs(section.timeout_secs),
        )
    }

    async fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.dimension,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DocQaError::Embedding(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(DocQaError::Embedding(format!(
                "embeddings request failed ({status}): {text}"
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| DocQaError::Embedding(format!("malformed embeddings response: {e}")))?;
        parsed.data.sort_by_key(|row| row.index);

        if parsed.data.len() != inputs.len() {
            return Err(DocQaError::Embedding(format!(
                "received {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        parsed
            .data
            .into_iter()
            .map(|row| {
                let mut vector = row.embedding;
                if vector.len() != self.dimension {
                    return Err(DocQaError::DimensionMismatch {
                        expected: self.dimension,
                        actual: vector.len(),
                    });
                }
                normalize(&mut vector)?;
                Ok(vector)
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[instrument(skip_all, fields(inputs = inputs.len(), model = %self.model))]
    async fn embed(&self, inputs: &[&str], cancel: &CancellationToken) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(inputs.len());

        for batch in inputs.chunks(self.batch_size) {
            let embedded = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DocQaError::Cancelled),
                result = self.request(batch) => result?,
            };
            vectors.extend(embedded);
            debug!(done = vectors.len(), total = inputs.len(), "embedding batch complete");
        }

        Ok(vectors)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

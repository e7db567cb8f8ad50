//! Query embedding, nearest-neighbor search, and relevance filtering.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use docqa_index::DocumentIndex;
use docqa_providers::Embedder;
use docqa_shared::{DocQaError, PageLabel, Result, RetrievalConfig, RetrievalResult};

/// Read-only view over an index and the embedder that built it.
pub struct Retriever<'a> {
    index: &'a DocumentIndex,
    embedder: &'a dyn Embedder,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a DocumentIndex, embedder: &'a dyn Embedder) -> Self {
        Self { index, embedder }
    }

    /// Up to `top_k` passages scoring strictly above `similarity_floor`,
    /// best first.
    ///
    /// An empty index yields an empty list without embedding the query.
    /// Candidates at or below the floor are dropped, never replaced.
    #[instrument(skip_all, fields(top_k = config.top_k, floor = config.similarity_floor))]
    pub async fn retrieve(
        &self,
        query: &str,
        config: &RetrievalConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<RetrievalResult>> {
        config.validate()?;

        if self.index.is_empty() {
            debug!("index is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed(&[query], cancel).await?;
        let [query_vector] = vectors.as_slice() else {
            return Err(DocQaError::Embedding(format!(
                "expected 1 query vector, got {}",
                vectors.len()
            )));
        };

        let k = config.top_k.min(self.index.len());
        let hits = self.index.search(query_vector, k)?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            if hit.score <= config.similarity_floor {
                debug!(chunk = %hit.id, score = hit.score, "below similarity floor");
                continue;
            }
            let Some(chunk) = self.index.chunk(hit.id) else {
                warn!(chunk = %hit.id, "search returned an unknown chunk");
                continue;
            };
            results.push(RetrievalResult {
                content: chunk.content.clone(),
                similarity: hit.score,
                page: PageLabel::Number(chunk.page),
            });
        }

        info!(candidates = k, relevant = results.len(), "retrieval complete");
        Ok(results)
    }
}

use tracing::info;

use docqa_shared::{Chunk, ChunkId, DocQaError, Result};

use crate::vector::{SearchHit, VectorIndex};

/// Chunks of one document and their embeddings, kept position-aligned.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    chunks: Vec<Chunk>,
    vectors: VectorIndex,
}

impl DocumentIndex {
    pub fn new(dimension: usize) -> Result<Self> {
        Ok(Self {
            chunks: Vec::new(),
            vectors: VectorIndex::new(dimension)?,
        })
    }

    /// Add chunks together with their embeddings.
    ///
    /// `embeddings[i]` must belong to `chunks[i]`, and chunk ids must continue
    /// the existing sequence (`len()`, `len() + 1`, ...). Nothing is stored
    /// when validation fails.
    pub fn insert(&mut self, chunks: Vec<Chunk>, embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(DocQaError::validation(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        for (offset, chunk) in chunks.iter().enumerate() {
            let expected = ChunkId(self.chunks.len() + offset);
            if chunk.id != expected {
                return Err(DocQaError::validation(format!(
                    "chunk id {} out of sequence, expected {expected}",
                    chunk.id
                )));
            }
        }

        self.vectors.add_batch(embeddings)?;
        self.chunks.extend(chunks);

        info!(total = self.chunks.len(), "document index updated");
        Ok(())
    }

    /// Nearest chunks to `query`, see [`VectorIndex::search`].
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.vectors.search(query, k)
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(id.0)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.vectors.dimension()
    }
}

//! In-memory vector index over document chunks.
//!
//! [`VectorIndex`] stores unit-length embeddings contiguously and answers
//! k-nearest-neighbor queries by exact inner product (cosine similarity for
//! normalized vectors). [`DocumentIndex`] pairs it with the [`Chunk`] records
//! so a vector's position is always the id of the chunk it was computed from.
//!
//! Neither type synchronizes internally: build once, then share `&` for reads.
//!
//! [`Chunk`]: docqa_shared::Chunk

mod document;
mod vector;

pub use document::DocumentIndex;
pub use vector::{SearchHit, VectorIndex};

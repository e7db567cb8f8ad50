//! Retrieval and answer assembly for DocQA.
//!
//! This crate ties together extraction, chunking, embedding, and the vector
//! index into two end-to-end workflows: [`index_document`] and [`ask`].

pub mod answer;
pub mod pipeline;
pub mod retriever;

#[cfg(test)]
mod testing;

pub use answer::{AnswerAssembler, build_context, build_prompt};
pub use pipeline::{
    IndexedDocument, ProgressReporter, SilentProgress, ask, chunk_document, index_document,
    read_document,
};
pub use retriever::Retriever;

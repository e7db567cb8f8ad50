//! Collaborators of the question-answering pipeline.
//!
//! Each external dependency sits behind a small trait so the pipeline can be
//! exercised with in-process doubles:
//!
//! - [`PageExtractor`] turns a document file into numbered pages.
//! - [`Embedder`] maps texts to unit-length vectors.
//! - [`CompletionModel`] streams an answer for a prompt.
//!
//! The bundled implementations talk to OpenAI-compatible HTTP APIs.

mod completion;
mod embedder;
mod extractor;

pub use completion::{
    CompletionDelta, CompletionModel, CompletionRequest, CompletionStream, OpenAiCompletionClient,
};
pub use embedder::{Embedder, OpenAiEmbedder, normalize};
pub use extractor::{FormFeedExtractor, PageExtractor};

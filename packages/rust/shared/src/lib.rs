//! Shared types, error model, and configuration for DocQA.
//!
//! This crate is the foundation depended on by all other DocQA crates.
//! It provides:
//! - [`DocQaError`]: the unified error type
//! - Domain types ([`Page`], [`Chunk`], [`RetrievalResult`], [`QueryOutcome`])
//! - Configuration ([`AppConfig`], runtime option structs, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkConfig, ChunkingSection, CompletionSection, EmbeddingSection,
    GenerationParams, OverlapStrategy, RetrievalConfig, RetrievalSection, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{DocQaError, Result};
pub use types::{
    AnswerStatus, Chunk, ChunkId, NOT_FOUND_ANSWER, Page, PageLabel, QueryOutcome,
    RetrievalResult,
};

//! Application configuration for DocQA.
//!
//! User config lives at `~/.docqa/docqa.toml`. Missing sections and keys fall
//! back to defaults; API keys are never stored in the file, only the name of
//! the environment variable holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DocQaError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docqa.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docqa";

// ---------------------------------------------------------------------------
// Config structs (matching docqa.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub chunking: ChunkingSection,

    #[serde(default)]
    pub retrieval: RetrievalSection,

    #[serde(default)]
    pub embedding: EmbeddingSection,

    #[serde(default)]
    pub completion: CompletionSection,
}

/// How the overlap seed of a new chunk is derived from the flushed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapStrategy {
    /// Reuse the trailing sentences exactly as they were split, dropping the
    /// oldest ones when the seed would push the chunk past `chunk_size`.
    #[default]
    Sentences,
    /// Re-split the flushed text on `". "` and rejoin the tail with `". "`.
    Lexical,
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSection {
    /// Soft size cap per chunk, in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Trailing sentences carried into the next chunk.
    #[serde(default = "default_overlap_sentences")]
    pub overlap_sentences: usize,

    #[serde(default)]
    pub overlap: OverlapStrategy,
}

impl Default for ChunkingSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap_sentences: default_overlap_sentences(),
            overlap: OverlapStrategy::default(),
        }
    }
}

fn default_chunk_size() -> usize {
    400
}
fn default_overlap_sentences() -> usize {
    2
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSection {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Results must score strictly above this value.
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_floor: default_similarity_floor(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_similarity_floor() -> f32 {
    0.1
}

/// `[embedding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    /// OpenAI-compatible API root (the client appends `/embeddings`).
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector length requested from and expected of the model.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,

    /// Maximum inputs per embeddings request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            api_key_env: default_embedding_key_env(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_dimension() -> usize {
    384
}
fn default_embedding_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_timeout() -> u64 {
    30
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSection {
    /// OpenAI-compatible API root (the client appends `/chat/completions`).
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    #[serde(default = "default_completion_model")]
    pub model: String,

    #[serde(default = "default_completion_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionSection {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            model: default_completion_model(),
            api_key_env: default_completion_key_env(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_completion_base_url() -> String {
    "https://integrate.api.nvidia.com/v1".into()
}
fn default_completion_model() -> String {
    "openai/gpt-oss-20b".into()
}
fn default_completion_key_env() -> String {
    "NVIDIA_API_KEY".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_top_p() -> f32 {
    0.9
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_completion_timeout() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Runtime options (derived from AppConfig)
// ---------------------------------------------------------------------------

/// Runtime chunking options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap_sentences: usize,
    pub overlap: OverlapStrategy,
}

impl ChunkConfig {
    /// Check the options are usable.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DocQaError::validation("chunk_size must be at least 1"));
        }
        Ok(())
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ChunkConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            chunk_size: config.chunking.chunk_size,
            overlap_sentences: config.chunking.overlap_sentences,
            overlap: config.chunking.overlap,
        }
    }
}

/// Runtime retrieval options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub similarity_floor: f32,
}

impl RetrievalConfig {
    /// Check the options are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.similarity_floor.is_finite() {
            return Err(DocQaError::validation(format!(
                "similarity_floor must be a finite number, got {}",
                self.similarity_floor
            )));
        }
        Ok(())
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RetrievalConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            similarity_floor: config.retrieval.similarity_floor,
        }
    }
}

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for GenerationParams {
    fn from(config: &AppConfig) -> Self {
        Self {
            temperature: config.completion.temperature,
            top_p: config.completion.top_p,
            max_tokens: config.completion.max_tokens,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docqa/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DocQaError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docqa/docqa.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocQaError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| DocQaError::config(format!("failed to parse {}: {e}", path.display())))?;

    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocQaError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DocQaError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocQaError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the named environment variable.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(DocQaError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

impl AppConfig {
    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        ChunkConfig::from(self).validate()?;
        RetrievalConfig::from(self).validate()?;

        if self.embedding.dimension == 0 {
            return Err(DocQaError::config("embedding.dimension must be at least 1"));
        }
        if self.embedding.batch_size == 0 {
            return Err(DocQaError::config("embedding.batch_size must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.completion.top_p) {
            return Err(DocQaError::config(format!(
                "completion.top_p must be within [0, 1], got {}",
                self.completion.top_p
            )));
        }

        for (section, base_url) in [
            ("embedding", &self.embedding.base_url),
            ("completion", &self.completion.base_url),
        ] {
            Url::parse(base_url).map_err(|e| {
                DocQaError::config(format!("{section}.base_url '{base_url}' is invalid: {e}"))
            })?;
        }

        Ok(())
    }
}

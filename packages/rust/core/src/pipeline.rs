//! End-to-end pipelines: document → index, and question → answer.

use std::path::Path;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use docqa_chunker::chunk_pages;
use docqa_index::DocumentIndex;
use docqa_providers::{CompletionModel, Embedder, PageExtractor};
use docqa_shared::{
    Chunk, ChunkConfig, DocQaError, GenerationParams, QueryOutcome, Result, RetrievalConfig,
};

use crate::answer::AnswerAssembler;
use crate::retriever::Retriever;

/// Result of [`index_document`].
#[derive(Debug)]
pub struct IndexedDocument {
    /// Searchable index; empty when the document yielded no chunks.
    pub index: DocumentIndex,
    /// Number of pages the extractor returned, blank ones included.
    pub pages_extracted: usize,
    pub chunk_count: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting indexing status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each embedding batch with the running chunk count.
    fn batch_embedded(&self, done: usize, total: usize);
    /// Called when indexing completes.
    fn done(&self, result: &IndexedDocument);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn batch_embedded(&self, _done: usize, _total: usize) {}
    fn done(&self, _result: &IndexedDocument) {}
}

/// Read a document from disk for extraction.
pub fn read_document(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| DocQaError::io(path, e))
}

/// Extract and chunk a document without embedding it.
#[instrument(skip_all, fields(bytes = document.len(), extractor = extractor.name()))]
pub fn chunk_document(
    document: &[u8],
    extractor: &dyn PageExtractor,
    config: &ChunkConfig,
) -> Result<Vec<Chunk>> {
    let pages = extractor.extract(document)?;
    chunk_pages(&pages, config)
}

/// Run the indexing pipeline.
///
/// 1. Extract pages
/// 2. Chunk pages
/// 3. Embed chunks in batches of `embedder.batch_size()`
/// 4. Build the index
///
/// A document that yields no chunks produces an empty index and a
/// `chunk_count` of zero, not an error.
#[instrument(skip_all, fields(bytes = document.len(), extractor = extractor.name()))]
pub async fn index_document(
    document: &[u8],
    extractor: &dyn PageExtractor,
    embedder: &dyn Embedder,
    chunk_config: &ChunkConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<IndexedDocument> {
    let start = Instant::now();

    // --- Phase 1: Extraction ---
    progress.phase("Extracting pages");
    let pages = extractor.extract(document)?;
    let pages_extracted = pages.len();

    // --- Phase 2: Chunking ---
    progress.phase("Chunking");
    let chunks = chunk_pages(&pages, chunk_config)?;

    let mut index = DocumentIndex::new(embedder.dimension())?;

    if chunks.is_empty() {
        warn!(pages = pages_extracted, "document produced no chunks, index is empty");
        let result = IndexedDocument {
            index,
            pages_extracted,
            chunk_count: 0,
            elapsed: start.elapsed(),
        };
        progress.done(&result);
        return Ok(result);
    }

    // --- Phase 3: Embedding ---
    progress.phase("Embedding chunks");
    let total = chunks.len();
    let mut vectors = Vec::with_capacity(total);

    for batch in chunks.chunks(embedder.batch_size().max(1)) {
        let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
        let embedded = embedder.embed(&texts, cancel).await?;
        if embedded.len() != batch.len() {
            return Err(DocQaError::Embedding(format!(
                "received {} embeddings for {} chunks",
                embedded.len(),
                batch.len()
            )));
        }
        vectors.extend(embedded);
        progress.batch_embedded(vectors.len(), total);
    }

    // --- Phase 4: Indexing ---
    progress.phase("Building index");
    index.insert(chunks, &vectors)?;

    let result = IndexedDocument {
        chunk_count: index.len(),
        index,
        pages_extracted,
        elapsed: start.elapsed(),
    };

    info!(
        pages = result.pages_extracted,
        chunk_count = result.chunk_count,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "document indexed"
    );

    progress.done(&result);
    Ok(result)
}

/// Answer `query` from `index`.
///
/// Retrieval failures are returned as errors; completion failures come back
/// as a degraded [`QueryOutcome`].
#[instrument(skip_all, fields(chunks = index.len()))]
pub async fn ask(
    index: &DocumentIndex,
    embedder: &dyn Embedder,
    model: &dyn CompletionModel,
    query: &str,
    retrieval: &RetrievalConfig,
    params: &GenerationParams,
    cancel: &CancellationToken,
) -> Result<QueryOutcome> {
    let start = Instant::now();

    let retrieved = Retriever::new(index, embedder)
        .retrieve(query, retrieval, cancel)
        .await?;
    let outcome = AnswerAssembler::new(model, *params)
        .answer(query, retrieved, cancel)
        .await?;

    info!(
        sources = outcome.sources.len(),
        grounded = outcome.is_grounded(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "query answered"
    );
    Ok(outcome)
}

//! Sentence-aware, overlap-aware chunking of page text.
//!
//! Pages are chunked independently, so a chunk never mixes text from two
//! pages. Within a page, whole sentences are packed into a buffer until the
//! next one would overflow `chunk_size`; the buffer is then flushed and the
//! next chunk starts with an overlap of trailing sentences. A sentence longer
//! than `chunk_size` becomes its own chunk rather than being cut.

mod sentences;

use tracing::{debug, info, instrument};

use docqa_shared::{Chunk, ChunkConfig, ChunkId, OverlapStrategy, Page, Result};

pub use sentences::{normalize_whitespace, split_sentences};

use sentences::char_len;

/// Chunk every page, assigning contiguous ids in page order.
///
/// Pages that are empty after whitespace normalization, or that contain no
/// sentence, contribute nothing. Zero pages yield an empty list.
#[instrument(skip_all, fields(pages = pages.len(), chunk_size = config.chunk_size))]
pub fn chunk_pages(pages: &[Page], config: &ChunkConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    let mut chunks = Vec::new();

    for page in pages {
        let text = normalize_whitespace(&page.text);
        if text.is_empty() {
            debug!(page = page.number, "skipping empty page");
            continue;
        }

        let sentences = split_sentences(&text);
        let contents = match config.overlap {
            OverlapStrategy::Sentences => pack_sentences(&sentences, config),
            OverlapStrategy::Lexical => pack_lexical(&sentences, config),
        };

        debug!(
            page = page.number,
            sentences = sentences.len(),
            chunks = contents.len(),
            "page chunked"
        );

        for content in contents {
            chunks.push(Chunk {
                id: ChunkId(chunks.len()),
                content,
                page: page.number,
            });
        }
    }

    info!(chunk_count = chunks.len(), "chunking complete");
    Ok(chunks)
}

// ---------------------------------------------------------------------------
// Sentence-preserving packing
// ---------------------------------------------------------------------------

/// Pack sentences, carrying whole trailing sentences as overlap.
///
/// The size check uses the length the buffer would have after joining, and
/// the overlap seed is shortened from the front until the incoming sentence
/// fits, so every chunk is within `chunk_size` unless it is a single
/// oversized sentence.
fn pack_sentences(sentences: &[&str], config: &ChunkConfig) -> Vec<String> {
    let mut out = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for &sentence in sentences {
        let sentence_len = char_len(sentence);

        if !buffer.is_empty() && joined_len(&buffer) + 1 + sentence_len > config.chunk_size {
            out.push(buffer.join(" "));

            let keep = buffer.len().min(config.overlap_sentences);
            let mut seed = buffer.split_off(buffer.len() - keep);
            while !seed.is_empty() && joined_len(&seed) + 1 + sentence_len > config.chunk_size {
                seed.remove(0);
            }
            buffer = seed;
        }

        buffer.push(sentence);
    }

    if !buffer.is_empty() {
        out.push(buffer.join(" "));
    }

    out
}

fn joined_len(sentences: &[&str]) -> usize {
    sentences.iter().map(|s| char_len(s)).sum::<usize>() + sentences.len().saturating_sub(1)
}

// ---------------------------------------------------------------------------
// Lexical packing
// ---------------------------------------------------------------------------

/// Pack sentences into a string buffer, deriving the overlap by splitting
/// the flushed text on `". "` and rejoining its tail with `". "`.
///
/// Reproduces the segmentation of earlier indexes built with this rule,
/// including its quirks: the seed can over-fill a chunk, and the rejoin can
/// double a period (`"A.. B."`).
fn pack_lexical(sentences: &[&str], config: &ChunkConfig) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for &sentence in sentences {
        if !current.is_empty() && char_len(&current) + char_len(sentence) > config.chunk_size {
            out.push(current.trim().to_string());

            current = if config.overlap_sentences == 0 {
                sentence.to_string()
            } else {
                let previous: Vec<&str> = current.split(". ").collect();
                let tail = &previous[previous.len().saturating_sub(config.overlap_sentences)..];
                format!("{}. {sentence}", tail.join(". "))
            };
        } else if current.is_empty() {
            current.push_str(sentence);
        } else {
            current.push(' ');
            current.push_str(sentence);
        }
    }

    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }

    out
}

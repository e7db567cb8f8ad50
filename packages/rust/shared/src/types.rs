//! Core domain types for document question answering.

use serde::{Deserialize, Serialize};

/// Answer returned when retrieval finds nothing above the similarity floor.
pub const NOT_FOUND_ANSWER: &str = "No relevant information found in the document.";

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// Raw text of one document page, as produced by a page extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    /// Extracted text, possibly empty.
    pub text: String,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// Position of a chunk in its index (0-based, contiguous).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub usize);

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A retrievable span of page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    /// Non-empty, whitespace-normalized text.
    pub content: String,
    /// Page the chunk was cut from.
    pub page: u32,
}

// ---------------------------------------------------------------------------
// PageLabel
// ---------------------------------------------------------------------------

/// Page attribution of a retrieval result.
///
/// Serialized as the page number, or as the string `"Unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "PageLabelRepr", into = "PageLabelRepr")]
pub enum PageLabel {
    Number(u32),
    /// Provenance was not recorded.
    #[default]
    Unknown,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PageLabelRepr {
    Number(u32),
    Unknown(UnknownPage),
}

/// Reads and writes as the bare string `"Unknown"`.
#[derive(Serialize, Deserialize)]
enum UnknownPage {
    Unknown,
}

impl From<PageLabelRepr> for PageLabel {
    fn from(repr: PageLabelRepr) -> Self {
        match repr {
            PageLabelRepr::Number(n) => Self::Number(n),
            PageLabelRepr::Unknown(UnknownPage::Unknown) => Self::Unknown,
        }
    }
}

impl From<PageLabel> for PageLabelRepr {
    fn from(label: PageLabel) -> Self {
        match label {
            PageLabel::Number(n) => Self::Number(n),
            PageLabel::Unknown => Self::Unknown(UnknownPage::Unknown),
        }
    }
}

impl From<Option<u32>> for PageLabel {
    fn from(page: Option<u32>) -> Self {
        page.map_or(Self::Unknown, Self::Number)
    }
}

impl std::fmt::Display for PageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// Retrieval / answer results
// ---------------------------------------------------------------------------

/// One passage returned by the retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub content: String,
    /// Raw inner-product score, in `[-1, 1]` for unit vectors.
    pub similarity: f32,
    #[serde(default)]
    pub page: PageLabel,
}

/// How a [`QueryOutcome`] was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerStatus {
    /// The completion model answered from the retrieved context.
    Grounded,
    /// Nothing relevant was retrieved; the model was not called.
    NoRelevantContext,
    /// The completion model failed; sources and context are still returned.
    CompletionFailed { message: String },
}

/// Structured answer to a user question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    /// Sources in descending similarity order.
    pub sources: Vec<RetrievalResult>,
    /// The context block that was sent to the model.
    pub context_used: String,
    pub status: AnswerStatus,
}

impl QueryOutcome {
    /// The short-circuit outcome for an empty retrieval.
    pub fn not_found() -> Self {
        Self {
            answer: NOT_FOUND_ANSWER.to_string(),
            sources: Vec::new(),
            context_used: String::new(),
            status: AnswerStatus::NoRelevantContext,
        }
    }

    /// Whether the answer came from a successful completion.
    pub fn is_grounded(&self) -> bool {
        matches!(self.status, AnswerStatus::Grounded)
    }
}

use tracing::{debug, instrument};

use docqa_shared::{DocQaError, Page, Result};

/// Splits a document into pages of raw text.
pub trait PageExtractor: Send + Sync {
    /// Parse `document` and return its pages in order, numbered from 1.
    ///
    /// A page with no text is returned with an empty string rather than
    /// omitted, so page numbers stay aligned with the source document.
    fn extract(&self, document: &[u8]) -> Result<Vec<Page>>;

    /// Short name for tracing.
    fn name(&self) -> &str;
}

/// Reads UTF-8 text where pages are separated by form feeds (`\x0c`).
///
/// This is the layout `pdftotext` produces, so a PDF can be converted once
/// and then indexed through this extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormFeedExtractor;

const PAGE_BREAK: char = '\x0c';

impl PageExtractor for FormFeedExtractor {
    #[instrument(skip_all, fields(bytes = document.len()))]
    fn extract(&self, document: &[u8]) -> Result<Vec<Page>> {
        let text = std::str::from_utf8(document).map_err(|e| {
            DocQaError::extraction(format!(
                "document is not valid UTF-8 (byte {}): {e}",
                e.valid_up_to()
            ))
        })?;

        // A terminating page break closes the last page; it does not open a new one.
        let body = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
        if body.is_empty() {
            return Ok(Vec::new());
        }

        let pages = body
            .split(PAGE_BREAK)
            .enumerate()
            .map(|(i, page)| {
                let number = u32::try_from(i + 1)
                    .map_err(|_| DocQaError::extraction("document has too many pages"))?;
                Ok(Page::new(number, page))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(pages = pages.len(), "document extracted");
        Ok(pages)
    }

    fn name(&self) -> &str {
        "form-feed"
    }
}

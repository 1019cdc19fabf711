//! Per-page text extraction from uploaded document bytes.
//!
//! PDF decoding itself happens upstream (a `pdftotext`-style converter on the upload
//! path); this module owns the seam between the spooled bytes and the ingestion
//! pipeline. The bundled [`FormFeedPages`] extractor consumes the converter output:
//! UTF-8 text with one form feed (`\x0c`) between consecutive pages.

use thiserror::Error;

/// Errors raised while turning document bytes into per-page text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Document bytes were not valid UTF-8 text.
    #[error("Document is not valid UTF-8 text: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    /// Document structure could not be interpreted.
    #[error("Document is unreadable: {0}")]
    Corrupt(String),
}

/// Interface implemented by document readers that yield page-addressable text.
pub trait PageExtractor: Send + Sync {
    /// Split raw document bytes into per-page text, preserving page order.
    ///
    /// A page with no extractable text is returned as an empty string rather than
    /// an error; the pipeline decides what blank pages mean.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// Extractor for pre-converted text documents with form-feed page separators.
pub struct FormFeedPages;

const PAGE_SEPARATOR: char = '\x0c';

impl PageExtractor for FormFeedPages {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let text = std::str::from_utf8(bytes)?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(text
            .split(PAGE_SEPARATOR)
            .map(|page| page.to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_pages_on_form_feed() {
        let bytes = b"page one\x0cpage two\x0c";
        let pages = FormFeedPages.extract_pages(bytes).expect("pages");
        assert_eq!(pages, vec!["page one", "page two", ""]);
    }

    #[test]
    fn single_page_document_yields_one_page() {
        let pages = FormFeedPages.extract_pages(b"only page").expect("pages");
        assert_eq!(pages, vec!["only page"]);
    }

    #[test]
    fn empty_document_yields_no_pages() {
        let pages = FormFeedPages.extract_pages(b"").expect("pages");
        assert!(pages.is_empty());
    }

    #[test]
    fn rejects_non_utf8_bytes() {
        let error = FormFeedPages.extract_pages(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(error, ExtractionError::Encoding(_)));
    }
}

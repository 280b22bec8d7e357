//! Résumé text extraction: direct text layer first, OCR when there is none.

pub mod cache;
pub mod ocr;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use lopdf::Document;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use cache::ExtractionCache;
use ocr::OcrEngine;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("external tool not found: {0}")]
    ToolNotFound(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction task failed: {0}")]
    Task(String),
}

/// How the text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Direct,
    Ocr,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub method: ExtractionMethod,
    /// 0 when the page tree could not be read.
    pub page_count: u32,
}

pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
    cache: ExtractionCache,
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, cache_capacity: usize) -> Self {
        Self {
            ocr,
            cache: ExtractionCache::new(cache_capacity),
        }
    }

    /// Extracts text from PDF bytes. Blocking; see `extract_blocking` for async callers.
    pub fn extract(&self, document: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let digest = ExtractionCache::digest(document);
        if let Some(hit) = self.cache.get(&digest) {
            debug!("Extraction cache hit for {}", &digest[..12]);
            return Ok(hit);
        }

        let extracted = self.extract_uncached(document)?;
        self.cache.insert(digest, extracted.clone());
        debug!("Extraction cache holds {} document(s)", self.cache.len());
        Ok(extracted)
    }

    /// Runs `extract` on the blocking pool.
    pub async fn extract_blocking(
        self: Arc<Self>,
        document: Bytes,
    ) -> Result<ExtractedText, ExtractionError> {
        tokio::task::spawn_blocking(move || self.extract(&document))
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))?
    }

    fn extract_uncached(&self, document: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let (text, page_count, load_error) = match text_by_pages(document) {
            Ok((text, page_count)) => (text, page_count, None),
            Err(e) => {
                debug!("lopdf could not load document ({e}), trying pdf-extract");
                (String::new(), 0, Some(e))
            }
        };
        if !text.trim().is_empty() {
            return Ok(direct(text, page_count));
        }

        // lopdf may load a file yet decode nothing (e.g. CID fonts); give pdf-extract a turn.
        match whole_document_text(document) {
            Some(text) if !text.trim().is_empty() => return Ok(direct(text, page_count)),
            Some(_) => {}
            None => {
                if let Some(e) = load_error {
                    return Err(ExtractionError::InvalidPdf(e.to_string()));
                }
            }
        }

        warn!("No extractable text layer ({page_count} page(s)), falling back to OCR");
        let text = self.ocr.recognize_pdf(document)?;
        debug!("OCR extraction: {} chars", text.len());

        Ok(ExtractedText {
            text,
            method: ExtractionMethod::Ocr,
            page_count,
        })
    }
}

fn direct(text: String, page_count: u32) -> ExtractedText {
    debug!(
        "Direct extraction: {} chars from {page_count} page(s)",
        text.len()
    );
    ExtractedText {
        text,
        method: ExtractionMethod::Direct,
        page_count,
    }
}

/// Concatenates the text layer of every page in page order.
/// A page whose text cannot be decoded contributes nothing.
fn text_by_pages(document: &[u8]) -> Result<(String, u32), lopdf::Error> {
    let doc = Document::load_mem(document)?;
    let pages = doc.get_pages();

    let mut text = String::new();
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => debug!("Page {page_number}: no extractable text ({e})"),
        }
    }

    Ok((text, pages.len() as u32))
}

/// Second direct path for files lopdf refuses. pdf-extract can panic on malformed input.
fn whole_document_text(document: &[u8]) -> Option<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(document))) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            debug!("pdf-extract failed: {e}");
            None
        }
        Err(_) => {
            warn!("pdf-extract panicked on malformed document");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_document;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeOcr {
        calls: AtomicU32,
        result: Result<String, String>,
    }

    impl FakeOcr {
        fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                result: Ok(text.to_string()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                result: Err(message.to_string()),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OcrEngine for FakeOcr {
        fn recognize_pdf(&self, _document: &[u8]) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(ExtractionError::OcrFailed)
        }
    }

    fn pdf_with(text: &str) -> Vec<u8> {
        render_document(text).unwrap()
    }

    #[test]
    fn test_text_layer_is_used_without_ocr() {
        let ocr = FakeOcr::returning("should not be used");
        let extractor = TextExtractor::new(ocr.clone(), 0);
        let pdf = pdf_with("Jane Doe\nRust Engineer\nKubernetes, Go");

        let extracted = extractor.extract(&pdf).unwrap();

        assert_eq!(extracted.method, ExtractionMethod::Direct);
        assert_eq!(extracted.page_count, 1);
        assert!(extracted.text.contains("Jane Doe"));
        assert!(extracted.text.contains("Kubernetes, Go"));
        assert_eq!(ocr.calls(), 0);
    }

    #[test]
    fn test_pages_concatenate_in_order() {
        let text: String = (1..=80).map(|i| format!("Line {i:03}\n")).collect();
        let pdf = pdf_with(&text);
        let extractor = TextExtractor::new(FakeOcr::returning(""), 0);

        let extracted = extractor.extract(&pdf).unwrap();

        assert!(extracted.page_count >= 2);
        let first = extracted.text.find("Line 001").unwrap();
        let middle = extracted.text.find("Line 040").unwrap();
        let last = extracted.text.find("Line 080").unwrap();
        assert!(first < middle && middle < last);
    }

    #[test]
    fn test_textless_pdf_falls_back_to_ocr() {
        let ocr = FakeOcr::returning("Scanned Resume Text");
        let extractor = TextExtractor::new(ocr.clone(), 0);
        let blank = pdf_with("");

        let extracted = extractor.extract(&blank).unwrap();

        assert_eq!(extracted.method, ExtractionMethod::Ocr);
        assert_eq!(extracted.text, "Scanned Resume Text");
        assert_eq!(ocr.calls(), 1);
    }

    #[test]
    fn test_ocr_failure_is_typed_error() {
        let extractor = TextExtractor::new(FakeOcr::failing("engine crashed"), 0);
        let err = extractor.extract(&pdf_with("")).unwrap_err();
        assert!(matches!(err, ExtractionError::OcrFailed(ref m) if m == "engine crashed"));
    }

    #[test]
    fn test_unreadable_bytes_are_invalid_pdf() {
        let ocr = FakeOcr::returning("should not be used");
        let extractor = TextExtractor::new(ocr.clone(), 0);
        let err = extractor.extract(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidPdf(_)));
        assert_eq!(ocr.calls(), 0);
    }

    #[test]
    fn test_whole_document_text_reads_text_layer() {
        let text = whole_document_text(&pdf_with("Jane Doe\nRust Engineer")).unwrap();
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("Rust Engineer"));
    }

    #[test]
    fn test_whole_document_text_rejects_garbage() {
        assert!(whole_document_text(b"definitely not a pdf").is_none());
    }

    #[test]
    fn test_identical_bytes_are_memoized() {
        let ocr = FakeOcr::returning("Scanned");
        let extractor = TextExtractor::new(ocr.clone(), 4);
        let blank = pdf_with("");

        extractor.extract(&blank).unwrap();
        let second = extractor.extract(&blank).unwrap();

        assert_eq!(second.text, "Scanned");
        assert_eq!(ocr.calls(), 1);
    }

    #[test]
    fn test_failures_are_not_memoized() {
        let ocr = FakeOcr::failing("boom");
        let extractor = TextExtractor::new(ocr.clone(), 4);
        let blank = pdf_with("");

        assert!(extractor.extract(&blank).is_err());
        assert!(extractor.extract(&blank).is_err());
        assert_eq!(ocr.calls(), 2);
    }

    #[tokio::test]
    async fn test_extract_blocking_runs_off_runtime() {
        let extractor = Arc::new(TextExtractor::new(FakeOcr::returning(""), 0));
        let pdf = Bytes::from(pdf_with("Async Resume"));
        let extracted = extractor.extract_blocking(pdf).await.unwrap();
        assert!(extracted.text.contains("Async Resume"));
    }
}

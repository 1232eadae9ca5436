//! Text Extractor: turns an uploaded document into a bounded plain-text string.
//!
//! Dispatch is by filename suffix. A structurally broken PDF or Word file never
//! aborts the request: the uploaded bytes are decoded as lossy UTF-8 instead and the
//! fallback is reported back to the caller.

pub mod docx;
pub mod pdf;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

/// Text used in place of the résumé when the caller opts into degraded output.
pub const PLACEHOLDER_TEXT: &str = "[no readable text could be extracted from the document]";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF parse failed: {0}")]
    Pdf(String),

    #[error("Word document parse failed: {0}")]
    Docx(String),

    #[error("Extracted text too short ({chars} characters, need {min})")]
    InsufficientText { chars: usize, min: usize },
}

/// An uploaded file. Dropped as soon as its text has been extracted.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    WordProcessor,
    PlainText,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.trim().to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            DocumentKind::Pdf
        } else if lower.ends_with(".docx") || lower.ends_with(".doc") {
            DocumentKind::WordProcessor
        } else {
            DocumentKind::PlainText
        }
    }
}

/// Size-capped résumé text. Never empty: either real content of at least the
/// configured minimum length, or the documented placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    pub fn placeholder() -> Self {
        Self(PLACEHOLDER_TEXT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_placeholder(&self) -> bool {
        self.0 == PLACEHOLDER_TEXT
    }

    /// First `max_chars` characters, for embedding in a prompt.
    pub fn head(&self, max_chars: usize) -> &str {
        match self.0.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

/// Result of a successful extraction. `fallback` carries the parse error when the
/// structured parser failed and the raw bytes were decoded instead.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: ExtractedText,
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct TextExtractor {
    max_chars: usize,
    min_chars: usize,
}

impl TextExtractor {
    pub fn new(max_chars: usize, min_chars: usize) -> Self {
        Self {
            max_chars,
            min_chars,
        }
    }

    pub fn extract(&self, document: &Document) -> Result<Extraction, ExtractionError> {
        let kind = DocumentKind::from_file_name(&document.file_name);
        let data = document.bytes.as_ref();

        let parsed = match kind {
            DocumentKind::Pdf => pdf::extract_pdf_text(data),
            DocumentKind::WordProcessor => docx::extract_docx_text(data),
            DocumentKind::PlainText => Ok(decode_lossy(data)),
        };

        let (raw, fallback) = match parsed {
            Ok(text) => (text, None),
            Err(err) => {
                warn!(
                    "Structured extraction failed for '{}', decoding raw bytes: {err}",
                    document.file_name
                );
                (decode_lossy(data), Some(err.to_string()))
            }
        };

        debug!(
            "Extracted {} characters from '{}' ({:?})",
            raw.chars().count(),
            document.file_name,
            kind
        );

        Ok(Extraction {
            text: self.bound(&raw)?,
            fallback,
        })
    }

    /// Applies the same bounds to text supplied directly by a caller.
    pub fn from_raw_text(&self, text: &str) -> Result<ExtractedText, ExtractionError> {
        self.bound(text)
    }

    fn bound(&self, raw: &str) -> Result<ExtractedText, ExtractionError> {
        let trimmed = raw.trim();
        let chars = trimmed.chars().count();
        if chars < self.min_chars {
            return Err(ExtractionError::InsufficientText {
                chars,
                min: self.min_chars,
            });
        }
        // Hard character cutoff, not word-aware.
        Ok(ExtractedText(trimmed.chars().take(self.max_chars).collect()))
    }
}

fn decode_lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, bytes: &[u8]) -> Document {
        Document {
            file_name: name.to_string(),
            bytes: Bytes::copy_from_slice(bytes),
        }
    }

    #[test]
    fn test_kind_dispatch_by_suffix() {
        assert_eq!(DocumentKind::from_file_name("CV.PDF"), DocumentKind::Pdf);
        assert_eq!(
            DocumentKind::from_file_name("resume.docx"),
            DocumentKind::WordProcessor
        );
        assert_eq!(
            DocumentKind::from_file_name("resume.doc"),
            DocumentKind::WordProcessor
        );
        assert_eq!(
            DocumentKind::from_file_name("resume.txt"),
            DocumentKind::PlainText
        );
        assert_eq!(DocumentKind::from_file_name(""), DocumentKind::PlainText);
    }

    #[test]
    fn test_plain_text_document() {
        let extractor = TextExtractor::new(6000, 20);
        let out = extractor
            .extract(&doc("resume.txt", b"Jane Doe\nSkills: Python, SQL, Excel"))
            .unwrap();
        assert_eq!(out.text.as_str(), "Jane Doe\nSkills: Python, SQL, Excel");
        assert!(out.fallback.is_none());
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_rejected() {
        let extractor = TextExtractor::new(6000, 5);
        let mut bytes = b"Data analyst with SQL ".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        let out = extractor.extract(&doc("cv", &bytes)).unwrap();
        assert!(out.text.as_str().starts_with("Data analyst with SQL"));
        assert!(out.text.as_str().contains('\u{FFFD}'));
    }

    #[test]
    fn test_truncates_at_character_limit() {
        let extractor = TextExtractor::new(10, 1);
        let out = extractor
            .extract(&doc("a.txt", "ééééééééééééééé".as_bytes()))
            .unwrap();
        assert_eq!(out.text.char_count(), 10);
    }

    #[test]
    fn test_short_text_is_insufficient() {
        let extractor = TextExtractor::new(6000, 20);
        let err = extractor.extract(&doc("a.txt", b"  too short  ")).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::InsufficientText { chars: 9, min: 20 }
        ));
    }

    #[test]
    fn test_empty_document_is_insufficient() {
        let extractor = TextExtractor::new(6000, 20);
        assert!(matches!(
            extractor.extract(&doc("a.pdf", b"")),
            Err(ExtractionError::InsufficientText { .. })
        ));
    }

    #[test]
    fn test_corrupt_pdf_falls_back_to_raw_decode() {
        let extractor = TextExtractor::new(6000, 20);
        let out = extractor
            .extract(&doc("cv.pdf", b"not really a pdf, but Python and SQL are here"))
            .unwrap();
        assert!(out.fallback.is_some());
        assert!(out.text.as_str().contains("Python and SQL"));
    }

    #[test]
    fn test_legacy_doc_falls_back_to_raw_decode() {
        let extractor = TextExtractor::new(6000, 20);
        let out = extractor
            .extract(&doc("cv.doc", b"binary-ish word file mentioning Tableau"))
            .unwrap();
        assert!(out.fallback.is_some());
        assert!(out.text.as_str().contains("Tableau"));
    }

    #[test]
    fn test_head_respects_char_boundaries() {
        let text = TextExtractor::new(100, 1).from_raw_text("₹₹₹abc").unwrap();
        assert_eq!(text.head(2), "₹₹");
        assert_eq!(text.head(50), "₹₹₹abc");
    }

    #[test]
    fn test_placeholder_is_recognised() {
        assert!(ExtractedText::placeholder().is_placeholder());
    }
}

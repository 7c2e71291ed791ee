//! Source document text extraction.
//!
//! Turns a resume file into a single text blob: plain-text files are read
//! lossily, PDFs go through `pdf-extract`. The result then passes through the
//! cleanup pipeline so the field extractor only ever sees `\n` line endings.

mod cleanup;

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use cvanalyzer_shared::{CvAnalyzerError, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Supported source document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
}

impl DocumentKind {
    /// Classify a file by its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for reading a document from disk.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Reject files larger than this many bytes.
    pub max_file_bytes: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Text pulled out of one document.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Cleaned text, `\n` line endings.
    pub text: String,
    pub kind: DocumentKind,
    /// SHA-256 (hex) of the raw file bytes.
    pub content_hash: String,
    /// Size of the raw file in bytes.
    pub byte_len: usize,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Whether `path` has an extension this crate can read.
pub fn is_supported(path: &Path) -> bool {
    DocumentKind::from_path(path).is_some()
}

/// Read `path` and extract its text.
///
/// Fails for unsupported extensions, oversized files, unreadable files, and
/// PDFs that `pdf-extract` cannot decode. Invalid UTF-8 in plain text is
/// replaced, never fatal.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn extract_text(path: &Path, opts: &ExtractOptions) -> Result<ExtractedText> {
    let kind = DocumentKind::from_path(path).ok_or_else(|| {
        CvAnalyzerError::validation(format!(
            "unsupported document type: {}",
            path.display()
        ))
    })?;

    let metadata = std::fs::metadata(path).map_err(|e| CvAnalyzerError::io(path, e))?;
    if metadata.len() > opts.max_file_bytes {
        return Err(CvAnalyzerError::validation(format!(
            "{} is {} bytes, above the {} byte limit",
            path.display(),
            metadata.len(),
            opts.max_file_bytes
        )));
    }

    let bytes = std::fs::read(path).map_err(|e| CvAnalyzerError::io(path, e))?;
    let content_hash = compute_hash(&bytes);
    let text = extract_from_bytes(&bytes, kind)?;

    debug!(%kind, bytes = bytes.len(), chars = text.chars().count(), "document extracted");

    Ok(ExtractedText {
        text,
        kind,
        content_hash,
        byte_len: bytes.len(),
    })
}

/// Extract and clean text from an in-memory document.
pub fn extract_from_bytes(bytes: &[u8], kind: DocumentKind) -> Result<String> {
    let raw = match kind {
        DocumentKind::PlainText => String::from_utf8_lossy(bytes).into_owned(),
        DocumentKind::Pdf => extract_pdf(bytes)?,
    };

    Ok(cleanup::run_pipeline(&raw))
}

/// `pdf-extract` panics on some malformed inputs; turn that into an error.
fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let outcome =
        std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    match outcome {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(CvAnalyzerError::extraction(format!("pdf extraction failed: {e}"))),
        Err(_) => {
            warn!("pdf-extract panicked while decoding document");
            Err(CvAnalyzerError::extraction(
                "pdf extraction failed: malformed document",
            ))
        }
    }
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cva_text_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(name);
        std::fs::write(&path, contents).expect("write temp file");
        path
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a/CV.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(
            DocumentKind::from_path(Path::new("jane.txt")),
            Some(DocumentKind::PlainText)
        );
        assert_eq!(DocumentKind::from_path(Path::new("jane.docx")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
        assert!(is_supported(Path::new("notes.md")));
    }

    #[test]
    fn test_compute_hash() {
        let hash = compute_hash(b"hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn plain_text_is_cleaned() {
        let path = temp_file("jane.txt", b"Jane Doe\r\njane.doe@example.com\r\n");
        let extracted = extract_text(&path, &ExtractOptions::default()).expect("extract");
        assert_eq!(extracted.kind, DocumentKind::PlainText);
        assert_eq!(extracted.text, "Jane Doe\njane.doe@example.com\n");
        assert_eq!(extracted.byte_len, 32);
        assert_eq!(extracted.content_hash.len(), 64);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let text = extract_from_bytes(b"Jane \xFF Doe", DocumentKind::PlainText).expect("lossy");
        assert!(text.starts_with("Jane "));
        assert!(text.ends_with(" Doe"));
    }

    #[test]
    fn oversized_file_rejected() {
        let path = temp_file("big.txt", &[b'a'; 64]);
        let opts = ExtractOptions { max_file_bytes: 16 };
        let err = extract_text(&path, &opts).unwrap_err();
        assert!(matches!(err, CvAnalyzerError::Validation { .. }));
    }

    #[test]
    fn unsupported_type_rejected() {
        let path = temp_file("resume.docx", b"PK");
        let err = extract_text(&path, &ExtractOptions::default()).unwrap_err();
        assert!(err.to_string().contains("unsupported document type"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = extract_text(Path::new("/no/such/dir/cv.txt"), &ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, CvAnalyzerError::Io { .. }));
    }

    #[test]
    fn garbage_pdf_is_extraction_error() {
        let err = extract_from_bytes(b"this is not a pdf", DocumentKind::Pdf).unwrap_err();
        assert!(matches!(err, CvAnalyzerError::Extraction { .. }));
    }
}

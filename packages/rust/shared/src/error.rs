//! Error types for cvanalyzer.
//!
//! Library crates use [`CvAnalyzerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! The extraction and scoring core never returns this type: both are total
//! over their inputs. Errors only come from the I/O collaborators.

use std::path::PathBuf;

/// Top-level error type for all cvanalyzer I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum CvAnalyzerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Text could not be pulled out of a source document.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input rejected before processing (unsupported file type, oversized document, ...).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CvAnalyzerError>;

impl CvAnalyzerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CvAnalyzerError::config("lexicon file missing");
        assert_eq!(err.to_string(), "config error: lexicon file missing");

        let err = CvAnalyzerError::validation("unsupported document type 'docx'");
        assert!(err.to_string().contains("docx"));

        let err = CvAnalyzerError::Storage("database is locked".into());
        assert_eq!(err.to_string(), "storage error: database is locked");
    }

    #[test]
    fn io_error_carries_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = CvAnalyzerError::io("/tmp/resumes/a.pdf", source);
        let msg = err.to_string();
        assert!(msg.contains("a.pdf"));
        assert!(msg.contains("gone"));
    }
}

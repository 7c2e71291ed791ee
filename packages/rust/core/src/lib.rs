//! Core domain logic for cvanalyzer.
//!
//! The field extractor and scoring engine are pure and synchronous; the
//! pipeline and analysis modules wire them to the text and storage crates
//! (e.g., `ingest_directory`, `rank_candidates`).

pub mod analysis;
pub mod extractor;
pub mod pipeline;
pub mod scoring;

pub use analysis::{AnalysisReport, build_report, rank_candidates};
pub use extractor::{FieldExtractor, extract};
pub use pipeline::{
    DocumentOutcome, DocumentReport, IngestReport, IngestStats, ProgressReporter, SilentProgress,
    extract_document, ingest_directory,
};
pub use scoring::{normalize_required, rank_by_overlap, rank_match_counts};

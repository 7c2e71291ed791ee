//! Shared types, error model, and configuration for cvanalyzer.
//!
//! This crate is the foundation depended on by all other cvanalyzer crates.
//! It provides:
//! - [`CvAnalyzerError`] — the unified error type
//! - The record model ([`ParsedResume`], [`CandidateSkillProfile`], [`CandidateScore`])
//! - The [`SkillLexicon`]
//! - Configuration ([`AppConfig`], [`IngestConfig`], config loading)

pub mod config;
pub mod error;
pub mod lexicon;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, IngestConfig, IngestSettings, LexiconConfig, RankStrategy, RankingConfig,
    ReportConfig, StorageConfig, config_dir, config_file_path, expand_home, init_config,
    load_config, load_config_from,
};
pub use error::{CvAnalyzerError, Result};
pub use lexicon::{SkillLexicon, normalize_skill};
pub use types::{
    CandidateId, CandidateMatchCount, CandidateScore, CandidateSkillProfile, NewEducation,
    NewExperience, ParsedResume, SkillUsage,
};

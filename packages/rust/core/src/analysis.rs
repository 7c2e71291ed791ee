//! Read-side workflows over a populated store: ranking and the summary report.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, instrument};

use cvanalyzer_shared::{CandidateScore, RankStrategy, Result, SkillUsage};
use cvanalyzer_storage::Storage;

use crate::scoring::{normalize_required, rank_by_overlap, rank_match_counts};

/// Aggregate view of everything ingested so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub candidate_count: u64,
    pub average_experience_years: f64,
    pub top_skills: Vec<SkillUsage>,
}

/// Rank stored candidates against `required`.
///
/// Both strategies produce the same ordering; `Pushdown` lets storage count
/// matches and so omits `matched_skills`.
#[instrument(skip_all, fields(strategy = %strategy, limit = limit))]
pub async fn rank_candidates(
    storage: &Storage,
    required: &BTreeSet<String>,
    limit: usize,
    strategy: RankStrategy,
) -> Result<Vec<CandidateScore>> {
    let required = normalize_required(required);
    if required.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let scores = match strategy {
        RankStrategy::InMemory => {
            let profiles = storage.list_skill_profiles().await?;
            debug!(candidates = profiles.len(), "profiles loaded");
            rank_by_overlap(&profiles, &required, limit)
        }
        RankStrategy::Pushdown => {
            let counts = storage.skill_match_counts(&required).await?;
            debug!(candidates = counts.len(), "match counts loaded");
            rank_match_counts(&counts, required.len(), limit)
        }
    };

    Ok(scores)
}

/// Candidate count, average experience, and the `top_n` most common skills.
#[instrument(skip(storage))]
pub async fn build_report(storage: &Storage, top_n: usize) -> Result<AnalysisReport> {
    Ok(AnalysisReport {
        candidate_count: storage.candidate_count().await?,
        average_experience_years: storage.average_experience().await?,
        top_skills: storage.top_skills(top_n).await?,
    })
}

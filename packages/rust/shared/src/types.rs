//! Record model shared by the field extractor, the scoring engine, and storage.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CandidateId
// ---------------------------------------------------------------------------

/// Storage-assigned candidate identifier (the `candidates.id` row id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub i64);

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CandidateId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<i64> for CandidateId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// ParsedResume
// ---------------------------------------------------------------------------

/// Structured record produced by the field extractor for one document.
///
/// Every field has a default, so a record extracted from empty input is
/// simply `ParsedResume::default()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    /// First short header line that does not look like a document title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Lexicon terms found as whole words (lowercase).
    #[serde(default)]
    pub skills: BTreeSet<String>,
    /// Largest "<n> years" figure stated anywhere in the text.
    #[serde(default)]
    pub total_experience_years: f64,
    /// Whitespace-normalized prefix of the text, at most 400 characters.
    #[serde(default)]
    pub summary: String,
    /// Raw degree matches in document order; duplicates are kept.
    #[serde(default)]
    pub education_entries: Vec<String>,
}

// ---------------------------------------------------------------------------
// Scoring inputs / outputs
// ---------------------------------------------------------------------------

/// A persisted candidate's skill set, as reconstructed by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSkillProfile {
    pub id: CandidateId,
    pub name: String,
    pub skills: BTreeSet<String>,
}

/// Match count computed by storage rather than in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMatchCount {
    pub id: CandidateId,
    pub name: String,
    pub match_count: usize,
}

/// One ranked candidate. Recomputed on every ranking request; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub id: CandidateId,
    pub name: String,
    /// Number of required skills present in the candidate's profile.
    pub match_count: usize,
    /// Required skills the candidate has. `None` when ranked from precomputed counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_skills: Option<BTreeSet<String>>,
}

// ---------------------------------------------------------------------------
// Reporting / persistence rows
// ---------------------------------------------------------------------------

/// How many candidates list a given skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillUsage {
    pub skill: String,
    pub candidate_count: u64,
}

/// An experience row appended to a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExperience {
    pub title: Option<String>,
    pub company: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub description: Option<String>,
}

/// An education row appended to a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEducation {
    pub degree: String,
    pub institution: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_id_roundtrip() {
        let id = CandidateId(42);
        let parsed: CandidateId = id.to_string().parse().expect("parse CandidateId");
        assert_eq!(id, parsed);
        assert!(" 7 ".parse::<CandidateId>().is_ok());
        assert!("seven".parse::<CandidateId>().is_err());
    }

    #[test]
    fn default_resume_is_empty() {
        let resume = ParsedResume::default();
        assert!(resume.full_name.is_none());
        assert!(resume.email.is_none());
        assert!(resume.phone.is_none());
        assert!(resume.skills.is_empty());
        assert_eq!(resume.total_experience_years, 0.0);
        assert!(resume.summary.is_empty());
        assert!(resume.education_entries.is_empty());
    }

    #[test]
    fn resume_json_omits_absent_contact_fields() {
        let resume = ParsedResume {
            full_name: Some("Jane Doe".into()),
            skills: ["java".to_string()].into_iter().collect(),
            total_experience_years: 5.0,
            ..ParsedResume::default()
        };
        let json = serde_json::to_value(&resume).expect("serialize");
        assert_eq!(json["full_name"], "Jane Doe");
        assert!(json.get("email").is_none());
        assert_eq!(json["skills"][0], "java");

        let back: ParsedResume = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, resume);
    }

    #[test]
    fn score_without_detail_skips_matched_skills() {
        let score = CandidateScore {
            id: CandidateId(3),
            name: "C".into(),
            match_count: 0,
            matched_skills: None,
        };
        let json = serde_json::to_string(&score).expect("serialize");
        assert!(!json.contains("matched_skills"));
        assert!(json.contains("\"id\":3"));
    }
}

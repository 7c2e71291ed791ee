//! Heuristic field extraction: raw resume text → [`ParsedResume`].
//!
//! Each field has its own independent heuristic. None of them can fail: a
//! heuristic that finds nothing leaves its field at the default.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use cvanalyzer_shared::{ParsedResume, SkillLexicon};

/// Characters kept in [`ParsedResume::summary`].
pub const SUMMARY_MAX_CHARS: usize = 400;

const NAME_MAX_WORDS: usize = 4;
const NAME_BLOCKLIST: &[&str] = &["resume", "curriculum", "cv"];

// Digit, word and whitespace classes below are ASCII-only: a non-breaking
// space does not split words and Arabic-Indic digits are not digits.

static LINE_ENDINGS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n").unwrap());

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)(\+?\d{2,3}[\s-]?)?(\(?\d{2,4}\)?[\s-]?)?\d{3,4}[\s-]?\d{3,4}").unwrap()
});

static EXPERIENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i-u)(\d+(?:\.\d+)?)\s*\+?\s*(years|yrs)\b").unwrap()
});

static EDUCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i-u)(Bachelor|B\.Sc|BSc|Master|M\.Sc|MSc|PhD|Doctor)\b[\w\s,.-]{0,80}").unwrap()
});

/// A lexicon compiled into whole-word skill matchers.
///
/// Build once, share behind an `Arc` across extraction tasks.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    skill_patterns: Vec<(String, Regex)>,
}

impl FieldExtractor {
    pub fn new(lexicon: &SkillLexicon) -> Self {
        let skill_patterns = lexicon
            .iter()
            .filter_map(|term| {
                let pattern = format!(r"\b{}\b", regex::escape(term));
                match Regex::new(&pattern) {
                    Ok(re) => Some((term.to_string(), re)),
                    Err(e) => {
                        warn!(term, error = %e, "skill term could not be compiled, ignoring");
                        None
                    }
                }
            })
            .collect();

        Self { skill_patterns }
    }

    /// Number of skill terms this extractor looks for.
    pub fn skill_count(&self) -> usize {
        self.skill_patterns.len()
    }

    /// Extract a record from optional text. `None` yields the default record.
    pub fn extract(&self, text: Option<&str>) -> ParsedResume {
        match text {
            Some(text) => self.extract_text(text),
            None => ParsedResume::default(),
        }
    }

    /// Extract a record from `text`.
    pub fn extract_text(&self, text: &str) -> ParsedResume {
        let normalized = LINE_ENDINGS_RE.replace_all(text, "\n");

        let record = ParsedResume {
            full_name: extract_name(&normalized),
            email: extract_email(text),
            phone: extract_phone(text),
            skills: self.extract_skills(text),
            total_experience_years: extract_experience_years(text),
            summary: build_summary(&normalized),
            education_entries: extract_education(text),
        };

        debug!(
            name = record.full_name.is_some(),
            email = record.email.is_some(),
            phone = record.phone.is_some(),
            skills = record.skills.len(),
            years = record.total_experience_years,
            education = record.education_entries.len(),
            "fields extracted"
        );

        record
    }

    fn extract_skills(&self, text: &str) -> BTreeSet<String> {
        let lowered = text.to_lowercase();
        self.skill_patterns
            .iter()
            .filter(|(_, re)| re.is_match(&lowered))
            .map(|(term, _)| term.clone())
            .collect()
    }
}

/// One-shot extraction; compiles `lexicon` on every call.
///
/// Prefer building a [`FieldExtractor`] when extracting many documents.
pub fn extract(text: Option<&str>, lexicon: &SkillLexicon) -> ParsedResume {
    FieldExtractor::new(lexicon).extract(text)
}

// ---------------------------------------------------------------------------
// Per-field heuristics
// ---------------------------------------------------------------------------

/// First short line that does not look like a document title.
fn extract_name(normalized: &str) -> Option<String> {
    normalized
        .split('\n')
        .map(trim_ascii)
        .find(|line| is_name_candidate(line))
        .map(str::to_string)
}

fn is_name_candidate(line: &str) -> bool {
    let len = line.chars().count();
    if len <= 2 || len >= 120 {
        return false;
    }
    if line.split_ascii_whitespace().count() > NAME_MAX_WORDS {
        return false;
    }
    let lower = line.to_lowercase();
    !NAME_BLOCKLIST.iter().any(|word| lower.contains(word))
}

/// Strip ASCII spaces and control characters from both ends.
fn trim_ascii(line: &str) -> &str {
    line.trim_matches(|c: char| c <= ' ')
}

fn extract_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

// Loose on purpose: dates and ID numbers can match too.
fn extract_phone(text: &str) -> Option<String> {
    PHONE_RE.find(text).map(|m| m.as_str().trim().to_string())
}

/// Largest "<n> years" / "<n>+ yrs" figure, or 0.0.
fn extract_experience_years(text: &str) -> f64 {
    EXPERIENCE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .fold(0.0, f64::max)
}

fn extract_education(text: &str) -> Vec<String> {
    EDUCATION_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

fn build_summary(normalized: &str) -> String {
    let collapsed = normalized
        .split_ascii_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.chars().take(SUMMARY_MAX_CHARS).collect()
}

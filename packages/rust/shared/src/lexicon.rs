//! The skill lexicon: a fixed, case-normalized vocabulary of recognized skill terms.
//!
//! Built once by the caller and handed (read-only) to every extraction call.

use std::collections::BTreeSet;

/// Immutable set of lowercase, trimmed skill terms.
///
/// Construction never fails: raw terms are normalized, duplicates collapse,
/// and terms that are empty after trimming are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillLexicon {
    terms: BTreeSet<String>,
}

impl SkillLexicon {
    /// Build a lexicon from raw skill strings.
    pub fn new<I, S>(raw_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = raw_terms
            .into_iter()
            .map(|t| normalize_skill(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(&normalize_skill(term))
    }

    /// Iterate the normalized terms in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkillLexicon {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Canonical form of a skill term: trimmed and lowercased.
pub fn normalize_skill(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Terms from a lexicon file: one per line, `#` comments and blank lines ignored.
pub fn terms_from_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

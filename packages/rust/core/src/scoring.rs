//! Skill-overlap ranking.
//!
//! Both entry points share the same ordering rules: match count descending,
//! ties in input order, truncated to `limit`, and an empty requirement (or a
//! zero limit) ranks nobody.

use std::collections::BTreeSet;

use cvanalyzer_shared::{
    CandidateMatchCount, CandidateScore, CandidateSkillProfile, normalize_skill,
};

/// Trimmed, lowercased, de-duplicated requirement set.
pub fn normalize_required<I, S>(required: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    required
        .into_iter()
        .map(|s| normalize_skill(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Rank full skill profiles by how many `required` skills each one has.
pub fn rank_by_overlap(
    profiles: &[CandidateSkillProfile],
    required: &BTreeSet<String>,
    limit: usize,
) -> Vec<CandidateScore> {
    let required = normalize_required(required);
    if required.is_empty() || limit == 0 {
        return Vec::new();
    }

    let scores = profiles
        .iter()
        .map(|profile| {
            let matched: BTreeSet<String> = profile
                .skills
                .iter()
                .map(|s| normalize_skill(s))
                .filter(|s| required.contains(s))
                .collect();

            CandidateScore {
                id: profile.id,
                name: profile.name.clone(),
                match_count: matched.len(),
                matched_skills: Some(matched),
            }
        })
        .collect();

    order_and_truncate(scores, limit)
}

/// Rank counts that were computed elsewhere (e.g. in a storage query).
///
/// Counts above `required_len` are clamped; `matched_skills` stays `None`.
pub fn rank_match_counts(
    counts: &[CandidateMatchCount],
    required_len: usize,
    limit: usize,
) -> Vec<CandidateScore> {
    if required_len == 0 || limit == 0 {
        return Vec::new();
    }

    let scores = counts
        .iter()
        .map(|c| CandidateScore {
            id: c.id,
            name: c.name.clone(),
            match_count: c.match_count.min(required_len),
            matched_skills: None,
        })
        .collect();

    order_and_truncate(scores, limit)
}

fn order_and_truncate(mut scores: Vec<CandidateScore>, limit: usize) -> Vec<CandidateScore> {
    // sort_by is stable: equal counts keep input order.
    scores.sort_by(|a, b| b.match_count.cmp(&a.match_count));
    scores.truncate(limit);
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvanalyzer_shared::CandidateId;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn profile(id: i64, name: &str, skills: &[&str]) -> CandidateSkillProfile {
        CandidateSkillProfile {
            id: CandidateId(id),
            name: name.into(),
            skills: set(skills),
        }
    }

    fn count(id: i64, name: &str, match_count: usize) -> CandidateMatchCount {
        CandidateMatchCount {
            id: CandidateId(id),
            name: name.into(),
            match_count,
        }
    }

    fn ids(scores: &[CandidateScore]) -> Vec<i64> {
        scores.iter().map(|s| s.id.0).collect()
    }

    #[test]
    fn ties_keep_input_order() {
        let profiles = vec![
            profile(1, "A", &["java", "sql"]),
            profile(2, "B", &["java", "sql"]),
            profile(3, "C", &["java"]),
        ];
        let ranked = rank_by_overlap(&profiles, &set(&["java", "sql"]), 10);
        assert_eq!(ids(&ranked), vec![1, 2, 3]);
        assert_eq!(ranked[0].match_count, 2);
        assert_eq!(ranked[2].match_count, 1);
    }

    #[test]
    fn empty_requirement_or_zero_limit_is_empty() {
        let profiles = vec![profile(1, "A", &["java"])];
        assert!(rank_by_overlap(&profiles, &BTreeSet::new(), 5).is_empty());
        assert!(rank_by_overlap(&profiles, &set(&["java"]), 0).is_empty());
        assert!(rank_by_overlap(&profiles, &set(&["  "]), 5).is_empty());
    }

    #[test]
    fn limit_larger_than_input_returns_all() {
        let profiles = vec![profile(1, "A", &["java"]), profile(2, "B", &[])];
        let ranked = rank_by_overlap(&profiles, &set(&["java"]), 50);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[1].match_count, 0);
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let profiles = vec![profile(1, "A", &["Java", "SQL "])];
        let ranked = rank_by_overlap(&profiles, &set(&["java", " sql", "docker"]), 1);
        assert_eq!(ranked[0].match_count, 2);
        assert_eq!(ranked[0].matched_skills, Some(set(&["java", "sql"])));
    }

    #[test]
    fn match_count_never_exceeds_requirement() {
        let profiles = vec![profile(1, "A", &["java", "sql", "python", "docker"])];
        let ranked = rank_by_overlap(&profiles, &set(&["java"]), 1);
        assert_eq!(ranked[0].match_count, 1);
    }

    #[test]
    fn precomputed_counts_rank_the_same_way() {
        let counts = vec![count(1, "A", 2), count(2, "B", 3), count(3, "C", 0)];
        let ranked = rank_match_counts(&counts, 3, 2);
        assert_eq!(ids(&ranked), vec![2, 1]);
        assert!(ranked.iter().all(|s| s.matched_skills.is_none()));
    }

    #[test]
    fn precomputed_counts_are_clamped() {
        let ranked = rank_match_counts(&[count(1, "A", 9)], 2, 1);
        assert_eq!(ranked[0].match_count, 2);
        assert!(rank_match_counts(&[count(1, "A", 1)], 0, 1).is_empty());
        assert!(rank_match_counts(&[count(1, "A", 1)], 1, 0).is_empty());
    }

    #[test]
    fn normalize_required_dedups() {
        let required = normalize_required(["Java", "java ", "", "SQL"]);
        assert_eq!(required, set(&["java", "sql"]));
    }
}

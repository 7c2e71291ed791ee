use std::collections::BTreeSet;
use std::sync::Arc;

use cvanalyzer_core::{
    FieldExtractor, SilentProgress, build_report, ingest_directory, rank_by_overlap,
    rank_candidates, rank_match_counts,
};
use cvanalyzer_shared::{
    CandidateId, CandidateSkillProfile, IngestConfig, RankStrategy, SkillLexicon,
};
use cvanalyzer_storage::Storage;

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

fn summary(scores: &[cvanalyzer_shared::CandidateScore]) -> Vec<(i64, String, usize)> {
    scores
        .iter()
        .map(|s| (s.id.0, s.name.clone(), s.match_count))
        .collect()
}

#[test]
fn ranking_example() {
    let profiles = vec![
        profile(1, "A", &["java", "sql"]),
        profile(2, "B", &["java", "spring", "sql"]),
        profile(3, "C", &["python"]),
    ];
    let ranked = rank_by_overlap(&profiles, &set(&["java", "spring", "sql"]), 2);
    assert_eq!(
        summary(&ranked),
        vec![(2, "B".to_string(), 3), (1, "A".to_string(), 2)]
    );
}

#[test]
fn ranking_is_stable_for_ties() {
    let profiles = vec![
        profile(1, "A", &["java", "sql"]),
        profile(2, "B", &["sql", "java"]),
        profile(3, "C", &["sql"]),
    ];
    let ranked = rank_by_overlap(&profiles, &set(&["java", "sql"]), 3);
    let ids: Vec<i64> = ranked.iter().map(|s| s.id.0).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn empty_required_or_zero_limit() {
    let profiles = vec![profile(1, "A", &["java"])];
    assert!(rank_by_overlap(&profiles, &BTreeSet::new(), 10).is_empty());
    assert!(rank_by_overlap(&profiles, &set(&["java"]), 0).is_empty());
    assert!(rank_match_counts(&[], 3, 10).is_empty());
}

async fn populated_storage() -> Storage {
    let dir = std::env::temp_dir().join(format!("cva_it_resumes_{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    let fixtures = [
        ("1_ann.txt", "Ann Lee\nJava and SQL, 4 years"),
        ("2_bob.txt", "Bob Stone\nJava, Spring and SQL. 8 years"),
        ("3_cat.txt", "Cat Wu\nPython, 2 years"),
        ("4_dan.txt", "Dan Roe\nSQL and Java"),
    ];
    for (name, text) in fixtures {
        std::fs::write(dir.join(name), text).unwrap();
    }

    let db = std::env::temp_dir().join(format!("cva_it_{}.db", uuid::Uuid::now_v7()));
    let storage = Storage::open(&db).await.unwrap();
    let extractor = Arc::new(FieldExtractor::new(&SkillLexicon::new([
        "java", "spring", "sql", "python",
    ])));
    let config = IngestConfig {
        resumes_dir: dir,
        concurrency: 3,
        max_file_bytes: 1024 * 1024,
        force: false,
    };
    let report = ingest_directory(&config, extractor, &storage, &SilentProgress)
        .await
        .unwrap();
    assert_eq!(report.stats().inserted, 4);
    storage
}

#[tokio::test]
async fn pushdown_matches_in_memory() {
    let storage = populated_storage().await;
    let required = set(&["java", "spring", "sql"]);

    for limit in [0, 1, 2, 3, 10] {
        let in_memory = rank_candidates(&storage, &required, limit, RankStrategy::InMemory)
            .await
            .unwrap();
        let pushdown = rank_candidates(&storage, &required, limit, RankStrategy::Pushdown)
            .await
            .unwrap();
        assert_eq!(summary(&in_memory), summary(&pushdown), "limit {limit}");
    }

    let top = rank_candidates(&storage, &required, 3, RankStrategy::InMemory)
        .await
        .unwrap();
    let names: Vec<&str> = top.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Bob Stone", "Ann Lee", "Dan Roe"]);
    assert_eq!(top[0].matched_skills, Some(required.clone()));
}

#[tokio::test]
async fn report_over_ingested_candidates() {
    let storage = populated_storage().await;
    let report = build_report(&storage, 2).await.unwrap();

    assert_eq!(report.candidate_count, 4);
    assert!((report.average_experience_years - 3.5).abs() < 1e-9);
    assert_eq!(report.top_skills.len(), 2);
    assert_eq!(report.top_skills[0].skill, "java");
    assert_eq!(report.top_skills[0].candidate_count, 3);
    assert_eq!(report.top_skills[1].skill, "sql");
}

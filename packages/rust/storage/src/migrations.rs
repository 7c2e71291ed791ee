//! SQL migration definitions for the cvanalyzer database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: candidates, skills, candidate_skills, experience, education",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS candidates (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name              TEXT NOT NULL,
    email                  TEXT,
    phone                  TEXT,
    total_experience_years REAL NOT NULL DEFAULT 0,
    summary                TEXT,
    created_at             TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS skills (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS candidate_skills (
    candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
    skill_id     INTEGER NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
    proficiency  INTEGER,
    PRIMARY KEY (candidate_id, skill_id)
);

CREATE INDEX IF NOT EXISTS idx_candidate_skills_skill ON candidate_skills(skill_id);

CREATE TABLE IF NOT EXISTS experience (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
    title        TEXT,
    company      TEXT,
    start_year   INTEGER,
    end_year     INTEGER,
    description  TEXT
);

CREATE INDEX IF NOT EXISTS idx_experience_candidate ON experience(candidate_id);

CREATE TABLE IF NOT EXISTS education (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
    degree       TEXT NOT NULL,
    institution  TEXT,
    start_year   INTEGER,
    end_year     INTEGER
);

CREATE INDEX IF NOT EXISTS idx_education_candidate ON education(candidate_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Ingest bookkeeping: documents by content hash, ingest run history",
            sql: r#"
CREATE TABLE IF NOT EXISTS documents (
    content_hash TEXT PRIMARY KEY,
    path         TEXT NOT NULL,
    candidate_id INTEGER NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
    ingested_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_candidate ON documents(candidate_id);

CREATE TABLE IF NOT EXISTS ingest_runs (
    id          TEXT PRIMARY KEY,
    source_dir  TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_ascending_and_unique() {
        let versions: Vec<u32> = all_migrations().iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[test]
    fn each_migration_records_its_version() {
        for m in all_migrations() {
            let marker = format!("INSERT INTO schema_migrations (version) VALUES ({});", m.version);
            assert!(m.sql.contains(&marker), "migration v{} missing marker", m.version);
        }
    }
}

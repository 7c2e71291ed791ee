//! libSQL storage layer for candidates and their skills.
//!
//! The [`Storage`] struct wraps a local libSQL database holding candidates,
//! the skill vocabulary seen so far, candidate↔skill associations, experience
//! and education rows, plus ingest bookkeeping (document hashes, run history).
//!
//! **Access rules:**
//! - `ingest`: read-write via [`Storage::open`]
//! - `rank` / `report`: read-only via [`Storage::open_readonly`]

mod migrations;

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use cvanalyzer_shared::{
    CandidateId, CandidateMatchCount, CandidateSkillProfile, CvAnalyzerError, NewEducation,
    NewExperience, Result, SkillUsage, normalize_skill,
};
use libsql::{Connection, Database, params};
use uuid::Uuid;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// Candidate fields written on insert.
#[derive(Debug, Clone)]
pub struct NewCandidate<'a> {
    pub full_name: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub total_experience_years: f64,
    pub summary: &'a str,
}

/// A candidate row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_experience_years: f64,
    pub summary: Option<String>,
}

/// A previously ingested document, looked up by content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub content_hash: String,
    pub path: String,
    pub candidate_id: CandidateId,
}

fn db_err(e: impl std::fmt::Display) -> CvAnalyzerError {
    CvAnalyzerError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CvAnalyzerError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CvAnalyzerError::Storage(format!(
                "no database at {} (run `cvanalyzer ingest` first)",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CvAnalyzerError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CvAnalyzerError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Start a transaction; everything until [`commit`](Self::commit) or
    /// [`rollback`](Self::rollback) lands atomically.
    pub async fn begin(&self) -> Result<()> {
        self.check_writable()?;
        self.conn.execute_batch("BEGIN").await.map_err(db_err)?;
        Ok(())
    }

    pub async fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT").await.map_err(db_err)?;
        Ok(())
    }

    pub async fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK").await.map_err(db_err)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Candidate operations
    // -----------------------------------------------------------------------

    /// Insert a candidate and return its generated id.
    pub async fn insert_candidate(&self, candidate: &NewCandidate<'_>) -> Result<CandidateId> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let mut rows = self
            .conn
            .query(
                "INSERT INTO candidates (full_name, email, phone, total_experience_years, summary, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id",
                params![
                    candidate.full_name,
                    candidate.email,
                    candidate.phone,
                    candidate.total_experience_years,
                    candidate.summary,
                    now.as_str(),
                ],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(CandidateId(row.get::<i64>(0).map_err(db_err)?)),
            None => Err(CvAnalyzerError::Storage(
                "candidate insert returned no id".into(),
            )),
        }
    }

    /// Get a candidate by id.
    pub async fn get_candidate(&self, id: CandidateId) -> Result<Option<CandidateRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, full_name, email, phone, total_experience_years, summary
                 FROM candidates WHERE id = ?1",
                params![id.0],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(CandidateRecord {
                id: CandidateId(row.get::<i64>(0).map_err(db_err)?),
                full_name: row.get::<String>(1).map_err(db_err)?,
                email: row.get::<String>(2).ok(),
                phone: row.get::<String>(3).ok(),
                total_experience_years: row.get::<f64>(4).unwrap_or(0.0),
                summary: row.get::<String>(5).ok(),
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Number of stored candidates.
    pub async fn candidate_count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM candidates", params![])
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(db_err)?.max(0) as u64),
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // Skill operations
    // -----------------------------------------------------------------------

    /// Look up a skill by (normalized) name, inserting it if unseen.
    pub async fn find_or_create_skill(&self, name: &str) -> Result<i64> {
        let name = normalize_skill(name);

        let mut rows = self
            .conn
            .query("SELECT id FROM skills WHERE name = ?1", params![name.as_str()])
            .await
            .map_err(db_err)?;
        if let Some(row) = rows.next().await.map_err(db_err)? {
            return row.get::<i64>(0).map_err(db_err);
        }
        drop(rows);

        self.check_writable()?;
        let mut rows = self
            .conn
            .query(
                "INSERT INTO skills (name) VALUES (?1) RETURNING id",
                params![name.as_str()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => row.get::<i64>(0).map_err(db_err),
            None => Err(CvAnalyzerError::Storage(format!(
                "skill insert for '{name}' returned no id"
            ))),
        }
    }

    /// Associate a skill with a candidate. Repeated associations are ignored.
    pub async fn add_candidate_skill(
        &self,
        candidate_id: CandidateId,
        skill_id: i64,
        proficiency: Option<i64>,
    ) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO candidate_skills (candidate_id, skill_id, proficiency)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (candidate_id, skill_id) DO NOTHING",
                params![candidate_id.0, skill_id, proficiency],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Every candidate with its skill set, in id order.
    ///
    /// Candidates without any skill still appear, with an empty set.
    pub async fn list_skill_profiles(&self) -> Result<Vec<CandidateSkillProfile>> {
        let mut rows = self
            .conn
            .query(
                "SELECT c.id, c.full_name, s.name
                 FROM candidates c
                 LEFT JOIN candidate_skills cs ON c.id = cs.candidate_id
                 LEFT JOIN skills s ON cs.skill_id = s.id
                 ORDER BY c.id",
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut profiles: Vec<CandidateSkillProfile> = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let id = CandidateId(row.get::<i64>(0).map_err(db_err)?);
            let skill = row.get::<String>(2).ok().map(|s| normalize_skill(&s));

            match profiles.last_mut() {
                Some(last) if last.id == id => {
                    last.skills.extend(skill);
                }
                _ => {
                    let name = row.get::<String>(1).map_err(db_err)?;
                    profiles.push(CandidateSkillProfile {
                        id,
                        name,
                        skills: skill.into_iter().collect(),
                    });
                }
            }
        }
        Ok(profiles)
    }

    /// Per-candidate count of `required` skills, computed in SQL.
    ///
    /// One entry per candidate in id order, zero-match candidates included.
    pub async fn skill_match_counts(
        &self,
        required: &BTreeSet<String>,
    ) -> Result<Vec<CandidateMatchCount>> {
        let required: BTreeSet<String> = required
            .iter()
            .map(|s| normalize_skill(s))
            .filter(|s| !s.is_empty())
            .collect();
        let required_json = serde_json::to_string(&required).map_err(db_err)?;

        let mut rows = self
            .conn
            .query(
                "SELECT c.id, c.full_name, COUNT(s.id)
                 FROM candidates c
                 LEFT JOIN candidate_skills cs ON cs.candidate_id = c.id
                 LEFT JOIN skills s ON s.id = cs.skill_id
                      AND s.name IN (SELECT value FROM json_each(?1))
                 GROUP BY c.id, c.full_name
                 ORDER BY c.id",
                params![required_json.as_str()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(CandidateMatchCount {
                id: CandidateId(row.get::<i64>(0).map_err(db_err)?),
                name: row.get::<String>(1).map_err(db_err)?,
                match_count: row.get::<i64>(2).map_err(db_err)?.max(0) as usize,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Experience / education
    // -----------------------------------------------------------------------

    /// Append an experience row to a candidate.
    pub async fn insert_experience(
        &self,
        candidate_id: CandidateId,
        experience: &NewExperience,
    ) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO experience (candidate_id, title, company, start_year, end_year, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    candidate_id.0,
                    experience.title.as_deref(),
                    experience.company.as_deref(),
                    experience.start_year.map(i64::from),
                    experience.end_year.map(i64::from),
                    experience.description.as_deref(),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Experience rows of a candidate, in insertion order.
    pub async fn list_experience(&self, candidate_id: CandidateId) -> Result<Vec<NewExperience>> {
        let mut rows = self
            .conn
            .query(
                "SELECT title, company, start_year, end_year, description
                 FROM experience WHERE candidate_id = ?1 ORDER BY id",
                params![candidate_id.0],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(NewExperience {
                title: row.get::<String>(0).ok(),
                company: row.get::<String>(1).ok(),
                start_year: row.get::<i64>(2).ok().map(|y| y as i32),
                end_year: row.get::<i64>(3).ok().map(|y| y as i32),
                description: row.get::<String>(4).ok(),
            });
        }
        Ok(results)
    }

    /// Append an education row to a candidate.
    pub async fn insert_education(
        &self,
        candidate_id: CandidateId,
        education: &NewEducation,
    ) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO education (candidate_id, degree, institution, start_year, end_year)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    candidate_id.0,
                    education.degree.as_str(),
                    education.institution.as_deref(),
                    education.start_year.map(i64::from),
                    education.end_year.map(i64::from),
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Education rows of a candidate, in insertion order.
    pub async fn list_education(&self, candidate_id: CandidateId) -> Result<Vec<NewEducation>> {
        let mut rows = self
            .conn
            .query(
                "SELECT degree, institution, start_year, end_year
                 FROM education WHERE candidate_id = ?1 ORDER BY id",
                params![candidate_id.0],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(NewEducation {
                degree: row.get::<String>(0).map_err(db_err)?,
                institution: row.get::<String>(1).ok(),
                start_year: row.get::<i64>(2).ok().map(|y| y as i32),
                end_year: row.get::<i64>(3).ok().map(|y| y as i32),
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    /// The `n` most common skills across candidates, most used first.
    pub async fn top_skills(&self, n: usize) -> Result<Vec<SkillUsage>> {
        let mut rows = self
            .conn
            .query(
                "SELECT s.name, COUNT(*) AS cnt
                 FROM candidate_skills cs
                 JOIN skills s ON cs.skill_id = s.id
                 GROUP BY s.name
                 ORDER BY cnt DESC, s.name ASC
                 LIMIT ?1",
                params![n as i64],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(SkillUsage {
                skill: row.get::<String>(0).map_err(db_err)?,
                candidate_count: row.get::<i64>(1).map_err(db_err)?.max(0) as u64,
            });
        }
        Ok(results)
    }

    /// Mean `total_experience_years` over all candidates; 0.0 when there are none.
    pub async fn average_experience(&self) -> Result<f64> {
        let mut rows = self
            .conn
            .query(
                "SELECT AVG(total_experience_years) FROM candidates",
                params![],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(row.get::<f64>(0).unwrap_or(0.0)),
            None => Ok(0.0),
        }
    }

    // -----------------------------------------------------------------------
    // Ingest bookkeeping
    // -----------------------------------------------------------------------

    /// Find a previously ingested document by content hash.
    pub async fn find_document(&self, content_hash: &str) -> Result<Option<DocumentRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT content_hash, path, candidate_id FROM documents WHERE content_hash = ?1",
                params![content_hash],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(DocumentRecord {
                content_hash: row.get::<String>(0).map_err(db_err)?,
                path: row.get::<String>(1).map_err(db_err)?,
                candidate_id: CandidateId(row.get::<i64>(2).map_err(db_err)?),
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Remember that `content_hash` produced `candidate_id` (upserts on re-ingest).
    pub async fn record_document(
        &self,
        content_hash: &str,
        path: &str,
        candidate_id: CandidateId,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO documents (content_hash, path, candidate_id, ingested_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(content_hash) DO UPDATE SET
                   path = excluded.path,
                   candidate_id = excluded.candidate_id,
                   ingested_at = excluded.ingested_at",
                params![content_hash, path, candidate_id.0, now.as_str()],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Insert a new ingest run. Returns the generated run ID.
    pub async fn insert_ingest_run(&self, source_dir: &str) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO ingest_runs (id, source_dir, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), source_dir, now.as_str()],
            )
            .await
            .map_err(db_err)?;
        Ok(id)
    }

    /// Close an ingest run with its statistics.
    pub async fn finish_ingest_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE ingest_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Stats JSON of a finished run, `None` while the run is open or unknown.
    pub async fn ingest_run_stats(&self, run_id: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT stats_json FROM ingest_runs WHERE id = ?1",
                params![run_id],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(row.get::<String>(0).ok()),
            None => Ok(None),
        }
    }
}

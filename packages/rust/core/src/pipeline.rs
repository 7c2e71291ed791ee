//! End-to-end `ingest` pipeline: directory → extract → field extraction → storage.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use cvanalyzer_shared::{
    CandidateId, CvAnalyzerError, IngestConfig, NewEducation, ParsedResume, Result,
};
use cvanalyzer_storage::{NewCandidate, Storage};
use cvanalyzer_text::{ExtractOptions, ExtractedText};

use crate::extractor::FieldExtractor;

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Inserted { candidate_id: CandidateId },
    Skipped { reason: String },
    Failed { error: String },
}

/// Per-document entry of an [`IngestReport`].
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

/// Result of the `ingest` pipeline.
#[derive(Debug)]
pub struct IngestReport {
    /// Row id in `ingest_runs`.
    pub run_id: String,
    /// One entry per regular file in the directory, in name order.
    pub documents: Vec<DocumentReport>,
    pub elapsed: Duration,
}

/// Counters persisted as the run's `stats_json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub total: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
}

impl IngestReport {
    pub fn stats(&self) -> IngestStats {
        let mut stats = IngestStats {
            total: self.documents.len(),
            inserted: 0,
            skipped: 0,
            failed: 0,
            elapsed_ms: self.elapsed.as_millis() as u64,
        };
        for doc in &self.documents {
            match doc.outcome {
                DocumentOutcome::Inserted { .. } => stats.inserted += 1,
                DocumentOutcome::Skipped { .. } => stats.skipped += 1,
                DocumentOutcome::Failed { .. } => stats.failed += 1,
            }
        }
        stats
    }

    /// Ids of the candidates created by this run, in document order.
    pub fn inserted_ids(&self) -> Vec<CandidateId> {
        self.documents
            .iter()
            .filter_map(|d| match d.outcome {
                DocumentOutcome::Inserted { candidate_id } => Some(candidate_id),
                _ => None,
            })
            .collect()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per document after it has been stored, skipped, or failed.
    fn document_done(&self, path: &Path, outcome: &DocumentOutcome, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &IngestReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_done(&self, _path: &Path, _outcome: &DocumentOutcome, _current: usize, _total: usize) {}
    fn done(&self, _report: &IngestReport) {}
}

/// Read one document and run field extraction on it.
pub fn extract_document(
    path: &Path,
    extractor: &FieldExtractor,
    opts: &ExtractOptions,
) -> Result<(ExtractedText, ParsedResume)> {
    let extracted = cvanalyzer_text::extract_text(path, opts)?;
    let record = extractor.extract_text(&extracted.text);
    Ok((extracted, record))
}

/// Run the full `ingest` pipeline.
///
/// 1. List regular files in the directory, sorted by name
/// 2. Extract supported documents concurrently (bounded by `concurrency`),
///    reading at most a small window ahead of the persist step
/// 3. Persist each record in its own transaction, in name order
/// 4. Record the run and its stats
///
/// Per-document problems never abort the run; they end up in the report.
#[instrument(skip_all, fields(dir = %config.resumes_dir.display()))]
pub async fn ingest_directory(
    config: &IngestConfig,
    extractor: Arc<FieldExtractor>,
    storage: &Storage,
    progress: &dyn ProgressReporter,
) -> Result<IngestReport> {
    let start = Instant::now();

    // --- Phase 1: Scan ---
    progress.phase("Scanning directory");
    let files = list_documents(&config.resumes_dir)?;
    let total = files.len();
    info!(files = total, "starting ingest");

    let run_id = storage
        .insert_ingest_run(&config.resumes_dir.display().to_string())
        .await?;

    // --- Phase 2/3: Extract (concurrent) and persist (serial, name order) ---
    progress.phase("Extracting and storing documents");
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let opts = ExtractOptions {
        max_file_bytes: config.max_file_bytes,
    };
    let window = read_ahead_window(config.concurrency);

    let mut queued = files.into_iter();
    let mut pending: VecDeque<(PathBuf, Option<ExtractionHandle>)> = VecDeque::with_capacity(window);
    let mut documents = Vec::with_capacity(total);

    loop {
        // Finished-but-unstored results never exceed `window`.
        while pending.len() < window {
            let Some(path) = queued.next() else { break };
            let handle = cvanalyzer_text::is_supported(&path)
                .then(|| spawn_extraction(&path, &semaphore, &extractor, &opts));
            pending.push_back((path, handle));
        }

        let Some((path, handle)) = pending.pop_front() else {
            break;
        };

        let outcome = match handle {
            None => DocumentOutcome::Skipped {
                reason: "unsupported document type".into(),
            },
            Some(handle) => {
                let extracted = match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(CvAnalyzerError::extraction(format!(
                        "extraction task failed: {e}"
                    ))),
                };
                match extracted {
                    Ok((text, record)) => store_document(storage, &path, &text, &record, config.force).await,
                    Err(e) => DocumentOutcome::Failed {
                        error: e.to_string(),
                    },
                }
            }
        };

        match &outcome {
            DocumentOutcome::Inserted { candidate_id } => {
                debug!(path = %path.display(), %candidate_id, "candidate stored");
            }
            DocumentOutcome::Skipped { reason } => {
                debug!(path = %path.display(), reason = %reason, "document skipped");
            }
            DocumentOutcome::Failed { error } => {
                warn!(path = %path.display(), error = %error, "document failed, continuing");
            }
        }

        progress.document_done(&path, &outcome, documents.len() + 1, total);
        documents.push(DocumentReport { path, outcome });
    }

    // --- Phase 4: Record run ---
    let report = IngestReport {
        run_id,
        documents,
        elapsed: start.elapsed(),
    };
    let stats = report.stats();
    let stats_json = serde_json::to_string(&stats)
        .map_err(|e| CvAnalyzerError::Storage(format!("stats serialization: {e}")))?;
    storage.finish_ingest_run(&report.run_id, &stats_json).await?;

    progress.done(&report);

    info!(
        run_id = %report.run_id,
        inserted = stats.inserted,
        skipped = stats.skipped,
        failed = stats.failed,
        elapsed_ms = stats.elapsed_ms,
        "ingest pipeline complete"
    );

    Ok(report)
}

type ExtractionHandle = JoinHandle<Result<(ExtractedText, ParsedResume)>>;

/// Documents extracted ahead of the persist loop: twice the worker count.
fn read_ahead_window(concurrency: usize) -> usize {
    concurrency.max(1) * 2
}

fn spawn_extraction(
    path: &Path,
    semaphore: &Arc<Semaphore>,
    extractor: &Arc<FieldExtractor>,
    opts: &ExtractOptions,
) -> ExtractionHandle {
    let sem = semaphore.clone();
    let extractor = extractor.clone();
    let opts = opts.clone();
    let path = path.to_path_buf();
    tokio::spawn(async move {
        let _permit = sem
            .acquire_owned()
            .await
            .map_err(|e| CvAnalyzerError::extraction(format!("worker pool closed: {e}")))?;
        tokio::task::spawn_blocking(move || extract_document(&path, &extractor, &opts))
            .await
            .map_err(|e| CvAnalyzerError::extraction(format!("extraction task failed: {e}")))?
    })
}

/// Regular files directly inside `dir`, sorted by file name.
fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CvAnalyzerError::validation(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| CvAnalyzerError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CvAnalyzerError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Persist one extracted document unless its content was seen before.
async fn store_document(
    storage: &Storage,
    path: &Path,
    extracted: &ExtractedText,
    record: &ParsedResume,
    force: bool,
) -> DocumentOutcome {
    if !force {
        match storage.find_document(&extracted.content_hash).await {
            Ok(Some(previous)) => {
                return DocumentOutcome::Skipped {
                    reason: format!(
                        "unchanged since previous ingest (candidate {})",
                        previous.candidate_id
                    ),
                };
            }
            Ok(None) => {}
            Err(e) => {
                return DocumentOutcome::Failed {
                    error: e.to_string(),
                };
            }
        }
    }

    if let Err(e) = storage.begin().await {
        return DocumentOutcome::Failed {
            error: e.to_string(),
        };
    }

    match persist_record(storage, path, extracted, record).await {
        Ok(candidate_id) => match storage.commit().await {
            Ok(()) => DocumentOutcome::Inserted { candidate_id },
            Err(e) => {
                rollback_quietly(storage).await;
                DocumentOutcome::Failed {
                    error: e.to_string(),
                }
            }
        },
        Err(e) => {
            rollback_quietly(storage).await;
            DocumentOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

async fn persist_record(
    storage: &Storage,
    path: &Path,
    extracted: &ExtractedText,
    record: &ParsedResume,
) -> Result<CandidateId> {
    let fallback_name = display_name_from_path(path);
    let full_name = record.full_name.as_deref().unwrap_or(&fallback_name);

    let candidate_id = storage
        .insert_candidate(&NewCandidate {
            full_name,
            email: record.email.as_deref(),
            phone: record.phone.as_deref(),
            total_experience_years: record.total_experience_years,
            summary: &record.summary,
        })
        .await?;

    for skill in &record.skills {
        let skill_id = storage.find_or_create_skill(skill).await?;
        storage.add_candidate_skill(candidate_id, skill_id, None).await?;
    }

    for entry in &record.education_entries {
        storage
            .insert_education(
                candidate_id,
                &NewEducation {
                    degree: entry.clone(),
                    ..NewEducation::default()
                },
            )
            .await?;
    }

    storage
        .record_document(
            &extracted.content_hash,
            &path.display().to_string(),
            candidate_id,
        )
        .await?;

    Ok(candidate_id)
}

async fn rollback_quietly(storage: &Storage) {
    if let Err(e) = storage.rollback().await {
        warn!(error = %e, "rollback failed");
    }
}

/// File name, used as the candidate name when no header line qualifies.
fn display_name_from_path(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

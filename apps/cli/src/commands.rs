//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use cvanalyzer_core::{
    AnalysisReport, DocumentOutcome, FieldExtractor, IngestReport, ProgressReporter,
    build_report, extract_document, ingest_directory, normalize_required, rank_candidates,
};
use cvanalyzer_shared::{
    AppConfig, CandidateScore, IngestConfig, RankStrategy, init_config, load_config,
};
use cvanalyzer_storage::Storage;
use cvanalyzer_text::ExtractOptions;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// cvanalyzer — extract candidate records from resumes and rank them by skills.
#[derive(Parser)]
#[command(
    name = "cvanalyzer",
    version,
    about = "Extract structured candidate records from resumes and rank them against required skills.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database file (overrides `[storage] db_path`).
    #[arg(long, env = "CVANALYZER_DB", global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract every resume in a directory and store the candidates.
    Ingest {
        /// Directory of resumes (defaults to `[ingest] resumes_dir`).
        dir: Option<PathBuf>,

        /// Re-ingest documents whose content was already stored.
        #[arg(long)]
        force: bool,
    },

    /// Extract one resume and print the record without storing it.
    Parse {
        /// Resume file (.txt, .md, .pdf).
        file: PathBuf,

        /// Print JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Rank stored candidates by required-skill overlap.
    Rank {
        /// Required skills, comma-separated (defaults to `[ranking] required_skills`).
        #[arg(long, value_delimiter = ',')]
        skills: Option<Vec<String>>,

        /// Maximum candidates to show.
        #[arg(long)]
        limit: Option<usize>,

        /// How match counts are computed: in-memory or pushdown.
        #[arg(long)]
        strategy: Option<RankStrategy>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show candidate count, average experience, and the most common skills.
    Report {
        /// Number of skills to list.
        #[arg(long)]
        top: Option<usize>,

        /// Print JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "cvanalyzer=info,cvanalyzer_core=info,cvanalyzer_storage=warn",
        1 => "cvanalyzer=debug,cvanalyzer_core=debug,cvanalyzer_text=debug,cvanalyzer_storage=info",
        _ => "cvanalyzer=trace,cvanalyzer_core=trace,cvanalyzer_text=trace,cvanalyzer_storage=debug",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Ingest { dir, force } => cmd_ingest(db.as_deref(), dir, force).await,
        Command::Parse { file, json } => cmd_parse(&file, json).await,
        Command::Rank {
            skills,
            limit,
            strategy,
            json,
        } => cmd_rank(db.as_deref(), skills, limit, strategy, json).await,
        Command::Report { top, json } => cmd_report(db.as_deref(), top, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

fn resolve_db_path(override_path: Option<&Path>, config: &AppConfig) -> PathBuf {
    override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.db_path())
}

fn build_extractor(config: &AppConfig) -> Result<FieldExtractor> {
    let lexicon = config.skill_lexicon()?;
    if lexicon.is_empty() {
        tracing::warn!("skill lexicon is empty; no skills will be matched");
    }
    Ok(FieldExtractor::new(&lexicon))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ingest(db: Option<&Path>, dir: Option<PathBuf>, force: bool) -> Result<()> {
    let config = load_config()?;
    let extractor = Arc::new(build_extractor(&config)?);

    let mut ingest = IngestConfig::from(&config);
    if let Some(dir) = dir {
        ingest.resumes_dir = dir;
    }
    ingest.force = force;

    if !ingest.resumes_dir.is_dir() {
        return Err(eyre!(
            "resume directory '{}' does not exist",
            ingest.resumes_dir.display()
        ));
    }

    let db_path = resolve_db_path(db, &config);
    let storage = Storage::open(&db_path).await?;

    info!(
        dir = %ingest.resumes_dir.display(),
        db = %db_path.display(),
        force,
        skills = extractor.skill_count(),
        "ingesting resumes"
    );

    let reporter = CliProgress::new();
    let report = ingest_directory(&ingest, extractor, &storage, &reporter).await?;

    print_ingest_summary(&report, &db_path);
    Ok(())
}

fn print_ingest_summary(report: &IngestReport, db_path: &Path) {
    let stats = report.stats();

    println!();
    println!("  Ingest complete.");
    println!("  Run:      {}", report.run_id);
    println!("  Inserted: {}", stats.inserted);
    println!("  Skipped:  {}", stats.skipped);
    println!("  Failed:   {}", stats.failed);
    println!("  Database: {}", db_path.display());
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());

    let failures: Vec<_> = report
        .documents
        .iter()
        .filter_map(|d| match &d.outcome {
            DocumentOutcome::Failed { error } => Some((&d.path, error)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        println!();
        println!("  Failures:");
        for (path, error) in failures {
            println!("    {}: {error}", path.display());
        }
    }
    println!();
}

async fn cmd_parse(file: &Path, json: bool) -> Result<()> {
    let config = load_config()?;
    let extractor = build_extractor(&config)?;
    let opts = ExtractOptions {
        max_file_bytes: config.ingest.max_file_bytes,
    };

    let (extracted, record) = extract_document(file, &extractor, &opts)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let join = |items: &BTreeSet<String>| items.iter().cloned().collect::<Vec<_>>().join(", ");

    println!();
    println!("  File:       {} ({}, {} bytes)", file.display(), extracted.kind, extracted.byte_len);
    println!("  Name:       {}", record.full_name.as_deref().unwrap_or("-"));
    println!("  Email:      {}", record.email.as_deref().unwrap_or("-"));
    println!("  Phone:      {}", record.phone.as_deref().unwrap_or("-"));
    println!("  Skills:     {}", join(&record.skills));
    println!("  Experience: {} years", record.total_experience_years);
    for entry in &record.education_entries {
        println!("  Education:  {entry}");
    }
    println!("  Summary:    {}", record.summary);
    println!();
    Ok(())
}

async fn cmd_rank(
    db: Option<&Path>,
    skills: Option<Vec<String>>,
    limit: Option<usize>,
    strategy: Option<RankStrategy>,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    let required = normalize_required(skills.unwrap_or_else(|| config.ranking.required_skills.clone()));
    let limit = limit.unwrap_or(config.ranking.limit);
    let strategy = strategy.unwrap_or(config.ranking.strategy);

    if required.is_empty() {
        return Err(eyre!("no required skills given (use --skills or [ranking] required_skills)"));
    }

    let storage = Storage::open_readonly(&resolve_db_path(db, &config)).await?;
    let scores = rank_candidates(&storage, &required, limit, strategy).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
        return Ok(());
    }

    print_ranking(&scores, &required);
    Ok(())
}

fn print_ranking(scores: &[CandidateScore], required: &BTreeSet<String>) {
    print!("{}", format_ranking(scores, required));
}

fn format_ranking(scores: &[CandidateScore], required: &BTreeSet<String>) -> String {
    use std::fmt::Write as _;

    let required_list = required.iter().cloned().collect::<Vec<_>>().join(", ");
    let mut out = format!("\n  Required: {required_list}\n\n");
    if scores.is_empty() {
        out.push_str("  No matching candidates.\n\n");
        return out;
    }

    for (rank, score) in scores.iter().enumerate() {
        let matched = score
            .matched_skills
            .as_ref()
            .map(|s| format!("  [{}]", s.iter().cloned().collect::<Vec<_>>().join(", ")))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {:>3}. {:<30} #{:<6} {}/{}{matched}",
            rank + 1,
            score.name,
            score.id.0,
            score.match_count,
            required.len(),
        );
    }
    out.push('\n');
    out
}

async fn cmd_report(db: Option<&Path>, top: Option<usize>, json: bool) -> Result<()> {
    let config = load_config()?;
    let top = top.unwrap_or(config.report.top_skills);

    let storage = Storage::open_readonly(&resolve_db_path(db, &config)).await?;
    let report = build_report(&storage, top).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    println!();
    println!("  Candidates:         {}", report.candidate_count);
    println!("  Average experience: {:.2} years", report.average_experience_years);
    println!();
    println!("  Top skills:");
    if report.top_skills.is_empty() {
        println!("    (none)");
    }
    for usage in &report.top_skills {
        println!("    {:<24} {}", usage.skill, usage.candidate_count);
    }
    println!();
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_done(&self, path: &Path, outcome: &DocumentOutcome, current: usize, total: usize) {
        let status = match outcome {
            DocumentOutcome::Inserted { .. } => "stored",
            DocumentOutcome::Skipped { .. } => "skipped",
            DocumentOutcome::Failed { .. } => "failed",
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.spinner
            .set_message(format!("[{current}/{total}] {status} {name}"));
    }

    fn done(&self, _report: &IngestReport) {
        self.spinner.finish_and_clear();
    }
}

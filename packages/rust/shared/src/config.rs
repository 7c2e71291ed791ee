//! Application configuration for cvanalyzer.
//!
//! User config lives at `~/.cvanalyzer/cvanalyzer.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CvAnalyzerError, Result};
use crate::lexicon::{SkillLexicon, terms_from_lines};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "cvanalyzer.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".cvanalyzer";

/// Starter vocabulary written into a fresh config. Expand it for real use.
const DEFAULT_SKILLS: &[&str] = &[
    "java",
    "python",
    "sql",
    "javascript",
    "spring",
    "hibernate",
    "html",
    "css",
    "react",
    "angular",
    "aws",
    "docker",
    "kubernetes",
    "machine learning",
    "data analysis",
];

// ---------------------------------------------------------------------------
// Config structs (matching cvanalyzer.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Document ingestion settings.
    #[serde(default)]
    pub ingest: IngestSettings,

    /// Skill vocabulary.
    #[serde(default)]
    pub lexicon: LexiconConfig,

    /// Default job requirement and ranking behavior.
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Reporting defaults.
    #[serde(default)]
    pub report: ReportConfig,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database file. `~` expands to the home directory.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.cvanalyzer/cvanalyzer.db".into()
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Directory scanned for resumes when `ingest` gets no argument.
    #[serde(default = "default_resumes_dir")]
    pub resumes_dir: String,

    /// Documents read and extracted in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Documents above this size are rejected before extraction.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            resumes_dir: default_resumes_dir(),
            concurrency: default_concurrency(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_resumes_dir() -> String {
    "resumes".into()
}
fn default_concurrency() -> u32 {
    4
}
fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

/// `[lexicon]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconConfig {
    /// Inline skill terms.
    #[serde(default = "default_skills")]
    pub skills: Vec<String>,

    /// Optional file with one term per line, merged with `skills`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            skills: default_skills(),
            file: None,
        }
    }
}

fn default_skills() -> Vec<String> {
    DEFAULT_SKILLS.iter().map(|s| (*s).to_string()).collect()
}

/// How candidate match counts are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankStrategy {
    /// Load every skill profile and intersect in memory.
    #[default]
    InMemory,
    /// Let the database count matches per candidate.
    Pushdown,
}

impl std::fmt::Display for RankStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory => f.write_str("in-memory"),
            Self::Pushdown => f.write_str("pushdown"),
        }
    }
}

impl std::str::FromStr for RankStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-memory" | "memory" => Ok(Self::InMemory),
            "pushdown" | "sql" => Ok(Self::Pushdown),
            other => Err(format!(
                "unknown rank strategy '{other}': expected 'in-memory' or 'pushdown'"
            )),
        }
    }
}

/// `[ranking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Required skills used when `rank` is run without `--skills`.
    #[serde(default = "default_required_skills")]
    pub required_skills: Vec<String>,

    /// Maximum candidates returned.
    #[serde(default = "default_rank_limit")]
    pub limit: usize,

    #[serde(default)]
    pub strategy: RankStrategy,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            required_skills: default_required_skills(),
            limit: default_rank_limit(),
            strategy: RankStrategy::default(),
        }
    }
}

fn default_required_skills() -> Vec<String> {
    vec!["java".into(), "spring".into(), "sql".into()]
}
fn default_rank_limit() -> usize {
    10
}

/// `[report]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of skills listed in the top-skills report.
    #[serde(default = "default_top_skills")]
    pub top_skills: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_skills: default_top_skills(),
        }
    }
}

fn default_top_skills() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Ingest config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime ingest configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Directory of resumes to process.
    pub resumes_dir: PathBuf,
    /// Maximum documents extracted concurrently (at least 1).
    pub concurrency: usize,
    /// Size cap per document in bytes.
    pub max_file_bytes: u64,
    /// Re-ingest documents whose content hash is already recorded.
    pub force: bool,
}

impl From<&AppConfig> for IngestConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            resumes_dir: expand_home(&config.ingest.resumes_dir),
            concurrency: config.ingest.concurrency.max(1) as usize,
            max_file_bytes: config.ingest.max_file_bytes,
            force: false,
        }
    }
}

impl AppConfig {
    /// Resolved database path.
    pub fn db_path(&self) -> PathBuf {
        expand_home(&self.storage.db_path)
    }

    /// All configured skill terms: inline list first, then the lexicon file.
    pub fn lexicon_terms(&self) -> Result<Vec<String>> {
        let mut terms = self.lexicon.skills.clone();

        if let Some(file) = &self.lexicon.file {
            let path = expand_home(file);
            let content =
                std::fs::read_to_string(&path).map_err(|e| CvAnalyzerError::io(&path, e))?;
            let before = terms.len();
            terms.extend(terms_from_lines(&content).map(String::from));
            tracing::debug!(?path, added = terms.len() - before, "loaded lexicon file");
        }

        Ok(terms)
    }

    /// Build the immutable skill lexicon from config.
    pub fn skill_lexicon(&self) -> Result<SkillLexicon> {
        Ok(SkillLexicon::new(self.lexicon_terms()?))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Get the path to the config directory (`~/.cvanalyzer/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CvAnalyzerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.cvanalyzer/cvanalyzer.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CvAnalyzerError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CvAnalyzerError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CvAnalyzerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CvAnalyzerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CvAnalyzerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("db_path"));
        assert!(toml_str.contains("machine learning"));
        assert!(toml_str.contains("in-memory"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.ingest.concurrency, 4);
        assert_eq!(parsed.ranking.limit, 10);
        assert_eq!(parsed.lexicon.skills.len(), DEFAULT_SKILLS.len());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[ranking]
required_skills = ["rust", "tokio"]
strategy = "pushdown"

[lexicon]
skills = ["rust", "tokio", "sqlite"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.ranking.strategy, RankStrategy::Pushdown);
        assert_eq!(config.ranking.required_skills, vec!["rust", "tokio"]);
        assert_eq!(config.ranking.limit, 10);
        assert_eq!(config.lexicon.skills.len(), 3);
        assert_eq!(config.report.top_skills, 10);
    }

    #[test]
    fn ingest_config_from_app_config() {
        let mut app = AppConfig::default();
        app.ingest.concurrency = 0;
        let ingest = IngestConfig::from(&app);
        assert_eq!(ingest.concurrency, 1);
        assert_eq!(ingest.resumes_dir, PathBuf::from("resumes"));
        assert_eq!(ingest.max_file_bytes, 10 * 1024 * 1024);
        assert!(!ingest.force);
    }

    #[test]
    fn rank_strategy_parsing() {
        assert_eq!("pushdown".parse::<RankStrategy>(), Ok(RankStrategy::Pushdown));
        assert_eq!("In-Memory".parse::<RankStrategy>(), Ok(RankStrategy::InMemory));
        assert!("fuzzy".parse::<RankStrategy>().is_err());
        assert_eq!(RankStrategy::Pushdown.to_string(), "pushdown");
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("var/db.sqlite"), PathBuf::from("var/db.sqlite"));
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x.db"), home.join("x.db"));
        }
    }

    #[test]
    fn lexicon_merges_inline_and_file_terms() {
        let path = std::env::temp_dir().join(format!(
            "cva_lexicon_{}_{}.txt",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::write(&path, "# extra\nRust\ngraphql\n").expect("write lexicon file");

        let mut config = AppConfig::default();
        config.lexicon.skills = vec!["java".into()];
        config.lexicon.file = Some(path.to_string_lossy().into_owned());

        let lexicon = config.skill_lexicon().expect("build lexicon");
        assert_eq!(lexicon.len(), 3);
        assert!(lexicon.contains("rust"));
        assert!(lexicon.contains("graphql"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_lexicon_file_is_io_error() {
        let mut config = AppConfig::default();
        config.lexicon.file = Some("/definitely/not/here/skills.txt".into());
        let err = config.lexicon_terms().unwrap_err();
        assert!(matches!(err, CvAnalyzerError::Io { .. }));
    }
}

//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pairlog/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pairlog/` (~/.config/pairlog/)
//! - Data: `$XDG_DATA_HOME/pairlog/` (~/.local/share/pairlog/)
//! - State/Logs: `$XDG_STATE_HOME/pairlog/` (~/.local/state/pairlog/)
//!
//! Every field has a built-in default, so a missing file or a partial file is
//! never an error. Callers build a [`Config`] once and pass the relevant
//! sections into each operation.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Which operations are enabled
    #[serde(default)]
    pub profile: Profile,

    /// Triage classifier keyword lists and strictness
    #[serde(default)]
    pub triage: TriageConfig,

    /// Scorecard tuning
    #[serde(default)]
    pub scorecard: ScorecardConfig,

    /// Log ingestion settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============================================
// Profile / capabilities
// ============================================

/// Named operation profile.
///
/// A profile only expands into a [`Capabilities`] value; front ends receive
/// that value explicitly rather than consulting shared state.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Triage only
    Minimal,
    /// Triage and correction learning
    Standard,
    /// Everything, including scorecards
    #[default]
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Minimal => "minimal",
            Profile::Standard => "standard",
            Profile::Full => "full",
        }
    }

    /// Expand the profile into the set of enabled operations.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Profile::Minimal => Capabilities {
                triage: true,
                learning: false,
                scorecard: false,
            },
            Profile::Standard => Capabilities {
                triage: true,
                learning: true,
                scorecard: false,
            },
            Profile::Full => Capabilities {
                triage: true,
                learning: true,
                scorecard: true,
            },
        }
    }
}

/// Set of operations a caller is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub triage: bool,
    pub learning: bool,
    pub scorecard: bool,
}

// ============================================
// Triage
// ============================================

/// How eagerly short or vague instructions are flagged as ambiguous.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    Relaxed,
    #[default]
    Standard,
    Strict,
}

impl Strictness {
    /// Instructions shorter than this with no path reference are ambiguous.
    pub fn ambiguity_length_threshold(&self) -> usize {
        match self {
            Strictness::Relaxed => 30,
            Strictness::Standard => 50,
            Strictness::Strict => 80,
        }
    }

    /// Whether vague pronouns and object-less verbs mark an instruction ambiguous.
    pub fn flags_vague_references(&self) -> bool {
        !matches!(self, Strictness::Relaxed)
    }
}

/// Keyword lists for the triage classifier.
///
/// Matching is case-insensitive on word boundaries. Defaults:
/// - `skip`: version-control and formatting chores
/// - `always_check`: empty (project-specific)
/// - `cross_service`: phrases that imply touching more than one service
/// - `multi_step`: sequencing phrases
/// - `short_commands`: leading verbs of one-shot commands
#[derive(Debug, Deserialize, Clone)]
pub struct TriageConfig {
    #[serde(default)]
    pub strictness: Strictness,

    #[serde(default = "default_skip_keywords")]
    pub skip: Vec<String>,

    #[serde(default)]
    pub always_check: Vec<String>,

    #[serde(default = "default_cross_service_keywords")]
    pub cross_service: Vec<String>,

    #[serde(default = "default_multi_step_keywords")]
    pub multi_step: Vec<String>,

    #[serde(default = "default_short_commands")]
    pub short_commands: Vec<String>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::default(),
            skip: default_skip_keywords(),
            always_check: Vec::new(),
            cross_service: default_cross_service_keywords(),
            multi_step: default_multi_step_keywords(),
            short_commands: default_short_commands(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_skip_keywords() -> Vec<String> {
    strings(&[
        "git status",
        "git push",
        "commit",
        "typo",
        "run lint",
        "run format",
    ])
}

fn default_cross_service_keywords() -> Vec<String> {
    strings(&[
        "cross-service",
        "across services",
        "microservice",
        "api contract",
        "shared types",
        "both repos",
    ])
}

fn default_multi_step_keywords() -> Vec<String> {
    strings(&[
        "and then",
        "after that",
        "followed by",
        "step 1",
        "first,",
        "finally",
        "then",
    ])
}

fn default_short_commands() -> Vec<String> {
    strings(&[
        "fix", "run", "test", "build", "lint", "format", "commit", "push", "deploy", "continue",
        "yes", "ok", "go", "undo", "revert", "status",
    ])
}

// ============================================
// Scorecard
// ============================================

/// How the Sequencing category treats prompts that mention no path.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PathlessPrompts {
    /// The prompt stays in the previous area and counts toward the total
    #[default]
    SameArea,
    /// The prompt is left out of both the switch count and the total
    Excluded,
}

/// Scorecard tuning
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScorecardConfig {
    #[serde(default)]
    pub pathless_prompts: PathlessPrompts,
}

// ============================================
// Ingest
// ============================================

/// Log ingestion settings
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Files larger than this are streamed line by line
    #[serde(default = "default_stream_threshold")]
    pub stream_threshold_bytes: u64,

    /// Glob used to find session logs under a directory
    #[serde(default = "default_session_glob")]
    pub session_glob: String,

    /// Directory holding per-project session logs (default: ~/.claude/projects)
    #[serde(default)]
    pub log_root: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            stream_threshold_bytes: default_stream_threshold(),
            session_glob: default_session_glob(),
            log_root: None,
        }
    }
}

impl IngestConfig {
    /// The configured log root, or `~/.claude/projects`.
    pub fn log_root(&self) -> PathBuf {
        self.log_root
            .clone()
            .unwrap_or_else(|| home_dir().join(".claude").join("projects"))
    }
}

fn default_stream_threshold() -> u64 {
    8 * 1024 * 1024
}

fn default_session_glob() -> String {
    "**/*.jsonl".to_string()
}

// ============================================
// Logging
// ============================================

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pairlog/config.toml` (~/.config/pairlog/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pairlog").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/pairlog/` (~/.local/share/pairlog/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("pairlog")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/pairlog/` (~/.local/state/pairlog/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pairlog")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/pairlog/data.db` (~/.local/share/pairlog/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/pairlog/pairlog.log` (~/.local/state/pairlog/pairlog.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("pairlog.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.profile, Profile::Full);
        assert_eq!(config.triage.strictness, Strictness::Standard);
        assert!(config.triage.always_check.is_empty());
        assert!(config.triage.short_commands.contains(&"fix".to_string()));
        assert_eq!(config.ingest.stream_threshold_bytes, 8 * 1024 * 1024);
        assert_eq!(config.scorecard.pathless_prompts, PathlessPrompts::SameArea);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
profile = "standard"

[triage]
strictness = "strict"
always_check = ["rewards", "billing"]

[scorecard]
pathless_prompts = "excluded"

[ingest]
log_root = "/srv/logs"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.profile, Profile::Standard);
        assert_eq!(config.triage.strictness, Strictness::Strict);
        assert_eq!(config.triage.always_check, vec!["rewards", "billing"]);
        // Unspecified lists keep their defaults
        assert!(!config.triage.skip.is_empty());
        assert_eq!(config.scorecard.pathless_prompts, PathlessPrompts::Excluded);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.ingest.log_root(), PathBuf::from("/srv/logs"));
    }

    #[test]
    fn test_strictness_thresholds() {
        assert_eq!(Strictness::Relaxed.ambiguity_length_threshold(), 30);
        assert_eq!(Strictness::Standard.ambiguity_length_threshold(), 50);
        assert_eq!(Strictness::Strict.ambiguity_length_threshold(), 80);
        assert!(!Strictness::Relaxed.flags_vague_references());
        assert!(Strictness::Strict.flags_vague_references());
    }

    #[test]
    fn test_profile_capabilities() {
        let minimal = Profile::Minimal.capabilities();
        assert!(minimal.triage);
        assert!(!minimal.learning);
        assert!(!minimal.scorecard);

        let full = Profile::Full.capabilities();
        assert!(full.triage && full.learning && full.scorecard);
    }

    #[test]
    fn test_load_from_missing_file_is_config_error() {
        let err = Config::load_from(Path::new("/nonexistent/pairlog.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

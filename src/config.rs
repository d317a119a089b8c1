//! Pipeline configuration. Loaded once at startup; every section has defaults.

use crate::features::Strategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extraction strategies run by `fit`/`transform`
    pub strategies: BTreeSet<Strategy>,
    /// TF-IDF vectorizer parameters
    pub lexical: LexicalConfig,
    /// Parser bounds for the AST strategy
    pub syntactic: SyntacticConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    /// Minimum number of documents a term must appear in
    pub min_df: usize,
    /// Maximum share of documents a term may appear in (0.0–1.0)
    pub max_df: f64,
    /// Use `1 + ln(tf)` instead of raw term counts
    pub sublinear_tf: bool,
    pub lowercase: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntacticConfig {
    /// Sources larger than this are treated as unparseable
    pub max_source_bytes: usize,
    /// Estimated structural nesting (brackets, prefix and right-associative
    /// operators, nested statements) above this is treated as unparseable
    pub max_nesting_depth: usize,
    /// Estimated expression depth, left-associative chains included, above
    /// this is treated as unparseable
    pub max_expression_depth: usize,
    /// Per-sample parse budget in milliseconds; 0 parses inline without a bound
    pub parse_timeout_ms: u64,
    /// Threads used to parse rows of one batch; 0 picks the available parallelism
    pub workers: usize,
    /// Parser threads allowed alive at once, timed-out ones included; never below `workers`
    pub max_live_parsers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategies: BTreeSet::from([Strategy::Statistical]),
            lexical: LexicalConfig::default(),
            syntactic: SyntacticConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            min_df: 5,
            max_df: 0.5,
            sublinear_tf: true,
            lowercase: true,
        }
    }
}

impl Default for SyntacticConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: 4 * 1024 * 1024,
            max_nesting_depth: 512,
            max_expression_depth: 4_096,
            parse_timeout_ms: 5_000,
            workers: 0,
            max_live_parsers: 256,
        }
    }
}

impl SyntacticConfig {
    pub fn parse_timeout(&self) -> Option<Duration> {
        (self.parse_timeout_ms > 0).then(|| Duration::from_millis(self.parse_timeout_ms))
    }

    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "config read error: {}", err),
            Self::Json(err) => write!(f, "config parse error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl PipelineConfig {
    /// Load from JSON file; a missing file yields the defaults
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Like [`PipelineConfig::try_load`], but an unreadable file is logged and replaced by the defaults
    pub fn load(path: &Path) -> Self {
        Self::try_load(path).unwrap_or_else(|error| {
            tracing::warn!(path = %path.display(), %error, "invalid config; using defaults");
            Self::default()
        })
    }
}

//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `secrets.toml`. The `[pgadmin]` and `[local_file_paths]` tables are
//! required; everything else has defaults.

use crate::analysis::HeightBucketTable;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "secrets.toml";

/// Semantic problems in an otherwise well-formed config file.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("lower_threshold ({lower}) must be below upper_threshold ({upper})")]
    InvalidThresholds { upper: f64, lower: f64 },

    #[error("invalid height group: {0}")]
    InvalidHeightGroup(String),

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("max_connections must be at least 1")]
    NoConnections,
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database credentials.
    pub pgadmin: DatabaseConfig,

    /// Local data locations.
    pub local_file_paths: LocalFilePaths,

    /// Loader settings.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// PostgreSQL connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database user.
    pub user: String,

    /// Password for `user`.
    pub pass: String,

    /// Server host name.
    pub host: String,

    /// Database name.
    pub database: String,

    /// Server port, driver default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long to wait for a connection before failing.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

// Hand-written so the password never reaches a log line.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("pass", &"***")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_seconds", &self.acquire_timeout_seconds)
            .finish()
    }
}

fn default_max_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

/// Local file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFilePaths {
    /// Directory holding one CSV per ATP singles season.
    pub atp_singles: PathBuf,
}

/// Loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Destination table, replaced on every load.
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
        }
    }
}

fn default_table() -> String {
    "atp_matches_singles".to_string()
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// SQL file producing `name, ht, ace_percentage, total_matches`.
    #[serde(default = "default_query_file")]
    pub query_file: PathBuf,

    /// Heights below this are treated as bad data.
    #[serde(default = "default_min_height")]
    pub min_height: i32,

    /// Match-count floor for the second chart.
    #[serde(default = "default_min_matches")]
    pub min_matches: i64,

    /// Z-score above which a record is a high outlier.
    #[serde(default = "default_upper_threshold")]
    pub upper_threshold: f64,

    /// Z-score below which a record is a low outlier.
    #[serde(default = "default_lower_threshold")]
    pub lower_threshold: f64,

    /// Ordered height bucket rules.
    #[serde(default)]
    pub height_groups: HeightBucketTable,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            query_file: default_query_file(),
            min_height: default_min_height(),
            min_matches: default_min_matches(),
            upper_threshold: default_upper_threshold(),
            lower_threshold: default_lower_threshold(),
            height_groups: HeightBucketTable::default(),
        }
    }
}

fn default_query_file() -> PathBuf {
    PathBuf::from("all_hard_court_matches.sql")
}

fn default_min_height() -> i32 {
    100
}

fn default_min_matches() -> i64 {
    100
}

fn default_upper_threshold() -> f64 {
    crate::analysis::classify::DEFAULT_UPPER_THRESHOLD
}

fn default_lower_threshold() -> f64 {
    crate::analysis::classify::DEFAULT_LOWER_THRESHOLD
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory the charts and reports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Chart title.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            title: default_title(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_title() -> String {
    "Ace Percentage vs Height".to_string()
}

impl Config {
    /// Load and validate configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("pgadmin.user", self.pgadmin.user.as_str()),
            ("pgadmin.host", self.pgadmin.host.as_str()),
            ("pgadmin.database", self.pgadmin.database.as_str()),
            ("loader.table", self.loader.table.as_str()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::EmptyField { field: *field });
        }
        if self.local_file_paths.atp_singles.as_os_str().is_empty() {
            return Err(ConfigError::EmptyField {
                field: "local_file_paths.atp_singles",
            });
        }
        if self.pgadmin.max_connections == 0 {
            return Err(ConfigError::NoConnections);
        }

        let analysis = &self.analysis;
        if !(analysis.lower_threshold < analysis.upper_threshold) {
            return Err(ConfigError::InvalidThresholds {
                upper: analysis.upper_threshold,
                lower: analysis.lower_threshold,
            });
        }
        analysis
            .height_groups
            .validate()
            .map_err(ConfigError::InvalidHeightGroup)?;

        Ok(())
    }

    /// Apply CLI overrides for the `load` subcommand.
    pub fn merge_load_args(&mut self, dir: Option<&Path>, table: Option<&str>) {
        if let Some(dir) = dir {
            self.local_file_paths.atp_singles = dir.to_path_buf();
        }
        if let Some(table) = table {
            self.loader.table = table.to_string();
        }
    }

    /// Apply CLI overrides for the `analyze` subcommand.
    pub fn merge_analyze_args(&mut self, query: Option<&Path>, output: Option<&Path>) {
        if let Some(query) = query {
            self.analysis.query_file = query.to_path_buf();
        }
        if let Some(output) = output {
            self.report.output_dir = output.to_path_buf();
        }
    }

    /// Placeholder configuration written by `--init-config`.
    pub fn example() -> Self {
        Self {
            pgadmin: DatabaseConfig {
                user: "postgres".to_string(),
                pass: "change-me".to_string(),
                host: "localhost".to_string(),
                database: "tennis".to_string(),
                port: Some(5432),
                max_connections: default_max_connections(),
                acquire_timeout_seconds: default_acquire_timeout(),
            },
            local_file_paths: LocalFilePaths {
                atp_singles: PathBuf::from("data/atp_singles"),
            },
            loader: LoaderConfig::default(),
            analysis: AnalysisConfig::default(),
            report: ReportConfig::default(),
        }
    }

    /// Generate template configuration file content.
    pub fn example_toml() -> String {
        toml::to_string_pretty(&Self::example()).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[pgadmin]
user = "postgres"
pass = "secret"
host = "db.local"
database = "tennis"

[local_file_paths]
atp_singles = "/data/atp"
"#;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.pgadmin.host, "db.local");
        assert_eq!(config.pgadmin.port, None);
        assert_eq!(config.local_file_paths.atp_singles, PathBuf::from("/data/atp"));
        assert_eq!(config.loader.table, "atp_matches_singles");
        assert_eq!(config.analysis.min_height, 100);
        assert_eq!(config.analysis.min_matches, 100);
        assert_eq!(config.analysis.upper_threshold, 1.75);
        assert_eq!(config.analysis.lower_threshold, -1.75);
        assert_eq!(config.analysis.height_groups, HeightBucketTable::default());
        assert_eq!(config.report.output_dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_missing_pgadmin_fails() {
        let content = r#"
[local_file_paths]
atp_singles = "/data/atp"
"#;
        assert!(Config::from_toml(content).is_err());
    }

    #[test]
    fn test_missing_password_fails() {
        let content = MINIMAL.replace("pass = \"secret\"\n", "");
        let err = Config::from_toml(&content).unwrap_err();
        assert!(format!("{:#}", err).contains("pass"));
    }

    #[test]
    fn test_custom_analysis_section() {
        let content = format!(
            "{}{}",
            MINIMAL,
            r#"
[analysis]
min_matches = 50
upper_threshold = 2.0
lower_threshold = -2.5

[[analysis.height_groups]]
one_of = [170, 171, 172]
group = 170

[[analysis.height_groups]]
between = [195, 199]
group = 195
"#
        );

        let config = Config::from_toml(&content).unwrap();
        assert_eq!(config.analysis.min_matches, 50);
        assert_eq!(config.analysis.upper_threshold, 2.0);
        assert_eq!(config.analysis.height_groups.rules().len(), 2);
        assert_eq!(config.analysis.height_groups.group_for(172), 170);
        assert_eq!(config.analysis.height_groups.group_for(198), 195);
        assert_eq!(config.analysis.height_groups.group_for(174), 174);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        config.analysis.upper_threshold = -1.0;
        config.analysis.lower_threshold = 1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidThresholds {
                upper: -1.0,
                lower: 1.0
            })
        );
    }

    #[test]
    fn test_bad_height_group_rejected() {
        let content = format!(
            "{}{}",
            MINIMAL,
            r#"
[[analysis.height_groups]]
between = [199, 195]
group = 195
"#
        );
        assert!(Config::from_toml(&content).is_err());
    }

    #[test]
    fn test_empty_host_rejected() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        config.pgadmin.host = String::new();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyField {
                field: "pgadmin.host"
            })
        );
    }

    #[test]
    fn test_merge_args() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        config.merge_load_args(Some(Path::new("/other")), None);
        config.merge_analyze_args(None, Some(Path::new("out")));

        assert_eq!(config.local_file_paths.atp_singles, PathBuf::from("/other"));
        assert_eq!(config.loader.table, "atp_matches_singles");
        assert_eq!(config.analysis.query_file, PathBuf::from("all_hard_court_matches.sql"));
        assert_eq!(config.report.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = Config::from_toml(MINIMAL).unwrap();
        let debug = format!("{:?}", config.pgadmin);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_example_toml_round_trips() {
        let toml_str = Config::example_toml();
        assert!(toml_str.contains("[pgadmin]"));
        assert!(toml_str.contains("[local_file_paths]"));

        let parsed = Config::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.analysis.height_groups, HeightBucketTable::default());
    }
}

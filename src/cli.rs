//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hardcourt Aces - height vs ace percentage on hard courts
///
/// Stack ATP singles season CSVs into PostgreSQL, then flag players whose
/// ace percentage is unusual for their height.
///
/// Examples:
///   hardcourt-aces load
///   hardcourt-aces load --dir ./atp_singles --dry-run
///   hardcourt-aces analyze --query all_hard_court_matches.sql --output reports
///   hardcourt-aces --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Pipeline to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        default_value = crate::config::DEFAULT_CONFIG_FILE,
        env = "HARDCOURT_CONFIG",
        value_name = "FILE"
    )]
    pub config: PathBuf,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a template secrets.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// The two pipelines.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Stack every season CSV and replace the matches table
    Load {
        /// Directory of season CSVs (overrides local_file_paths.atp_singles)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Destination table (overrides loader.table)
        #[arg(long, value_name = "NAME")]
        table: Option<String>,

        /// Stack the files and print the schema without touching the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Query hard-court aggregates, flag outliers and render charts
    Analyze {
        /// SQL file to run (overrides analysis.query_file)
        #[arg(long, value_name = "FILE")]
        query: Option<PathBuf>,

        /// Output directory (overrides report.output_dir)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.command.is_none() {
            return Err("A subcommand is required: load or analyze".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(Command::Load { table: Some(table), .. }) = &self.command {
            if table.trim().is_empty() {
                return Err("Table name must not be empty".to_string());
            }
        }

        // Validate local directory if provided
        if let Some(Command::Load { dir: Some(dir), .. }) = &self.command {
            if !dir.exists() {
                return Err(format!("Season directory does not exist: {}", dir.display()));
            }
            if !dir.is_dir() {
                return Err(format!("Season path is not a directory: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

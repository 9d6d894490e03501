//! Season file discovery and stacking.
//!
//! The loader reads every season CSV in one directory and stacks them into a
//! single [`MatchTable`] before anything is written to the database.

pub mod table;

pub use table::{Cell, ColumnType, MatchTable};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// List the season files in `dir`, sorted by file name.
///
/// Only regular files directly inside `dir` are returned; hidden files are
/// skipped. A missing or empty directory is an error.
pub fn list_season_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Season directory not found: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry
            .with_context(|| format!("Failed to list season directory: {}", dir.display()))?;

        if is_hidden(entry.file_name().to_string_lossy().as_ref()) {
            debug!("Skipping hidden entry {}", entry.path().display());
            continue;
        }

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        anyhow::bail!("No season files found in {}", dir.display());
    }

    info!("Found {} season files in {}", files.len(), dir.display());
    Ok(files)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Parse one season file.
pub fn read_season_file(path: &Path) -> Result<MatchTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header: {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = MatchTable::with_columns(headers);
    for (line, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Malformed CSV row {} in {}", line + 2, path.display()))?;
        table.push_row(record.iter().map(Cell::parse).collect());
    }

    debug!("Read {} rows from {}", table.row_count(), path.display());
    Ok(table)
}

/// Read and stack every file in order.
pub fn stack_files(paths: &[PathBuf], show_progress: bool) -> Result<MatchTable> {
    let progress = if show_progress {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut stacked = MatchTable::default();
    for path in paths {
        if let Some(ref pb) = progress {
            let name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
            pb.set_message(name);
        }

        let season = read_season_file(path)?;
        stacked.append(season);

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message("Season data stacked");
    }

    info!(
        "Stacked {} rows x {} columns from {} files",
        stacked.row_count(),
        stacked.column_count(),
        paths.len()
    );
    Ok(stacked)
}

/// List and stack a season directory in one call.
pub fn stack_directory(dir: &Path, show_progress: bool) -> Result<MatchTable> {
    let files = list_season_files(dir)?;
    stack_files(&files, show_progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_list_season_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "atp_matches_2001.csv", "a\n1\n");
        write(dir.path(), "atp_matches_2000.csv", "a\n1\n");
        write(dir.path(), ".DS_Store", "junk");
        fs::create_dir(dir.path().join("nested")).unwrap();

        let files = list_season_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["atp_matches_2000.csv", "atp_matches_2001.csv"]);
    }

    #[test]
    fn test_empty_directory_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(list_season_files(dir.path()).is_err());
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = list_season_files(&missing).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_read_season_file() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "2019.csv",
            "winner_name,winner_ht,surface\nRafael Nadal,185,Hard\nJohn Isner,,Hard\n",
        );

        let table = read_season_file(&dir.path().join("2019.csv")).unwrap();
        assert_eq!(table.columns(), &["winner_name", "winner_ht", "surface"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[1][1], Cell::Null);
    }

    #[test]
    fn test_malformed_row_is_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.csv", "a,b\n1,2\n3\n");

        let err = read_season_file(&dir.path().join("bad.csv")).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.csv"));
    }

    #[test]
    fn test_stack_directory_unions_columns() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "1990.csv", "tourney_id,surface\n1990-1,Hard\n");
        write(
            dir.path(),
            "2020.csv",
            "tourney_id,surface,w_ace\n2020-1,Clay,12\n2020-2,Hard,7\n",
        );

        let table = stack_directory(dir.path(), false).unwrap();
        assert_eq!(table.columns(), &["tourney_id", "surface", "w_ace"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows()[0][2], Cell::Null);
        assert_eq!(table.rows()[2][2], Cell::Int(7, "7".to_string()));
    }
}

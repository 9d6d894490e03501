//! PostgreSQL access.
//!
//! Two round trips only: replacing the stacked matches table and fetching the
//! hard-court aggregate.

use crate::config::DatabaseConfig;
use crate::models::PlayerAceRecord;
use crate::season::{ColumnType, MatchTable};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use tracing::{debug, info};

/// PostgreSQL's limit on bind parameters per statement.
const MAX_BIND_PARAMS: usize = 65_535;

/// Upper bound on rows per INSERT regardless of width.
const MAX_ROWS_PER_BATCH: usize = 5_000;

/// PostgreSQL's limit on columns per table.
const MAX_COLUMNS: usize = 1_600;

/// Build connection options from config. The password is never logged.
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .username(&config.user)
        .password(&config.pass)
        .database(&config.database);

    if let Some(port) = config.port {
        options = options.port(port);
    }

    options
}

/// Connection target with the password left out, for log lines.
pub fn display_target(config: &DatabaseConfig) -> String {
    match config.port {
        Some(port) => format!("{}@{}:{}/{}", config.user, config.host, port, config.database),
        None => format!("{}@{}/{}", config.user, config.host, config.database),
    }
}

/// Open a connection pool.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    info!("Connecting to database {}", display_target(config));

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .connect_with(connect_options(config))
        .await
        .with_context(|| format!("Failed to connect to database {}", display_target(config)))?;

    Ok(pool)
}

/// Quote an identifier for PostgreSQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE` statement for a stacked table.
pub fn create_table_sql(table_name: &str, columns: &[String], types: &[ColumnType]) -> String {
    let column_defs: Vec<String> = columns
        .iter()
        .zip(types)
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql_name()))
        .collect();

    format!(
        "CREATE TABLE {} ({})",
        quote_ident(table_name),
        column_defs.join(", ")
    )
}

/// `INSERT INTO ... (...) ` prefix shared by every batch.
pub fn insert_prefix(table_name: &str, columns: &[String]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!("INSERT INTO {} ({}) ", quote_ident(table_name), names.join(", "))
}

/// How many rows fit in one INSERT for a table this wide.
pub fn rows_per_batch(column_count: usize) -> usize {
    if column_count == 0 {
        return MAX_ROWS_PER_BATCH;
    }
    (MAX_BIND_PARAMS / column_count).clamp(1, MAX_ROWS_PER_BATCH)
}

/// Fail early on a table PostgreSQL cannot create.
pub fn check_width(column_count: usize) -> Result<()> {
    if column_count > MAX_COLUMNS {
        anyhow::bail!(
            "Stacked data has {} columns; PostgreSQL allows at most {}",
            column_count,
            MAX_COLUMNS
        );
    }
    Ok(())
}

/// Drop `table_name` if present, recreate it and insert every row.
///
/// Runs in a single transaction, so a failed load leaves the previous table
/// in place. Returns the number of rows written.
pub async fn replace_table(
    pool: &PgPool,
    table_name: &str,
    table: &MatchTable,
    show_progress: bool,
) -> Result<u64> {
    check_width(table.column_count())?;

    let types = table.infer_column_types();
    for (name, ty) in table.columns().iter().zip(&types) {
        debug!("Column {} -> {}", name, ty);
    }

    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table_name)))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to drop table {}", table_name))?;

    sqlx::query(&create_table_sql(table_name, table.columns(), &types))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to create table {}", table_name))?;

    let mut written = 0u64;
    if table.column_count() > 0 && !table.is_empty() {
        let batch_size = rows_per_batch(table.column_count());
        let prefix = insert_prefix(table_name, table.columns());

        let progress = if show_progress {
            let pb = ProgressBar::new(table.row_count() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        for chunk in table.rows().chunks(batch_size) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(prefix.as_str());
            builder.push_values(chunk, |mut b, row| {
                for (cell, ty) in row.iter().zip(&types) {
                    match ty {
                        ColumnType::BigInt => {
                            b.push_bind(cell.as_i64());
                        }
                        ColumnType::Double => {
                            b.push_bind(cell.as_f64());
                        }
                        ColumnType::Text => {
                            b.push_bind(cell.as_text());
                        }
                    }
                }
            });

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert rows into {}", table_name))?;
            written += result.rows_affected();

            if let Some(ref pb) = progress {
                pb.inc(chunk.len() as u64);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("Upload complete");
        }
    }

    tx.commit()
        .await
        .with_context(|| format!("Failed to commit load of {}", table_name))?;

    info!("Replaced table {} with {} rows", table_name, written);
    Ok(written)
}

/// Run the aggregation query and decode `name, ht, ace_percentage, total_matches`.
pub async fn fetch_player_aces(pool: &PgPool, sql: &str) -> Result<Vec<PlayerAceRecord>> {
    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .context("Failed to execute hard-court query")?;

    debug!("Query returned {} rows", rows.len());
    rows.iter().map(decode_player_row).collect()
}

fn decode_player_row(row: &PgRow) -> Result<PlayerAceRecord> {
    let name: Option<String> = row
        .try_get("name")
        .context("Column `name` is missing or not text")?;
    let ht = numeric_column(row, "ht")?;
    let ace_percentage = numeric_column(row, "ace_percentage")?;
    let total_matches = numeric_column(row, "total_matches")?;

    Ok(PlayerAceRecord::new(
        name.unwrap_or_default(),
        ht.map(|v| v.round() as i32),
        ace_percentage.unwrap_or(f64::NAN),
        total_matches.map(|v| v as i64).unwrap_or(0),
    ))
}

/// Read a nullable numeric column of any integer, float or NUMERIC type.
fn numeric_column(row: &PgRow, column: &str) -> Result<Option<f64>> {
    if let Ok(v) = row.try_get::<Option<f64>, _>(column) {
        return Ok(v);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(column) {
        return Ok(v.map(f64::from));
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(column) {
        return Ok(v.map(|v| v as f64));
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(column) {
        return Ok(v.map(f64::from));
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(column) {
        return Ok(v.map(f64::from));
    }

    let v: Option<Decimal> = row
        .try_get(column)
        .with_context(|| format!("Column `{}` is missing or not numeric", column))?;
    Ok(v.and_then(|d| d.to_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_config() -> DatabaseConfig {
        DatabaseConfig {
            user: "postgres".to_string(),
            pass: "p@ss/word".to_string(),
            host: "db.local".to_string(),
            database: "tennis".to_string(),
            port: Some(5433),
            max_connections: 2,
            acquire_timeout_seconds: 30,
        }
    }

    #[test]
    fn test_connect_options() {
        let options = connect_options(&db_config());
        assert_eq!(options.get_host(), "db.local");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_username(), "postgres");
        assert_eq!(options.get_database(), Some("tennis"));
    }

    #[test]
    fn test_display_target_hides_password() {
        let target = display_target(&db_config());
        assert_eq!(target, "postgres@db.local:5433/tennis");
        assert!(!target.contains("p@ss"));

        let mut config = db_config();
        config.port = None;
        assert_eq!(display_target(&config), "postgres@db.local/tennis");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("winner_ht"), "\"winner_ht\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_create_table_sql() {
        let columns = vec!["winner_ht".to_string(), "surface".to_string(), "w_ace".to_string()];
        let types = vec![ColumnType::BigInt, ColumnType::Text, ColumnType::Double];

        let sql = create_table_sql("atp_matches_singles", &columns, &types);
        assert_eq!(
            sql,
            "CREATE TABLE \"atp_matches_singles\" (\"winner_ht\" BIGINT, \"surface\" TEXT, \"w_ace\" DOUBLE PRECISION)"
        );
    }

    #[test]
    fn test_insert_prefix() {
        let columns = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            insert_prefix("t", &columns),
            "INSERT INTO \"t\" (\"a\", \"b\") "
        );
    }

    #[test]
    fn test_rows_per_batch_respects_bind_limit() {
        assert_eq!(rows_per_batch(49), 65_535 / 49);
        assert!(rows_per_batch(49) * 49 <= MAX_BIND_PARAMS);
        assert_eq!(rows_per_batch(1), MAX_ROWS_PER_BATCH);
        assert_eq!(rows_per_batch(0), MAX_ROWS_PER_BATCH);
        assert!(rows_per_batch(MAX_COLUMNS) * MAX_COLUMNS <= MAX_BIND_PARAMS);
    }

    #[test]
    fn test_check_width() {
        assert!(check_width(49).is_ok());
        assert!(check_width(MAX_COLUMNS).is_ok());

        let err = check_width(MAX_COLUMNS + 1).unwrap_err();
        assert!(err.to_string().contains("1600"));
    }
}

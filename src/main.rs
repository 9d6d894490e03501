//! Hardcourt Aces - height vs ace percentage on hard courts
//!
//! A CLI tool with two pipelines:
//! - `load` stacks every ATP singles season CSV into one PostgreSQL table
//! - `analyze` queries hard-court aggregates, flags ace-percentage outliers
//!   within height groups and renders interactive scatter plots
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (config, database, file I/O)

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod season;
mod store;

use analysis::{analyze, AnalysisParams};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, Command};
use config::Config;
use models::{AnalysisReport, ReportMetadata};
use report::{OutputPaths, ScatterPlot};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config(&args.config);
    }

    // Initialize logging
    init_logging(&args);

    info!("hardcourt-aces v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a template secrets.toml.
fn handle_init_config(path: &Path) -> Result<()> {
    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            path.display()
        );
        std::process::exit(1);
    }

    let content = Config::example_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with placeholder settings.", path.display());
    println!("   Fill in [pgadmin] credentials and local_file_paths.atp_singles.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration and dispatch to the requested pipeline.
async fn run(args: Args) -> Result<()> {
    info!("Loading config from: {}", args.config.display());
    let mut config = Config::load(&args.config)?;
    let show_progress = !args.quiet;

    match args.command {
        Some(Command::Load {
            dir,
            table,
            dry_run,
        }) => {
            config.merge_load_args(dir.as_deref(), table.as_deref());
            run_load(&config, dry_run, show_progress).await
        }
        Some(Command::Analyze { query, output }) => {
            config.merge_analyze_args(query.as_deref(), output.as_deref());
            run_analyze(&config, show_progress).await
        }
        None => anyhow::bail!("No subcommand given"),
    }
}

/// Stack every season file and replace the matches table.
async fn run_load(config: &Config, dry_run: bool, show_progress: bool) -> Result<()> {
    let dir = &config.local_file_paths.atp_singles;

    println!("📂 Stacking season data from {}", dir.display());
    let table = season::stack_directory(dir, show_progress)?;
    println!(
        "   {} rows x {} columns",
        table.row_count(),
        table.column_count()
    );

    if dry_run {
        println!("\n🔍 Dry run: inferred schema for {}\n", config.loader.table);
        for (name, ty) in table.columns().iter().zip(table.infer_column_types()) {
            println!("     {:<28} {}", name, ty);
        }
        println!("\n✅ Dry run complete. Database was not touched.");
        return Ok(());
    }

    println!("🔌 Connecting to database...");
    let pool = store::connect(&config.pgadmin).await?;

    println!("⬆️  Uploading all matches to {}...", config.loader.table);
    let written = store::replace_table(&pool, &config.loader.table, &table, show_progress).await?;
    pool.close().await;

    println!("\n✅ All matches uploaded: {} rows in {}", written, config.loader.table);
    Ok(())
}

/// Query hard-court aggregates, classify and write charts and reports.
async fn run_analyze(config: &Config, show_progress: bool) -> Result<()> {
    let start_time = Instant::now();
    let query_file = &config.analysis.query_file;

    let sql = std::fs::read_to_string(query_file)
        .with_context(|| format!("Failed to read SQL file: {}", query_file.display()))?;

    println!("🔌 Connecting to database...");
    let pool = store::connect(&config.pgadmin).await?;

    println!("🎾 Executing query: selecting hard court matches and aggregating stats");
    let records = store::fetch_player_aces(&pool, &sql).await?;
    pool.close().await;
    info!("Fetched {} player rows", records.len());

    println!("📐 Calculating outliers");
    let params = AnalysisParams::from(&config.analysis);
    debug!("Using {} height bucket rules", params.buckets.rules().len());
    let result = analyze(&records, &params);

    let output_dir = &config.report.output_dir;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
    let paths = OutputPaths::new(output_dir, params.min_matches);

    let all_plot = ScatterPlot {
        title: config.report.title.clone(),
        records: &result.all,
    };
    report::write_scatter_html(&all_plot, &paths.all_chart)
        .with_context(|| format!("Failed to write chart: {}", paths.all_chart.display()))?;

    let filtered_plot = ScatterPlot {
        title: format!("{} ({}+ matches)", config.report.title, params.min_matches),
        records: &result.filtered,
    };
    report::write_scatter_html(&filtered_plot, &paths.filtered_chart)
        .with_context(|| format!("Failed to write chart: {}", paths.filtered_chart.display()))?;

    let summary_all = result.summary_all();
    let summary_filtered = result.summary_filtered();

    let analysis_report = AnalysisReport {
        metadata: ReportMetadata {
            analysis_date: Utc::now(),
            query_file: query_file.display().to_string(),
            rows_fetched: records.len(),
            rows_excluded: result.excluded,
            min_height: params.min_height,
            min_matches: params.min_matches,
            upper_threshold: params.thresholds.upper,
            lower_threshold: params.thresholds.lower,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        summary_all: summary_all.clone(),
        summary_filtered: summary_filtered.clone(),
        groups: result.groups,
        records: result.all,
    };

    std::fs::write(&paths.markdown, report::generate_markdown_report(&analysis_report))
        .with_context(|| format!("Failed to write report to {}", paths.markdown.display()))?;
    std::fs::write(&paths.json, report::generate_json_report(&analysis_report)?)
        .with_context(|| format!("Failed to write report to {}", paths.json.display()))?;

    if show_progress {
        println!("\n📊 Analysis Summary:");
        println!(
            "   Players: {} valid, {} excluded (height < {})",
            summary_all.total, result.excluded, params.min_height
        );
        println!(
            "   All players:       🔴 High: {} | 🟢 Low: {} | 🔵 Normal: {}",
            summary_all.high, summary_all.low, summary_all.normal
        );
        println!(
            "   {}+ matches:      🔴 High: {} | 🟢 Low: {} | 🔵 Normal: {}",
            params.min_matches, summary_filtered.high, summary_filtered.low, summary_filtered.normal
        );
    }

    println!("\n✅ Analysis complete!");
    println!("   Chart (all):      {}", paths.all_chart.display());
    println!("   Chart (filtered): {}", paths.filtered_chart.display());
    println!("   Report:           {}", paths.markdown.display());

    Ok(())
}

//! Macrotrend CLI binary.
//!
//! Pulls BLS and FRED monthly series into a local store, computes growth and
//! rolling metrics, writes the derived views and syncs summaries.

mod integration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use integration::config::{ApiKeys, AppConfig};
use integration::pipeline::{load_series, pull_all, upload_summaries, write_outputs};
use integration::store_manager::open_store;
use macrotrend_data::{BlsClient, FirestoreClient, FredClient, ObservationStore};
use macrotrend_metrics::{
    MetricRow, MetricsEngine, Period, RollingWindow, SeriesMetrics, SourceKind, available_metrics,
};
use macrotrend_output::{MetricsIndex, MoversReport, generate_summaries};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "macrotrend")]
#[command(about = "Growth and rolling metrics for BLS and FRED monthly series", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the spike threshold from the configuration
    #[arg(long, global = true)]
    spike_threshold: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch new observations from FRED and BLS
    Pull {
        /// Re-fetch full history and drop stored periods upstream no longer publishes
        #[arg(long)]
        full: bool,
    },

    /// Compute metrics and write the table and derived views
    Compute,

    /// Show metrics for a series, a period, or the latest movers
    Show {
        /// Series id (omit for the movers report)
        series: Option<String>,

        /// Only the latest period
        #[arg(long)]
        latest: bool,

        /// Period as YYYY-MM
        #[arg(long)]
        period: Option<String>,

        /// Output format (text, markdown or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Push latest-value summaries to the document store
    Sync {
        /// Print the documents instead of uploading them
        #[arg(long)]
        dry_run: bool,
    },

    /// List stored revisions
    Revisions {
        /// Restrict to one series
        series: Option<String>,

        /// Maximum number of entries
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// List configured series
    Catalog {
        /// Filter by source (fred or bls)
        #[arg(long)]
        source: Option<String>,

        /// List the computed metrics instead
        #[arg(long)]
        metrics: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("macrotrend=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config =
        AppConfig::load(cli.config.as_deref())?.with_spike_threshold(cli.spike_threshold)?;

    match cli.command {
        Commands::Pull { full } => pull(&config, full).await?,
        Commands::Compute => compute(&config)?,
        Commands::Show {
            series,
            latest,
            period,
            format,
        } => show(&config, series, latest, period, &format)?,
        Commands::Sync { dry_run } => sync(&config, dry_run).await?,
        Commands::Revisions { series, limit } => revisions(&config, series, limit)?,
        Commands::Catalog { source, metrics } => catalog(&config, source, metrics)?,
    }

    Ok(())
}

fn progress_bar(len: u64) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn engine(config: &AppConfig) -> Result<MetricsEngine, Box<dyn std::error::Error>> {
    Ok(MetricsEngine::new(config.engine.clone())?)
}

fn compute_metrics(
    store: &ObservationStore,
    config: &AppConfig,
) -> Result<(MetricsEngine, Vec<SeriesMetrics>), Box<dyn std::error::Error>> {
    let engine = engine(config)?;
    let series = load_series(store, config)?;
    if series.is_empty() {
        return Err("No stored observations. Run `macrotrend pull` first.".into());
    }
    let metrics = engine.compute_all(&series);
    Ok((engine, metrics))
}

async fn pull(config: &AppConfig, full: bool) -> Result<(), Box<dyn std::error::Error>> {
    let keys = ApiKeys::from_env();
    let store = open_store(config)?;
    let fred = keys.fred.clone().map(FredClient::new).transpose()?;
    let bls = BlsClient::new(keys.bls.clone())?;

    println!("Store: {}", config.database_path().display());
    if !bls.is_registered() {
        println!("  BLS: unregistered (set BLS_API_KEY for higher limits)");
    }
    if full {
        println!("  Mode: Full history (replaces stored series)");
    }

    let pb = progress_bar(config.series.by_source(SourceKind::Fred).len() as u64)?;
    let summary = match pull_all(&store, fred.as_ref(), &bls, config, full, Some(&pb)).await {
        Ok(s) => {
            pb.finish_with_message(format!("Fetched {} series", s.fetched));
            s
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    println!();
    println!("  Inserted:    {}", summary.report.inserted);
    println!("  Revised:     {}", summary.report.revised);
    println!("  Unchanged:   {}", summary.report.unchanged);
    if summary.report.removed > 0 {
        println!("  Removed:     {}", summary.report.removed);
    }
    println!("  Up to date:  {}", summary.up_to_date);
    if summary.preliminary > 0 {
        println!("  Preliminary: {}", summary.preliminary);
    }
    for (id, reason) in &summary.failed {
        println!("  Failed {}: {}", id, reason);
    }

    Ok(())
}

fn compute(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config)?;
    let (engine, metrics) = compute_metrics(&store, config)?;

    let outputs = write_outputs(&engine, &metrics, config)?;
    let spikes: usize = metrics.iter().map(|m| m.spikes.len()).sum();

    println!("Computed metrics for {} series ({} spikes)", metrics.len(), spikes);
    println!("  Table: {}", outputs.table.display());
    for view in &outputs.views {
        println!("  View:  {}", view.display());
    }

    Ok(())
}

fn print_rows(windows: &[RollingWindow], rows: &[(&str, &MetricRow)]) {
    let mut header = format!(
        "{:<12} {:<8} {:>14} {:>10} {:>10}",
        "Series", "Period", "Value", "MoM", "YoY"
    );
    for window in windows {
        header.push_str(&format!(" {:>14}", window.label()));
    }
    println!("{}", header);
    println!("{}", "-".repeat(header.len()));

    let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
    for (id, row) in rows {
        let mut line = format!(
            "{:<12} {:<8} {:>14.3} {:>10} {:>10}",
            id,
            row.period.to_string(),
            row.value,
            show(row.mom_change),
            show(row.yoy_change)
        );
        for avg in &row.rolling_mom {
            line.push_str(&format!(" {:>14}", show(*avg)));
        }
        println!("{}", line);
    }
}

fn show(
    config: &AppConfig,
    series: Option<String>,
    latest: bool,
    period: Option<String>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config)?;
    let (engine, metrics) = compute_metrics(&store, config)?;
    let period = period.map(|p| p.parse::<Period>()).transpose()?;
    let format = format.to_lowercase();

    if series.is_none() && period.is_none() {
        let report = MoversReport::new(&metrics, &config.series, None)
            .ok_or("No observations to report")?;
        match format.as_str() {
            "markdown" => println!("{}", report.to_markdown()),
            "json" => println!("{}", serde_json::to_string_pretty(&report)?),
            _ => println!("{}", report.to_ascii_table()),
        }
        return Ok(());
    }

    let windows = metrics
        .first()
        .map(|m| m.windows.clone())
        .unwrap_or_default();
    let correlations = engine.correlations(&metrics);
    let index = MetricsIndex::new(metrics, correlations);

    let rows: Vec<(&str, &MetricRow)> = match (series.as_deref(), period) {
        (id, Some(period)) => index.by_period(period, id)?,
        (Some(id), None) => index
            .by_series(id, latest)?
            .into_iter()
            .map(|row| (id, row))
            .collect(),
        (None, None) => Vec::new(),
    };

    if format == "json" {
        let rows: Vec<_> = rows
            .iter()
            .map(|(id, row)| serde_json::json!({ "series_id": id, "metrics": row }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_rows(&windows, &rows);
        if let Some(id) = series.as_deref()
            && period.is_none()
        {
            let spikes = index.spikes(id)?;
            println!("\n{} spikes", spikes.len());
            for spike in spikes.iter().rev().take(5) {
                println!(
                    "  {} {} {:+.2}",
                    spike.period, spike.change_type, spike.magnitude
                );
            }
        }
    }

    Ok(())
}

async fn sync(config: &AppConfig, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config)?;
    let (_, metrics) = compute_metrics(&store, config)?;
    let documents = generate_summaries(&metrics, &config.series, config.view_precision);

    if dry_run {
        for doc in &documents {
            println!("{}", doc);
            println!("{}", serde_json::to_string_pretty(&doc.to_fields())?);
        }
        println!("\nDry run: {} documents not uploaded", documents.len());
        return Ok(());
    }

    let keys = ApiKeys::from_env();
    let client = FirestoreClient::new(&config.firestore.project_id, keys.firestore_bearer)?;
    let pb = progress_bar(documents.len() as u64)?;
    pb.set_message(format!("Uploading to {}...", config.firestore.collection));
    let uploaded =
        upload_summaries(&client, &config.firestore.collection, &documents, Some(&pb)).await;
    pb.finish_with_message(format!("Uploaded {}/{} documents", uploaded, documents.len()));

    if uploaded < documents.len() {
        return Err(format!("{} uploads failed", documents.len() - uploaded).into());
    }
    Ok(())
}

fn revisions(
    config: &AppConfig,
    series: Option<String>,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config)?;
    let stats = store.get_stats()?;
    let revisions = store.revisions(series.as_deref())?;

    println!("Store: {}", config.database_path().display());
    println!(
        "  {} observations in {} series, {} revisions, latest {}",
        stats.observations,
        stats.series,
        stats.revisions,
        stats
            .latest_period
            .map_or_else(|| "-".to_string(), |p| p.to_string())
    );
    println!();

    if revisions.is_empty() {
        println!("No revisions recorded.");
        return Ok(());
    }

    println!(
        "{:<18} {:<8} {:>14} {:>14}  {}",
        "Series", "Period", "Old", "New", "Revised at"
    );
    println!("{}", "-".repeat(80));
    for rev in revisions.iter().rev().take(limit) {
        println!(
            "{:<18} {:<8} {:>14.3} {:>14.3}  {}",
            rev.series_id,
            rev.period.to_string(),
            rev.old_value,
            rev.new_value,
            rev.revised_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

fn parse_source(name: &str) -> Result<SourceKind, Box<dyn std::error::Error>> {
    match name.to_lowercase().as_str() {
        "fred" => Ok(SourceKind::Fred),
        "bls" => Ok(SourceKind::Bls),
        _ => Err(format!("Unknown source: {}", name).into()),
    }
}

fn catalog(
    config: &AppConfig,
    source: Option<String>,
    metrics: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if metrics {
        println!("Metrics:");
        println!("========\n");
        for info in available_metrics() {
            println!("  {:<16} {:?}  {}", info.name, info.kind, info.description);
        }
        return Ok(());
    }

    let specs = match source {
        Some(name) => config.series.by_source(parse_source(&name)?),
        None => config.series.specs().iter().collect(),
    };

    println!("{:<18} {:<5} {:<8} {}", "Series", "Source", "Unit", "Name");
    println!("{}", "-".repeat(80));
    for spec in &specs {
        println!(
            "{:<18} {:<5} {:<8} {}",
            spec.id,
            spec.source.to_string(),
            spec.unit.to_string(),
            spec.name
        );
    }
    println!("\n{} series", specs.len());

    Ok(())
}

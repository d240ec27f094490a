//! Pull, compute and sync pipeline.
//!
//! Pulls are incremental: each series resumes at the month after its last
//! stored period. Re-fetched periods flow through the store's upsert, so
//! upstream corrections are applied and logged as revisions. A full pull
//! replaces each refreshed series, dropping periods upstream no longer
//! publishes.

use super::config::AppConfig;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use macrotrend_data::{
    BlsClient, DataError, FirestoreClient, FredClient, ObservationStore, UpsertReport,
};
use macrotrend_metrics::{
    MetricsEngine, MetricsError, Observation, Period, Series, SeriesMetrics, SeriesSpec,
};
use macrotrend_output::{
    ExportError, ExportFormat, Exporter, MetricsTable, SummaryDocument, ViewBuilder,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PipelineError {
    /// Fetch or storage error.
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    /// Invalid series data.
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
    /// Output error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Default number of concurrent FRED requests. The client's rate limiter
/// still spaces the requests out.
const FRED_CONCURRENCY: usize = 4;

/// What a pull did.
#[derive(Debug, Default)]
pub(crate) struct PullSummary {
    /// Combined store outcome
    pub report: UpsertReport,
    /// Series fetched successfully
    pub fetched: usize,
    /// Series already current
    pub up_to_date: usize,
    /// Series that failed, with the reason
    pub failed: Vec<(String, String)>,
    /// Observations BLS marked preliminary
    pub preliminary: usize,
}

impl PullSummary {
    fn absorb(&mut self, other: Self) {
        self.report.absorb(&other.report);
        self.fetched += other.fetched;
        self.up_to_date += other.up_to_date;
        self.failed.extend(other.failed);
        self.preliminary += other.preliminary;
    }
}

/// Write a fetched batch: replace the series on a full pull, upsert otherwise.
fn store_batch(
    store: &ObservationStore,
    observations: &[Observation],
    full: bool,
) -> Result<UpsertReport, DataError> {
    if full {
        store.replace(observations)
    } else {
        store.upsert(observations)
    }
}

/// Period of the current calendar month.
pub(crate) fn current_period() -> Period {
    Period::from(chrono::Utc::now().date_naive())
}

/// First FRED period to request for a series, or `None` when nothing newer
/// than `current` can exist.
pub(crate) fn fred_start(
    store: &ObservationStore,
    series_id: &str,
    config: &AppConfig,
    full: bool,
    current: Period,
) -> Result<Option<Period>, PipelineError> {
    let start = if full {
        config.fred_start
    } else {
        store
            .last_period(series_id)?
            .map_or(config.fred_start, |p| p.next())
    };
    Ok((start <= current).then_some(start))
}

/// First BLS year to request. Incremental pulls re-read the year of the
/// oldest last-stored period so that revisions within it are picked up.
pub(crate) fn bls_start_year(
    store: &ObservationStore,
    specs: &[&SeriesSpec],
    config: &AppConfig,
    full: bool,
) -> Result<i32, PipelineError> {
    if full {
        return Ok(config.bls_start_year);
    }
    let mut start = None::<i32>;
    for spec in specs {
        let year = store
            .last_period(&spec.id)?
            .map_or(config.bls_start_year, |p| p.year());
        start = Some(start.map_or(year, |s| s.min(year)));
    }
    Ok(start.unwrap_or(config.bls_start_year))
}

/// Pull FRED series into the store.
pub(crate) async fn pull_fred(
    store: &ObservationStore,
    client: &FredClient,
    specs: &[&SeriesSpec],
    config: &AppConfig,
    full: bool,
    progress: Option<&ProgressBar>,
) -> Result<PullSummary, PipelineError> {
    let current = current_period();
    let mut summary = PullSummary::default();
    let mut jobs = Vec::new();
    for spec in specs {
        match fred_start(store, &spec.id, config, full, current)? {
            Some(start) => jobs.push((spec.id.clone(), start)),
            None => summary.up_to_date += 1,
        }
    }

    if let Some(pb) = progress {
        pb.set_length(specs.len() as u64);
        pb.set_position(summary.up_to_date as u64);
        pb.set_message(format!("Fetching {} FRED series...", jobs.len()));
    }

    let results: Vec<(String, Result<Vec<Observation>, DataError>)> = stream::iter(jobs)
        .map(|(id, start)| async move {
            let fetched = client.fetch_observations(&id, start).await;
            (id, fetched)
        })
        .buffer_unordered(FRED_CONCURRENCY)
        .inspect(|_| {
            if let Some(pb) = progress {
                pb.inc(1);
            }
        })
        .collect()
        .await;

    for (id, fetched) in results {
        match fetched {
            Ok(observations) => {
                summary.report.absorb(&store_batch(store, &observations, full)?);
                summary.fetched += 1;
            }
            Err(e) => {
                warn!(series = %id, error = %e, "FRED fetch failed");
                summary.failed.push((id, e.to_string()));
            }
        }
    }

    info!(
        fetched = summary.fetched,
        failed = summary.failed.len(),
        "FRED pull finished"
    );
    Ok(summary)
}

/// Pull BLS series into the store in as few requests as the API allows.
pub(crate) async fn pull_bls(
    store: &ObservationStore,
    client: &BlsClient,
    specs: &[&SeriesSpec],
    config: &AppConfig,
    full: bool,
) -> Result<PullSummary, PipelineError> {
    let mut summary = PullSummary::default();
    if specs.is_empty() {
        return Ok(summary);
    }

    let end_year = current_period().year();
    let start_year = bls_start_year(store, specs, config, full)?.min(end_year);
    let ids: Vec<String> = specs.iter().map(|s| s.id.clone()).collect();

    let published = client.fetch(&ids, start_year, end_year).await?;
    summary.preliminary = published.iter().filter(|o| o.preliminary).count();
    let observations: Vec<Observation> = published.into_iter().map(|o| o.observation).collect();

    summary.fetched = ids
        .iter()
        .filter(|id| observations.iter().any(|o| &o.series_id == *id))
        .count();
    summary.report = store_batch(store, &observations, full)?;

    info!(
        start_year,
        end_year,
        series = summary.fetched,
        preliminary = summary.preliminary,
        "BLS pull finished"
    );
    Ok(summary)
}

/// Pull every configured source.
pub(crate) async fn pull_all(
    store: &ObservationStore,
    fred: Option<&FredClient>,
    bls: &BlsClient,
    config: &AppConfig,
    full: bool,
    progress: Option<&ProgressBar>,
) -> Result<PullSummary, PipelineError> {
    use macrotrend_metrics::SourceKind;

    let mut summary = PullSummary::default();
    let fred_specs = config.series.by_source(SourceKind::Fred);
    match fred {
        Some(client) => {
            summary.absorb(pull_fred(store, client, &fred_specs, config, full, progress).await?);
        }
        None if !fred_specs.is_empty() => {
            warn!("FRED_API_KEY not set, skipping {} FRED series", fred_specs.len());
        }
        None => {}
    }

    let bls_specs = config.series.by_source(SourceKind::Bls);
    match pull_bls(store, bls, &bls_specs, config, full).await {
        Ok(bls_summary) => summary.absorb(bls_summary),
        Err(e) => {
            warn!(error = %e, "BLS pull failed");
            summary
                .failed
                .extend(bls_specs.iter().map(|s| (s.id.clone(), e.to_string())));
        }
    }
    Ok(summary)
}

/// Load every configured series that has stored observations.
pub(crate) fn load_series(
    store: &ObservationStore,
    config: &AppConfig,
) -> Result<Vec<Series>, PipelineError> {
    let mut out = Vec::new();
    for spec in config.series.specs() {
        let series = store.load_series(spec)?;
        if series.is_empty() {
            continue;
        }
        out.push(series);
    }
    Ok(out)
}

/// Files written by [`write_outputs`].
#[derive(Debug)]
pub(crate) struct Outputs {
    /// Flat metrics table
    pub table: PathBuf,
    /// Derived views
    pub views: Vec<PathBuf>,
}

/// Write the metrics table and the derived views under the data directory.
pub(crate) fn write_outputs(
    engine: &MetricsEngine,
    metrics: &[SeriesMetrics],
    config: &AppConfig,
) -> Result<Outputs, PipelineError> {
    std::fs::create_dir_all(&config.data_dir).map_err(ExportError::from)?;
    let table = config.data_dir.join("metrics.csv");
    MetricsTable::from_metrics(metrics)?
        .with_precision(config.table_precision)
        .export_to_file(&table, ExportFormat::Csv)?;

    let views = ViewBuilder::new(engine, metrics)
        .with_precision(config.view_precision)
        .write_all(&config.views_dir())?;

    Ok(Outputs { table, views })
}

/// Push summary documents to the document store. Returns how many were
/// written; failures are logged and skipped.
pub(crate) async fn upload_summaries(
    client: &FirestoreClient,
    collection: &str,
    documents: &[SummaryDocument],
    progress: Option<&ProgressBar>,
) -> usize {
    let mut uploaded = 0;
    for doc in documents {
        match client
            .patch_document(collection, &doc.series_id, &doc.to_fields())
            .await
        {
            Ok(()) => uploaded += 1,
            Err(e) => warn!(series = %doc.series_id, error = %e, "upload failed"),
        }
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }
    uploaded
}

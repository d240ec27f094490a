//! Read-only lookups over computed metrics.

use macrotrend_metrics::{LagCorrelations, MetricRow, Period, SeriesMetrics, Spike};
use std::collections::HashMap;
use thiserror::Error;

/// Errors returned by [`MetricsIndex`] lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No metrics were indexed for the series.
    #[error("Unknown series: {0}")]
    UnknownSeries(String),

    /// No series has an observation at the period.
    #[error("No observations for period {0}")]
    UnknownPeriod(Period),

    /// No correlations were indexed for the pair.
    #[error("No correlation between {base} and {target}")]
    UnknownPair {
        /// Base series
        base: String,
        /// Target series
        target: String,
    },
}

/// Result type for lookups.
pub type LookupResult<T> = std::result::Result<T, LookupError>;

/// Immutable index of computed metrics keyed by series id.
#[derive(Debug, Clone, Default)]
pub struct MetricsIndex {
    series: HashMap<String, SeriesMetrics>,
    correlations: HashMap<(String, String), LagCorrelations>,
}

impl MetricsIndex {
    /// Index metrics and, optionally, their correlation matrix.
    pub fn new(metrics: Vec<SeriesMetrics>, correlations: Vec<LagCorrelations>) -> Self {
        Self {
            series: metrics
                .into_iter()
                .map(|m| (m.series_id.clone(), m))
                .collect(),
            correlations: correlations
                .into_iter()
                .map(|c| ((c.base.clone(), c.target.clone()), c))
                .collect(),
        }
    }

    /// Indexed series ids, sorted.
    pub fn series_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.series.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of indexed series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    fn get(&self, series_id: &str) -> LookupResult<&SeriesMetrics> {
        self.series
            .get(series_id)
            .ok_or_else(|| LookupError::UnknownSeries(series_id.to_string()))
    }

    /// Rows of one series, ascending by period. With `latest_only` the
    /// result holds at most the latest row.
    pub fn by_series(&self, series_id: &str, latest_only: bool) -> LookupResult<Vec<&MetricRow>> {
        let metrics = self.get(series_id)?;
        if latest_only {
            Ok(metrics.latest().into_iter().collect())
        } else {
            Ok(metrics.rows.iter().collect())
        }
    }

    /// Rows at one period, sorted by series id, optionally restricted to
    /// one series.
    pub fn by_period<'a>(
        &'a self,
        period: Period,
        series_id: Option<&'a str>,
    ) -> LookupResult<Vec<(&'a str, &'a MetricRow)>> {
        let rows: Vec<(&'a str, &'a MetricRow)> = match series_id {
            Some(id) => self
                .get(id)?
                .row(period)
                .map(|row| (id, row))
                .into_iter()
                .collect(),
            None => {
                let mut rows: Vec<_> = self
                    .series
                    .values()
                    .filter_map(|m| m.row(period).map(|row| (m.series_id.as_str(), row)))
                    .collect();
                rows.sort_unstable_by_key(|(id, _)| *id);
                rows
            }
        };
        if rows.is_empty() {
            return Err(LookupError::UnknownPeriod(period));
        }
        Ok(rows)
    }

    /// Flagged changes of one series.
    pub fn spikes(&self, series_id: &str) -> LookupResult<&[Spike]> {
        Ok(&self.get(series_id)?.spikes)
    }

    /// Lag correlations of one ordered pair.
    pub fn correlation(&self, base: &str, target: &str) -> LookupResult<&LagCorrelations> {
        self.correlations
            .get(&(base.to_string(), target.to_string()))
            .ok_or_else(|| LookupError::UnknownPair {
                base: base.to_string(),
                target: target.to_string(),
            })
    }
}

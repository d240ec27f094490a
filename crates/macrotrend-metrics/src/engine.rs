//! Metrics engine.
//!
//! The engine is a pure function from a [`Series`] to its derived metrics.
//! It holds only validated configuration, so the same engine may be shared
//! across threads and every computation is reproducible bit for bit.

use crate::change::{ChangeUnit, MetricPoint, mom_change, yoy_change};
use crate::config::EngineConfig;
use crate::correlation::{LagCorrelations, correlation_matrix};
use crate::error::Result;
use crate::period::Period;
use crate::rolling::{RollingWindow, rolling_mean};
use crate::series::Series;
use crate::spikes::{Spike, detect_spikes};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Derived metrics for one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Observation period
    pub period: Period,
    /// Observed value
    pub value: f64,
    /// Change against the previous calendar month
    pub mom_change: Option<f64>,
    /// Change against the same month a year earlier
    pub yoy_change: Option<f64>,
    /// Rolling MoM averages, one per configured window in the same order
    pub rolling_mom: Vec<Option<f64>>,
}

/// All derived metrics of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetrics {
    /// Series identifier
    pub series_id: String,
    /// Unit the changes are expressed in
    pub unit: ChangeUnit,
    /// Rolling windows, matching `MetricRow::rolling_mom`
    pub windows: Vec<RollingWindow>,
    /// One row per observation, ascending by period
    pub rows: Vec<MetricRow>,
    /// Flagged MoM and YoY changes
    pub spikes: Vec<Spike>,
}

impl SeriesMetrics {
    /// Row for a period.
    pub fn row(&self, period: Period) -> Option<&MetricRow> {
        self.rows
            .binary_search_by_key(&period, |r| r.period)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Row of the latest observation.
    pub fn latest(&self) -> Option<&MetricRow> {
        self.rows.last()
    }

    /// MoM change as a point sequence.
    pub fn mom_points(&self) -> Vec<MetricPoint> {
        self.rows
            .iter()
            .map(|r| MetricPoint::new(r.period, r.mom_change))
            .collect()
    }

    /// YoY change as a point sequence.
    pub fn yoy_points(&self) -> Vec<MetricPoint> {
        self.rows
            .iter()
            .map(|r| MetricPoint::new(r.period, r.yoy_change))
            .collect()
    }

    /// Rolling MoM average for one configured window.
    pub fn rolling_points(&self, window: RollingWindow) -> Option<Vec<MetricPoint>> {
        let slot = self.windows.iter().position(|w| *w == window)?;
        Some(
            self.rows
                .iter()
                .map(|r| MetricPoint::new(r.period, r.rolling_mom[slot]))
                .collect(),
        )
    }

    /// Rolling MoM average of a row for one configured window.
    pub fn rolling_at(&self, row: &MetricRow, window: RollingWindow) -> Option<f64> {
        let slot = self.windows.iter().position(|w| *w == window)?;
        row.rolling_mom.get(slot).copied().flatten()
    }
}

/// Computes change, rolling and spike metrics for series.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    config: EngineConfig,
}

impl MetricsEngine {
    /// Create an engine. Invalid configuration is rejected here, never
    /// during computation.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute every metric of one series.
    pub fn compute(&self, series: &Series) -> SeriesMetrics {
        let eps = self.config.zero_epsilon;
        let mom = mom_change(series, eps);
        let yoy = yoy_change(series, eps);
        let rolling: Vec<Vec<MetricPoint>> = self
            .config
            .windows
            .iter()
            .map(|w| rolling_mean(&mom, *w))
            .collect();
        let spikes = detect_spikes(&mom, &yoy, self.config.spike_threshold);

        let rows = series
            .iter()
            .enumerate()
            .map(|(i, (period, value))| MetricRow {
                period,
                value,
                mom_change: mom[i].value,
                yoy_change: yoy[i].value,
                rolling_mom: rolling.iter().map(|r| r[i].value).collect(),
            })
            .collect();

        debug!(
            series = series.id(),
            observations = series.len(),
            spikes = spikes.len(),
            "computed metrics"
        );

        SeriesMetrics {
            series_id: series.id().to_string(),
            unit: series.unit(),
            windows: self.config.windows.clone(),
            rows,
            spikes,
        }
    }

    /// Compute many series independently and in parallel. Output order
    /// follows input order.
    pub fn compute_all(&self, series: &[Series]) -> Vec<SeriesMetrics> {
        let out: Vec<SeriesMetrics> = series.par_iter().map(|s| self.compute(s)).collect();
        info!(series = out.len(), "computed metrics for all series");
        out
    }

    /// Lagged MoM correlations between every ordered pair of series.
    pub fn correlations(&self, metrics: &[SeriesMetrics]) -> Vec<LagCorrelations> {
        correlation_matrix(metrics, self.config.correlation_max_lag)
    }

    /// Smooth an arbitrary change sequence with a trailing window.
    pub fn smooth(&self, points: &[MetricPoint], window: RollingWindow) -> Vec<MetricPoint> {
        rolling_mean(points, window)
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeType;
    use approx::assert_relative_eq;

    fn series(values: &[f64]) -> Series {
        let start = Period::new(2022, 1).unwrap();
        Series::from_points(
            "CPIAUCSL",
            ChangeUnit::Relative,
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (start.offset(i as i64), *v)),
        )
        .unwrap()
    }

    #[test]
    fn test_compute_rows() {
        let engine =
            MetricsEngine::new(EngineConfig::default().with_windows(&[2]).unwrap()).unwrap();
        let m = engine.compute(&series(&[100.0, 105.0, 110.25]));
        assert_eq!(m.rows.len(), 3);
        assert_eq!(m.rows[0].mom_change, None);
        assert_relative_eq!(m.rows[1].mom_change.unwrap(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(m.rows[2].rolling_mom[0].unwrap(), 5.0, epsilon = 1e-12);
        assert!(m.rows.iter().all(|r| r.yoy_change.is_none()));
        assert_eq!(m.spikes.len(), 2);
        assert!(m.spikes.iter().all(|s| s.change_type == ChangeType::Mom));
    }

    #[test]
    fn test_row_lookup_and_rolling_access() {
        let engine = MetricsEngine::default();
        let m = engine.compute(&series(&[1.0, 2.0, 3.0]));
        let feb = Period::new(2022, 2).unwrap();
        assert_eq!(m.row(feb).unwrap().value, 2.0);
        assert!(m.row(Period::new(2030, 1).unwrap()).is_none());
        assert_eq!(m.latest().unwrap().value, 3.0);

        let twelve = m.rolling_points(RollingWindow::TWELVE_MONTHS).unwrap();
        assert_eq!(twelve.len(), 3);
        assert!(m.rolling_points(RollingWindow::new(5).unwrap()).is_none());
        let row = m.latest().unwrap();
        assert_eq!(
            m.rolling_at(row, RollingWindow::TWELVE_MONTHS),
            twelve[2].value
        );
    }

    #[test]
    fn test_compute_all_preserves_order() {
        let a = series(&[1.0, 2.0]);
        let b = Series::from_points(
            "UNRATE",
            ChangeUnit::Absolute,
            [(Period::new(2022, 1).unwrap(), 4.0)],
        )
        .unwrap();
        let out = MetricsEngine::default().compute_all(&[b, a]);
        assert_eq!(out[0].series_id, "UNRATE");
        assert_eq!(out[1].series_id, "CPIAUCSL");
    }

    #[test]
    fn test_empty_series() {
        let m = MetricsEngine::default().compute(&Series::new("EMPTY", ChangeUnit::Relative));
        assert!(m.rows.is_empty());
        assert!(m.spikes.is_empty());
        assert!(m.latest().is_none());
    }
}

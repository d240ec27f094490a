//! Derived JSON views for the serving layer.
//!
//! Each view is a plain JSON document written to `<name>.json`. Values are
//! rounded here and nowhere earlier.

use crate::export::{ExportError, round_to};
use macrotrend_metrics::{LagCorrelations, MetricPoint, MetricsEngine, RollingWindow, SeriesMetrics};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Decimal places for change views.
pub const VIEW_PRECISION: u32 = 2;

/// Decimal places for correlation coefficients.
pub const CORRELATION_PRECISION: u32 = 3;

/// Builds the derived views from computed metrics.
#[derive(Debug)]
pub struct ViewBuilder<'a> {
    engine: &'a MetricsEngine,
    metrics: &'a [SeriesMetrics],
    correlations: Vec<LagCorrelations>,
    precision: u32,
    smoothing: RollingWindow,
}

impl<'a> ViewBuilder<'a> {
    /// Create a builder. Correlations are computed once, up front.
    pub fn new(engine: &'a MetricsEngine, metrics: &'a [SeriesMetrics]) -> Self {
        Self {
            engine,
            metrics,
            correlations: engine.correlations(metrics),
            precision: VIEW_PRECISION,
            smoothing: RollingWindow::THREE_MONTHS,
        }
    }

    /// Decimal places for change views (default: 2).
    pub const fn with_precision(mut self, digits: u32) -> Self {
        self.precision = digits;
        self
    }

    fn round(&self, value: Option<f64>) -> Value {
        value
            .map(|v| Value::from(round_to(v, self.precision)))
            .unwrap_or(Value::Null)
    }

    /// `period -> series -> {MoM, YoY}`, listing a series at a period only
    /// when at least one change is defined.
    pub fn trends(&self) -> Value {
        let mut by_period: Map<String, Value> = Map::new();
        let mut periods: Vec<_> = self
            .metrics
            .iter()
            .flat_map(|m| m.rows.iter().map(|r| r.period))
            .collect();
        periods.sort_unstable();
        periods.dedup();
        for period in &periods {
            by_period.insert(period.to_string(), Value::Object(Map::new()));
        }

        for m in self.metrics {
            for row in &m.rows {
                if row.mom_change.is_none() && row.yoy_change.is_none() {
                    continue;
                }
                if let Some(Value::Object(entry)) = by_period.get_mut(&row.period.to_string()) {
                    entry.insert(
                        m.series_id.clone(),
                        json!({
                            "MoM": self.round(row.mom_change),
                            "YoY": self.round(row.yoy_change),
                        }),
                    );
                }
            }
        }
        Value::Object(by_period)
    }

    /// `series -> [{Date, MoM, YoY}]` over every observation.
    pub fn trendlines(&self) -> Value {
        let series = self
            .metrics
            .iter()
            .map(|m| {
                let points = m
                    .rows
                    .iter()
                    .map(|r| {
                        json!({
                            "Date": r.period,
                            "MoM": self.round(r.mom_change),
                            "YoY": self.round(r.yoy_change),
                        })
                    })
                    .collect();
                (m.series_id.clone(), Value::Array(points))
            })
            .collect();
        Value::Object(series)
    }

    /// `series -> [{Date, Type, Change}]`.
    pub fn spikes(&self) -> Value {
        let series = self
            .metrics
            .iter()
            .map(|m| {
                let spikes = m
                    .spikes
                    .iter()
                    .map(|s| {
                        json!({
                            "Date": s.period,
                            "Type": s.change_type,
                            "Change": round_to(s.magnitude, self.precision),
                        })
                    })
                    .collect();
                (m.series_id.clone(), Value::Array(spikes))
            })
            .collect();
        Value::Object(series)
    }

    /// `series -> [{Date, MoM_3mo_avg, YoY_3mo_avg}]`, skipping periods
    /// where neither average is defined.
    pub fn rolling(&self) -> Value {
        let label = self.smoothing.months();
        let series = self
            .metrics
            .iter()
            .map(|m| {
                let mom = self.engine.smooth(&m.mom_points(), self.smoothing);
                let yoy = self.engine.smooth(&m.yoy_points(), self.smoothing);
                let points = mom
                    .iter()
                    .zip(&yoy)
                    .filter(|(a, b)| a.value.is_some() || b.value.is_some())
                    .map(|(a, b)| {
                        let mut point = Map::new();
                        point.insert("Date".into(), Value::from(a.period.to_string()));
                        point.insert(format!("MoM_{label}mo_avg"), self.round(a.value));
                        point.insert(format!("YoY_{label}mo_avg"), self.round(b.value));
                        Value::Object(point)
                    })
                    .collect();
                (m.series_id.clone(), Value::Array(points))
            })
            .collect();
        Value::Object(series)
    }

    /// `series -> [{Date, Value}]` for one configured MoM window, defined
    /// periods only. `None` when the window was not computed.
    pub fn rolling_window(&self, window: RollingWindow) -> Option<Value> {
        let mut series = Map::new();
        for m in self.metrics {
            let points: Vec<MetricPoint> = m.rolling_points(window)?;
            let points = points
                .iter()
                .filter(|p| p.value.is_some())
                .map(|p| json!({ "Date": p.period, "Value": self.round(p.value) }))
                .collect();
            series.insert(m.series_id.clone(), Value::Array(points));
        }
        Some(Value::Object(series))
    }

    /// `base -> target -> {lag_0 .. lag_n}`.
    pub fn correlations(&self) -> Value {
        let mut by_base: Map<String, Value> = Map::new();
        for c in &self.correlations {
            let lags: Map<String, Value> = c
                .by_lag
                .iter()
                .enumerate()
                .map(|(lag, r)| {
                    let r = r
                        .map(|r| Value::from(round_to(r, CORRELATION_PRECISION)))
                        .unwrap_or(Value::Null);
                    (format!("lag_{lag}"), r)
                })
                .collect();
            if let Value::Object(targets) = by_base
                .entry(c.base.clone())
                .or_insert_with(|| Value::Object(Map::new()))
            {
                targets.insert(c.target.clone(), Value::Object(lags));
            }
        }
        Value::Object(by_base)
    }

    /// Every view with its file stem.
    pub fn views(&self) -> Vec<(String, Value)> {
        let mut views = vec![
            ("trends".to_string(), self.trends()),
            ("trendlines".to_string(), self.trendlines()),
            ("spikes".to_string(), self.spikes()),
            ("rolling".to_string(), self.rolling()),
        ];
        for window in &self.engine.config().windows {
            if let Some(view) = self.rolling_window(*window) {
                views.push((format!("rolling_{window}"), view));
            }
        }
        views.push(("correlations".to_string(), self.correlations()));
        views
    }

    /// Write every view as pretty JSON into `dir`, creating it if needed.
    pub fn write_all(&self, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for (name, view) in self.views() {
            let path = dir.join(format!("{name}.json"));
            fs::write(&path, serde_json::to_string_pretty(&view)?)?;
            written.push(path);
        }
        info!(dir = %dir.display(), views = written.len(), "wrote derived views");
        Ok(written)
    }
}

//! Export of computed metrics.
//!
//! Metrics have two interchangeable layouts. A [`MetricsTable`] is flat:
//! one row per `(series_id, period)` with a column per metric. A
//! [`NestedMetrics`] groups the same rows by series. Either converts into
//! the other by reshaping alone.
//!
//! Values are kept at full precision in memory and rounded only when
//! written out.

use macrotrend_metrics::{MetricsError, Period, RollingWindow, SeriesMetrics};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Decimal places used when writing metric tables.
pub const TABLE_PRECISION: u32 = 4;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// DataFrame construction error.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Invalid metric data.
    #[error("Invalid metrics: {0}")]
    Metrics(#[from] MetricsError),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty" | "pretty-json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits as i32);
    let rounded = (value * scale).round() / scale;
    // avoid writing "-0"
    if rounded == 0.0 { 0.0 } else { rounded }
}

fn rounded_json(value: Option<f64>, digits: u32) -> Value {
    value
        .map(|v| Value::from(round_to(v, digits)))
        .unwrap_or(Value::Null)
}

fn rounded_cell(value: Option<f64>, digits: u32) -> String {
    value
        .map(|v| round_to(v, digits).to_string())
        .unwrap_or_default()
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// One row of the flat layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Series identifier.
    pub series_id: String,

    /// Observation period.
    pub period: Period,

    /// Observed value.
    pub value: f64,

    /// Month-over-month change.
    pub mom_change: Option<f64>,

    /// Year-over-year change.
    pub yoy_change: Option<f64>,

    /// Rolling MoM averages, one per table window.
    pub rolling_mom: Vec<Option<f64>>,
}

/// Flat metrics table keyed by `(series_id, period)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsTable {
    /// Rolling windows, in column order.
    pub windows: Vec<RollingWindow>,

    /// Rows sorted by series id then period.
    pub rows: Vec<TableRow>,

    /// Decimal places used on export.
    #[serde(skip, default = "default_precision")]
    pub precision: u32,
}

const fn default_precision() -> u32 {
    TABLE_PRECISION
}

impl MetricsTable {
    /// Flatten computed metrics. Every series must use the same windows.
    pub fn from_metrics(metrics: &[SeriesMetrics]) -> Result<Self, ExportError> {
        let windows = metrics.first().map(|m| m.windows.clone()).unwrap_or_default();
        if let Some(odd) = metrics.iter().find(|m| m.windows != windows) {
            return Err(ExportError::InvalidFormat(format!(
                "series {} uses different rolling windows",
                odd.series_id
            )));
        }

        let mut rows: Vec<TableRow> = metrics
            .iter()
            .flat_map(|m| {
                m.rows.iter().map(move |r| TableRow {
                    series_id: m.series_id.clone(),
                    period: r.period,
                    value: r.value,
                    mom_change: r.mom_change,
                    yoy_change: r.yoy_change,
                    rolling_mom: r.rolling_mom.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| (&a.series_id, a.period).cmp(&(&b.series_id, b.period)));

        Ok(Self {
            windows,
            rows,
            precision: TABLE_PRECISION,
        })
    }

    /// Use a different number of decimal places on export.
    pub const fn with_precision(mut self, digits: u32) -> Self {
        self.precision = digits;
        self
    }

    /// Column names in order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = ["series_id", "period", "value", "mom_change", "yoy_change"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        columns.extend(self.windows.iter().map(RollingWindow::label));
        columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Regroup rows by series.
    pub fn to_nested(&self) -> NestedMetrics {
        let mut series: BTreeMap<String, Vec<NestedEntry>> = BTreeMap::new();
        for row in &self.rows {
            let mut metrics = BTreeMap::new();
            metrics.insert("mom_change".to_string(), row.mom_change);
            metrics.insert("yoy_change".to_string(), row.yoy_change);
            for (window, avg) in self.windows.iter().zip(&row.rolling_mom) {
                metrics.insert(window.label(), *avg);
            }
            series.entry(row.series_id.clone()).or_default().push(NestedEntry {
                period: row.period,
                value: row.value,
                metrics,
            });
        }
        NestedMetrics {
            windows: self.windows.clone(),
            series,
            precision: self.precision,
        }
    }

    fn row_json(&self, row: &TableRow) -> Value {
        let mut object = Map::new();
        object.insert("series_id".into(), Value::from(row.series_id.clone()));
        object.insert("period".into(), Value::from(row.period.to_string()));
        object.insert("value".into(), Value::from(row.value));
        object.insert("mom_change".into(), rounded_json(row.mom_change, self.precision));
        object.insert("yoy_change".into(), rounded_json(row.yoy_change, self.precision));
        for (window, avg) in self.windows.iter().zip(&row.rolling_mom) {
            object.insert(window.label(), rounded_json(*avg, self.precision));
        }
        Value::Object(object)
    }
}

impl Exporter for MetricsTable {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(self.columns())?;
                for row in &self.rows {
                    let mut record = vec![
                        row.series_id.clone(),
                        row.period.to_string(),
                        row.value.to_string(),
                        rounded_cell(row.mom_change, self.precision),
                        rounded_cell(row.yoy_change, self.precision),
                    ];
                    record.extend(
                        row.rolling_mom
                            .iter()
                            .map(|avg| rounded_cell(*avg, self.precision)),
                    );
                    wtr.write_record(&record)?;
                }
                let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
                String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
            }
            ExportFormat::Json | ExportFormat::PrettyJson => {
                let rows = Value::Array(self.rows.iter().map(|r| self.row_json(r)).collect());
                if format == ExportFormat::Json {
                    Ok(serde_json::to_string(&rows)?)
                } else {
                    Ok(serde_json::to_string_pretty(&rows)?)
                }
            }
        }
    }
}

/// One period of one series in the nested layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedEntry {
    /// Observation period.
    pub period: Period,

    /// Observed value.
    pub value: f64,

    /// Metrics by column name; `None` when undefined.
    pub metrics: BTreeMap<String, Option<f64>>,
}

/// Metrics grouped per series: `series_id -> [entry]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedMetrics {
    /// Rolling windows present in every entry.
    pub windows: Vec<RollingWindow>,

    /// Entries by series, ascending by period.
    pub series: BTreeMap<String, Vec<NestedEntry>>,

    /// Decimal places used on export.
    #[serde(skip, default = "default_precision")]
    pub precision: u32,
}

impl NestedMetrics {
    /// Flatten back into a table.
    pub fn to_table(&self) -> MetricsTable {
        let rows = self
            .series
            .iter()
            .flat_map(|(series_id, entries)| {
                entries.iter().map(move |e| TableRow {
                    series_id: series_id.clone(),
                    period: e.period,
                    value: e.value,
                    mom_change: e.metrics.get("mom_change").copied().flatten(),
                    yoy_change: e.metrics.get("yoy_change").copied().flatten(),
                    rolling_mom: self
                        .windows
                        .iter()
                        .map(|w| e.metrics.get(&w.label()).copied().flatten())
                        .collect(),
                })
            })
            .collect();
        MetricsTable {
            windows: self.windows.clone(),
            rows,
            precision: self.precision,
        }
    }

    fn rounded(&self) -> Value {
        let series: Map<String, Value> = self
            .series
            .iter()
            .map(|(id, entries)| {
                let entries = entries
                    .iter()
                    .map(|e| {
                        let metrics: Map<String, Value> = e
                            .metrics
                            .iter()
                            .map(|(k, v)| (k.clone(), rounded_json(*v, self.precision)))
                            .collect();
                        serde_json::json!({
                            "period": e.period,
                            "value": e.value,
                            "metrics": metrics,
                        })
                    })
                    .collect();
                (id.clone(), Value::Array(entries))
            })
            .collect();
        Value::Object(series)
    }
}

impl Exporter for NestedMetrics {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => self.to_table().export_to_string(format),
            ExportFormat::Json => Ok(serde_json::to_string(&self.rounded())?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(&self.rounded())?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrotrend_metrics::{ChangeUnit, EngineConfig, MetricsEngine, Series};
    use rstest::rstest;

    fn metrics() -> Vec<SeriesMetrics> {
        let engine =
            MetricsEngine::new(EngineConfig::default().with_windows(&[2]).unwrap()).unwrap();
        let start = Period::new(2024, 1).unwrap();
        let unrate = Series::from_points(
            "UNRATE",
            ChangeUnit::Absolute,
            [(start, 4.0), (start.next(), 4.2), (start.offset(2), 4.1)],
        )
        .unwrap();
        let cpi = Series::from_points(
            "CPIAUCSL",
            ChangeUnit::Relative,
            [(start, 300.0), (start.next(), 303.0)],
        )
        .unwrap();
        engine.compute_all(&[unrate, cpi])
    }

    #[rstest]
    #[case(1.23456, 2, 1.23)]
    #[case(1.235001, 2, 1.24)]
    #[case(-0.00001, 2, 0.0)]
    #[case(5.0, 4, 5.0)]
    fn test_round_to(#[case] value: f64, #[case] digits: u32, #[case] expected: f64) {
        assert_eq!(round_to(value, digits), expected);
        assert!(round_to(value, digits).is_sign_positive() || expected < 0.0);
    }

    #[test]
    fn test_table_is_sorted_by_key() {
        let table = MetricsTable::from_metrics(&metrics()).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.rows[0].series_id, "CPIAUCSL");
        assert_eq!(table.rows[2].series_id, "UNRATE");
        assert_eq!(
            table.columns(),
            vec!["series_id", "period", "value", "mom_change", "yoy_change", "mom_2mo_avg"]
        );
    }

    #[test]
    fn test_csv_leaves_undefined_cells_empty() {
        let table = MetricsTable::from_metrics(&metrics()).unwrap();
        let csv = table.export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "series_id,period,value,mom_change,yoy_change,mom_2mo_avg");
        assert_eq!(lines[1], "CPIAUCSL,2024-01,300,,,");
        assert_eq!(lines[2], "CPIAUCSL,2024-02,303,1,,1");
        assert_eq!(lines[4], "UNRATE,2024-02,4.2,0.2,,0.2");
    }

    #[test]
    fn test_json_rows_use_null() {
        let table = MetricsTable::from_metrics(&metrics()).unwrap();
        let json: Value =
            serde_json::from_str(&table.export_to_string(ExportFormat::Json).unwrap()).unwrap();
        assert_eq!(json[0]["mom_change"], Value::Null);
        assert_eq!(json[1]["mom_change"], 1.0);
        assert_eq!(json[4]["mom_change"], -0.1);
    }

    #[test]
    fn test_reshape_both_ways() {
        let table = MetricsTable::from_metrics(&metrics()).unwrap();
        let nested = table.to_nested();
        assert_eq!(nested.series.len(), 2);
        assert_eq!(nested.series["UNRATE"].len(), 3);
        assert_eq!(nested.to_table(), table);
    }

    #[test]
    fn test_mismatched_windows_rejected() {
        let mut m = metrics();
        m[1].windows.clear();
        assert!(matches!(
            MetricsTable::from_metrics(&m),
            Err(ExportError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_nested_json_shape() {
        let nested = MetricsTable::from_metrics(&metrics())
            .unwrap()
            .with_precision(2)
            .to_nested();
        let json: Value =
            serde_json::from_str(&nested.export_to_string(ExportFormat::Json).unwrap()).unwrap();
        let feb = &json["UNRATE"][1];
        assert_eq!(feb["period"], "2024-02");
        assert_eq!(feb["metrics"]["mom_change"], 0.2);
        assert_eq!(feb["metrics"]["yoy_change"], Value::Null);
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    #[case("pretty", ExportFormat::PrettyJson)]
    fn test_format_from_str(#[case] input: &str, #[case] expected: ExportFormat) {
        assert_eq!(input.parse::<ExportFormat>().unwrap(), expected);
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}

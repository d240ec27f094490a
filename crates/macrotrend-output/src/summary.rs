//! Latest-value summary documents.
//!
//! One compact document per series, holding its latest observation and the
//! metrics at that period. These are what get pushed to the document store.

use crate::export::round_to;
use chrono::{DateTime, Utc};
use macrotrend_metrics::{ChangeUnit, Period, SeriesCatalog, SeriesMetrics};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Latest observation of a series with its metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDocument {
    /// Series identifier.
    pub series_id: String,

    /// Human readable series name.
    pub series_name: String,

    /// Unit of the changes.
    pub unit: ChangeUnit,

    /// Latest period.
    pub date: Period,

    /// Latest value.
    pub value: f64,

    /// MoM change at the latest period.
    pub mom_change: Option<f64>,

    /// YoY change at the latest period.
    pub yoy_change: Option<f64>,

    /// Rolling MoM averages by column name.
    pub rolling: BTreeMap<String, Option<f64>>,

    /// When the document was built.
    pub upload_timestamp: DateTime<Utc>,
}

impl SummaryDocument {
    /// Flat field map, as stored remotely. Undefined metrics are `null`.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("series_id".into(), Value::from(self.series_id.clone()));
        fields.insert("series_name".into(), Value::from(self.series_name.clone()));
        fields.insert("unit".into(), Value::from(self.unit.to_string()));
        fields.insert("date".into(), Value::from(self.date.to_string()));
        fields.insert("value".into(), Value::from(self.value));
        fields.insert("mom_change".into(), opt(self.mom_change));
        fields.insert("yoy_change".into(), opt(self.yoy_change));
        for (label, avg) in &self.rolling {
            fields.insert(label.clone(), opt(*avg));
        }
        fields.insert(
            "upload_timestamp".into(),
            Value::from(self.upload_timestamp.to_rfc3339()),
        );
        fields
    }
}

fn opt(value: Option<f64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

impl fmt::Display for SummaryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
        write!(
            f,
            "{} ({}) {}: {} | MoM {} | YoY {}",
            self.series_id,
            self.series_name,
            self.date,
            self.value,
            show(self.mom_change),
            show(self.yoy_change)
        )
    }
}

/// Build a summary for each series with at least one observation.
///
/// Names come from the catalog; series missing from it use their id.
/// Metric values are rounded to `precision` decimals.
pub fn generate_summaries(
    metrics: &[SeriesMetrics],
    catalog: &SeriesCatalog,
    precision: u32,
) -> Vec<SummaryDocument> {
    let now = Utc::now();
    metrics
        .iter()
        .filter_map(|m| {
            let row = m.latest()?;
            let round = |v: Option<f64>| v.map(|v| round_to(v, precision));
            let rolling = m
                .windows
                .iter()
                .zip(&row.rolling_mom)
                .map(|(w, avg)| (w.label(), round(*avg)))
                .collect();
            Some(SummaryDocument {
                series_id: m.series_id.clone(),
                series_name: catalog
                    .get(&m.series_id)
                    .map_or_else(|| m.series_id.clone(), |spec| spec.name.clone()),
                unit: m.unit,
                date: row.period,
                value: row.value,
                mom_change: round(row.mom_change),
                yoy_change: round(row.yoy_change),
                rolling,
                upload_timestamp: now,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrotrend_metrics::{MetricsEngine, Series, SeriesSpec, SourceKind};

    fn summaries() -> Vec<SummaryDocument> {
        let start = Period::new(2024, 1).unwrap();
        let cpi = Series::from_points(
            "CPIAUCSL",
            ChangeUnit::Relative,
            [(start, 308.0), (start.next(), 309.543)],
        )
        .unwrap();
        let empty = Series::new("HOUST", ChangeUnit::Relative);
        let catalog = SeriesCatalog::new(vec![SeriesSpec::new(
            "CPIAUCSL",
            "Consumer Price Index",
            ChangeUnit::Relative,
            SourceKind::Fred,
        )]);
        let metrics = MetricsEngine::default().compute_all(&[cpi, empty]);
        generate_summaries(&metrics, &catalog, 2)
    }

    #[test]
    fn test_one_document_per_non_empty_series() {
        let docs = summaries();
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.series_name, "Consumer Price Index");
        assert_eq!(doc.date, Period::new(2024, 2).unwrap());
        assert_eq!(doc.mom_change, Some(0.5));
        assert_eq!(doc.yoy_change, None);
        assert_eq!(doc.rolling.len(), 2);
    }

    #[test]
    fn test_to_fields() {
        let fields = summaries()[0].to_fields();
        assert_eq!(fields["series_id"], "CPIAUCSL");
        assert_eq!(fields["date"], "2024-02");
        assert_eq!(fields["unit"], "percent");
        assert_eq!(fields["yoy_change"], Value::Null);
        assert_eq!(fields["mom_12mo_avg"], 0.5);
        assert!(fields.contains_key("upload_timestamp"));
    }

    #[test]
    fn test_display() {
        let text = summaries()[0].to_string();
        assert!(text.starts_with("CPIAUCSL (Consumer Price Index) 2024-02"));
        assert!(text.contains("YoY n/a"));
    }
}

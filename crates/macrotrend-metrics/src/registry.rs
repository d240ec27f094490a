//! Metric Registry
//!
//! Lists the derived metrics the engine produces, with the column names
//! they appear under in exported tables.

use crate::rolling::RollingWindow;
use std::collections::HashMap;

/// Kinds of derived metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Period-over-period change (MoM, YoY)
    Change,
    /// Trailing average of a change sequence
    Rolling,
    /// Threshold flags on a change sequence
    Spike,
    /// Relationships between series
    CrossSeries,
}

/// Metric metadata
#[derive(Debug, Clone)]
pub struct MetricInfo {
    /// Metric name (unique identifier)
    pub name: &'static str,
    /// Metric kind
    pub kind: MetricKind,
    /// What the metric measures
    pub description: &'static str,
    /// Whether the metric can be undefined at a period
    pub nullable: bool,
}

/// Get all available metric info
pub fn available_metrics() -> Vec<MetricInfo> {
    vec![
        MetricInfo {
            name: "mom_change",
            kind: MetricKind::Change,
            description: "Change against the immediately preceding calendar month",
            nullable: true,
        },
        MetricInfo {
            name: "yoy_change",
            kind: MetricKind::Change,
            description: "Change against the same calendar month one year earlier",
            nullable: true,
        },
        MetricInfo {
            name: "mom_12mo_avg",
            kind: MetricKind::Rolling,
            description: "Trailing 12-month mean of MoM change",
            nullable: true,
        },
        MetricInfo {
            name: "mom_36mo_avg",
            kind: MetricKind::Rolling,
            description: "Trailing 36-month mean of MoM change",
            nullable: true,
        },
        MetricInfo {
            name: "mom_3mo_avg",
            kind: MetricKind::Rolling,
            description: "Trailing 3-month mean of MoM change (rolling view)",
            nullable: true,
        },
        MetricInfo {
            name: "yoy_3mo_avg",
            kind: MetricKind::Rolling,
            description: "Trailing 3-month mean of YoY change (rolling view)",
            nullable: true,
        },
        MetricInfo {
            name: "spike",
            kind: MetricKind::Spike,
            description: "MoM or YoY change whose magnitude meets the spike threshold",
            nullable: false,
        },
        MetricInfo {
            name: "lag_correlation",
            kind: MetricKind::CrossSeries,
            description: "Pearson correlation of one series' MoM against another's, lagged",
            nullable: true,
        },
    ]
}

/// Get metrics by kind
pub fn metrics_by_kind(kind: MetricKind) -> Vec<MetricInfo> {
    available_metrics()
        .into_iter()
        .filter(|m| m.kind == kind)
        .collect()
}

/// Get metric info by name.
///
/// Rolling columns for windows other than the listed ones
/// (`mom_<W>mo_avg`) resolve to a generic rolling entry.
pub fn get_metric_info(name: &str) -> Option<MetricInfo> {
    if let Some(info) = available_metrics().into_iter().find(|m| m.name == name) {
        return Some(info);
    }
    let months = name.strip_prefix("mom_")?.strip_suffix("mo_avg")?;
    let window = RollingWindow::new(months.parse().ok()?).ok()?;
    (window.label() == name).then_some(MetricInfo {
        name: "mom_rolling_avg",
        kind: MetricKind::Rolling,
        description: "Trailing mean of MoM change over a configured window",
        nullable: true,
    })
}

/// Count metrics by kind
pub fn count_by_kind() -> HashMap<MetricKind, usize> {
    let mut counts = HashMap::new();
    for metric in available_metrics() {
        *counts.entry(metric.kind).or_insert(0) += 1;
    }
    counts
}

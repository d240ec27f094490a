//! Movers report: the latest period ranked by month-over-month change.
//!
//! Percent and point changes are not comparable, so series are ranked
//! within their change unit and each unit is rendered as its own section.

use chrono::{DateTime, Utc};
use macrotrend_metrics::{ChangeUnit, Period, SeriesCatalog, SeriesMetrics};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One line of the movers report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    /// Series identifier.
    pub series_id: String,

    /// Human readable name.
    pub name: String,

    /// Unit of the changes.
    pub unit: ChangeUnit,

    /// Latest value.
    pub value: f64,

    /// MoM change.
    pub mom_change: Option<f64>,

    /// YoY change.
    pub yoy_change: Option<f64>,
}

/// Series at one period, grouped by change unit (percent first) and
/// ordered from largest loss to largest gain within each group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoversReport {
    /// Reported period.
    pub period: Period,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Ranked series. Series with undefined MoM come last in their group.
    pub movers: Vec<Mover>,
}

const UNITS: [ChangeUnit; 2] = [ChangeUnit::Relative, ChangeUnit::Absolute];

const fn unit_rank(unit: ChangeUnit) -> u8 {
    match unit {
        ChangeUnit::Relative => 0,
        ChangeUnit::Absolute => 1,
    }
}

const fn unit_heading(unit: ChangeUnit) -> &'static str {
    match unit {
        ChangeUnit::Relative => "Percent change",
        ChangeUnit::Absolute => "Point change",
    }
}

fn by_mom(a: &Mover, b: &Mover) -> Ordering {
    unit_rank(a.unit)
        .cmp(&unit_rank(b.unit))
        .then_with(|| by_change(a.mom_change, b.mom_change))
        .then_with(|| a.series_id.cmp(&b.series_id))
}

fn by_change(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cell(value: Option<f64>, unit: ChangeUnit) -> String {
    match (value, unit) {
        (None, _) => "n/a".to_string(),
        (Some(v), ChangeUnit::Relative) => format!("{v:+.2}%"),
        (Some(v), ChangeUnit::Absolute) => format!("{v:+.2} pts"),
    }
}

impl MoversReport {
    /// Rank series at `period`, or at the latest period any series has when
    /// `period` is `None`. Returns `None` when there is nothing to report.
    pub fn new(
        metrics: &[SeriesMetrics],
        catalog: &SeriesCatalog,
        period: Option<Period>,
    ) -> Option<Self> {
        let period = match period {
            Some(p) => p,
            None => metrics.iter().filter_map(|m| m.latest()).map(|r| r.period).max()?,
        };

        let mut movers: Vec<Mover> = metrics
            .iter()
            .filter_map(|m| {
                let row = m.row(period)?;
                Some(Mover {
                    series_id: m.series_id.clone(),
                    name: catalog
                        .get(&m.series_id)
                        .map_or_else(|| m.series_id.clone(), |s| s.name.clone()),
                    unit: m.unit,
                    value: row.value,
                    mom_change: row.mom_change,
                    yoy_change: row.yoy_change,
                })
            })
            .collect();
        if movers.is_empty() {
            return None;
        }
        movers.sort_by(by_mom);

        Some(Self {
            period,
            timestamp: Utc::now(),
            movers,
        })
    }

    /// Movers quoted in `unit`, in rank order.
    pub fn group(&self, unit: ChangeUnit) -> impl Iterator<Item = &Mover> + '_ {
        self.movers.iter().filter(move |m| m.unit == unit)
    }

    /// Render as an ASCII table.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nMovers: {}\n", self.period));
        output.push_str(&format!(
            "Generated: {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&"=".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "{:<12} {:<30} {:>12} {:>11} {:>11}\n",
            "Series", "Name", "Value", "MoM", "YoY"
        ));

        for unit in UNITS {
            let group: Vec<&Mover> = self.group(unit).collect();
            if group.is_empty() {
                continue;
            }
            output.push_str(&"-".repeat(80));
            output.push('\n');
            output.push_str(&format!("{}\n", unit_heading(unit)));
            for m in group {
                let name: String = m.name.chars().take(30).collect();
                output.push_str(&format!(
                    "{:<12} {:<30} {:>12.2} {:>11} {:>11}\n",
                    m.series_id,
                    name,
                    m.value,
                    cell(m.mom_change, m.unit),
                    cell(m.yoy_change, m.unit)
                ));
            }
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');
        output
    }

    /// Render as a Markdown document.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Movers: {}\n\n", self.period));
        output.push_str(&format!(
            "*Generated: {}*\n\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        for unit in UNITS {
            let group: Vec<&Mover> = self.group(unit).collect();
            if group.is_empty() {
                continue;
            }
            output.push_str(&format!("## {}\n\n", unit_heading(unit)));
            output.push_str("| Series | Name | Value | MoM | YoY |\n");
            output.push_str("|--------|------|-------|-----|-----|\n");
            for m in group {
                output.push_str(&format!(
                    "| {} | {} | {:.2} | {} | {} |\n",
                    m.series_id,
                    m.name,
                    m.value,
                    cell(m.mom_change, m.unit),
                    cell(m.yoy_change, m.unit)
                ));
            }
            output.push('\n');
        }

        let gainers = self.movers.iter().filter(|m| m.mom_change.is_some_and(|c| c > 0.0)).count();
        let losers = self
            .movers
            .iter()
            .filter(|m| m.mom_change.is_some_and(|c| c < 0.0))
            .count();
        output.push_str("## Summary\n\n");
        output.push_str(&format!("- **Series:** {}\n", self.movers.len()));
        output.push_str(&format!("- **Up:** {gainers}\n"));
        output.push_str(&format!("- **Down:** {losers}\n"));

        output
    }
}

impl fmt::Display for MoversReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ascii_table())
    }
}

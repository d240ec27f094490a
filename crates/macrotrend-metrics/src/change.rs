//! Period-over-period change.
//!
//! Month-over-month and year-over-year change are both trailing changes
//! against an exact calendar offset (1 and 12 months). A change at `t` is
//! defined only when the series has an observation at exactly `t - lag`;
//! the nearest earlier observation is never used in its place.

use crate::period::Period;
use crate::series::Series;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Calendar offset for month-over-month change.
pub const MOM_LAG: i64 = 1;

/// Calendar offset for year-over-year change.
pub const YOY_LAG: i64 = 12;

/// Unit in which a series' changes are expressed.
///
/// Index and level series (prices, sales, payrolls) use relative percent
/// change. Series that are already rates (unemployment, policy rates,
/// yields) use absolute point differences: a move from 4.0% to 4.2% is
/// +0.2 points, not +5%.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeUnit {
    /// `(v[t] - v[base]) / v[base] * 100`
    #[serde(rename = "percent")]
    #[display("percent")]
    Relative,
    /// `v[t] - v[base]`
    #[serde(rename = "points")]
    #[display("points")]
    Absolute,
}

/// Which comparison a change describes.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    /// Against the preceding calendar month.
    #[serde(rename = "MoM")]
    #[display("MoM")]
    Mom,
    /// Against the same calendar month one year earlier.
    #[serde(rename = "YoY")]
    #[display("YoY")]
    Yoy,
}

impl ChangeType {
    /// Calendar offset in months.
    pub const fn lag(&self) -> i64 {
        match self {
            Self::Mom => MOM_LAG,
            Self::Yoy => YOY_LAG,
        }
    }
}

/// A possibly-undefined value attached to a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Period the value belongs to.
    pub period: Period,
    /// `None` when the metric is undefined at this period.
    pub value: Option<f64>,
}

impl MetricPoint {
    /// Create a new point.
    pub const fn new(period: Period, value: Option<f64>) -> Self {
        Self { period, value }
    }
}

/// Change from `base` to `current` in the given unit.
///
/// Relative change against a base within `epsilon` of zero is undefined, as
/// is any non-finite result.
pub fn change_between(unit: ChangeUnit, base: f64, current: f64, epsilon: f64) -> Option<f64> {
    let change = match unit {
        ChangeUnit::Relative => {
            if base.abs() <= epsilon {
                return None;
            }
            (current - base) / base * 100.0
        }
        ChangeUnit::Absolute => current - base,
    };

    change.is_finite().then_some(change)
}

/// Change of every observation against the observation exactly `lag`
/// calendar months earlier, in the series' own unit.
pub fn trailing_change(series: &Series, lag: i64, epsilon: f64) -> Vec<MetricPoint> {
    series
        .iter()
        .map(|(period, value)| {
            let change = series
                .get(period.offset(-lag))
                .and_then(|base| change_between(series.unit(), base, value, epsilon));
            MetricPoint::new(period, change)
        })
        .collect()
}

/// Month-over-month change for every observation.
pub fn mom_change(series: &Series, epsilon: f64) -> Vec<MetricPoint> {
    trailing_change(series, MOM_LAG, epsilon)
}

/// Year-over-year change for every observation.
pub fn yoy_change(series: &Series, epsilon: f64) -> Vec<MetricPoint> {
    trailing_change(series, YOY_LAG, epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    const EPS: f64 = 1e-9;

    fn monthly(id: &str, unit: ChangeUnit, start: Period, values: &[f64]) -> Series {
        Series::from_points(
            id,
            unit,
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (start.offset(i as i64), *v)),
        )
        .unwrap()
    }

    fn jan(year: i32) -> Period {
        Period::new(year, 1).unwrap()
    }

    #[test]
    fn test_relative_mom() {
        let s = monthly("X", ChangeUnit::Relative, jan(2024), &[100.0, 105.0, 110.25]);
        let mom = mom_change(&s, EPS);
        assert_eq!(mom.len(), 3);
        assert_eq!(mom[0].value, None);
        assert_relative_eq!(mom[1].value.unwrap(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(mom[2].value.unwrap(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_absolute_mom_for_rates() {
        let s = monthly("UNRATE", ChangeUnit::Absolute, jan(2024), &[4.0, 4.2, 4.1]);
        let mom = mom_change(&s, EPS);
        assert_eq!(mom[0].value, None);
        assert_relative_eq!(mom[1].value.unwrap(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(mom[2].value.unwrap(), -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_units_are_not_interchangeable() {
        let rel = monthly("R", ChangeUnit::Relative, jan(2024), &[4.0, 4.2]);
        let abs = monthly("A", ChangeUnit::Absolute, jan(2024), &[4.0, 4.2]);
        assert_relative_eq!(mom_change(&rel, EPS)[1].value.unwrap(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(mom_change(&abs, EPS)[1].value.unwrap(), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_base() {
        let s = monthly("Z", ChangeUnit::Relative, jan(2024), &[50.0, 0.0, 10.0]);
        let mom = mom_change(&s, EPS);
        assert_relative_eq!(mom[1].value.unwrap(), -100.0);
        assert_eq!(mom[2].value, None);
    }

    #[test]
    fn test_near_zero_base_uses_epsilon() {
        assert_eq!(change_between(ChangeUnit::Relative, 1e-12, 1.0, 1e-9), None);
        assert!(change_between(ChangeUnit::Relative, 1e-12, 1.0, 0.0).is_some());
        // Absolute change has no base restriction.
        assert_eq!(change_between(ChangeUnit::Absolute, 0.0, 1.5, 1e-9), Some(1.5));
    }

    #[test]
    fn test_gap_is_not_bridged() {
        let s = Series::from_points(
            "G",
            ChangeUnit::Relative,
            [
                (Period::new(2024, 1).unwrap(), 100.0),
                (Period::new(2024, 2).unwrap(), 110.0),
                (Period::new(2024, 4).unwrap(), 121.0),
                (Period::new(2024, 5).unwrap(), 133.1),
            ],
        )
        .unwrap();
        let mom = mom_change(&s, EPS);
        assert!(mom[1].value.is_some());
        assert_eq!(mom[2].value, None, "March is missing");
        assert!(mom[3].value.is_some());
    }

    #[rstest]
    #[case(11, false)]
    #[case(12, true)]
    #[case(13, false)]
    fn test_yoy_requires_exact_twelve_months(#[case] gap: i64, #[case] defined: bool) {
        let start = jan(2022);
        let s = Series::from_points(
            "Y",
            ChangeUnit::Relative,
            [(start, 200.0), (start.offset(gap), 210.0)],
        )
        .unwrap();
        let yoy = yoy_change(&s, EPS);
        assert_eq!(yoy[1].value.is_some(), defined);
        if defined {
            assert_relative_eq!(yoy[1].value.unwrap(), 5.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_absolute_yoy() {
        let values: Vec<f64> = (0..13).map(|i| 3.5 + f64::from(i) * 0.1).collect();
        let s = monthly("FEDFUNDS", ChangeUnit::Absolute, jan(2023), &values);
        let yoy = yoy_change(&s, EPS);
        assert!(yoy[..12].iter().all(|p| p.value.is_none()));
        assert_relative_eq!(yoy[12].value.unwrap(), 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_change_type_labels() {
        assert_eq!(ChangeType::Mom.to_string(), "MoM");
        assert_eq!(ChangeType::Yoy.to_string(), "YoY");
        assert_eq!(ChangeType::Yoy.lag(), 12);
        assert_eq!(serde_json::to_string(&ChangeUnit::Absolute).unwrap(), "\"points\"");
    }
}

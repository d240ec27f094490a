//! Trailing rolling averages.
//!
//! The window is measured in calendar months ending at the current period,
//! not in observations, so a gap shrinks the number of values in the
//! window instead of reaching further back. Undefined values are skipped in
//! both the sum and the count. Early history averages whatever the partial
//! window holds.
//!
//! Each window is summed from scratch. A running sum would carry rounding
//! residue from values that have left the window, so a revision could leak
//! into averages whose window no longer contains it.

use crate::change::MetricPoint;
use crate::error::{MetricsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

/// Width of a trailing window in months. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "usize")]
pub struct RollingWindow(NonZeroUsize);

impl RollingWindow {
    /// 3-month window.
    pub const THREE_MONTHS: Self = Self(NonZeroUsize::new(3).unwrap());

    /// 12-month window.
    pub const TWELVE_MONTHS: Self = Self(NonZeroUsize::new(12).unwrap());

    /// 36-month window.
    pub const THIRTY_SIX_MONTHS: Self = Self(NonZeroUsize::new(36).unwrap());

    /// Validate a window length. Zero and negative lengths are rejected.
    pub fn new(months: i64) -> Result<Self> {
        usize::try_from(months)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or(MetricsError::OutOfRangeWindow(months))
    }

    /// Window length in months.
    pub const fn months(&self) -> usize {
        self.0.get()
    }

    /// Column label used in tables, e.g. `mom_12mo_avg`.
    pub fn label(&self) -> String {
        format!("mom_{}mo_avg", self.months())
    }
}

impl fmt::Display for RollingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mo", self.months())
    }
}

impl TryFrom<i64> for RollingWindow {
    type Error = MetricsError;

    fn try_from(months: i64) -> Result<Self> {
        Self::new(months)
    }
}

impl From<RollingWindow> for usize {
    fn from(window: RollingWindow) -> Self {
        window.months()
    }
}

/// Trailing mean of `points` over `window` calendar months.
///
/// `points` must be sorted by period without repeats, as produced by the
/// change functions. The output has one point per input point.
pub fn rolling_mean(points: &[MetricPoint], window: RollingWindow) -> Vec<MetricPoint> {
    let span = i64::try_from(window.months()).unwrap_or(i64::MAX) - 1;

    points
        .iter()
        .enumerate()
        .map(|(i, current)| {
            let mut sum = 0.0;
            let mut count = 0usize;
            for point in points[..=i].iter().rev() {
                if current.period.months_since(&point.period) > span {
                    break;
                }
                if let Some(value) = point.value {
                    sum += value;
                    count += 1;
                }
            }
            let mean = (count > 0).then(|| sum / count as f64);
            MetricPoint::new(current.period, mean)
        })
        .collect()
}

//! Lagged cross-series correlation of month-over-month changes.
//!
//! For a base series and a target series, the correlation at lag `k` pairs
//! `base.mom[t]` with `target.mom[t - k]`, so a strong value at `k = 2`
//! means the target's moves tend to lead the base by two months. Pairs are
//! aligned by calendar month and only periods where both sides are defined
//! take part.

use crate::change::MetricPoint;
use crate::engine::SeriesMetrics;
use crate::period::Period;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Variance below which a side is treated as constant.
const MIN_VARIANCE: f64 = 1e-12;

/// Correlations of one ordered series pair, indexed by lag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagCorrelations {
    /// Series whose changes are taken at `t`
    pub base: String,
    /// Series whose changes are taken at `t - lag`
    pub target: String,
    /// `by_lag[k]` is the correlation at lag `k`; `None` when undefined
    pub by_lag: Vec<Option<f64>>,
}

/// Pearson correlation of `base[t]` against `target[t - lag]`.
///
/// Returns `None` when fewer than two aligned pairs exist or when either
/// side has (near) zero variance.
pub fn lag_correlation(base: &[MetricPoint], target: &[MetricPoint], lag: usize) -> Option<f64> {
    let target: HashMap<Period, f64> = target
        .iter()
        .filter_map(|p| p.value.map(|v| (p.period, v)))
        .collect();

    let pairs: Vec<(f64, f64)> = base
        .iter()
        .filter_map(|p| {
            let x = p.value?;
            let y = *target.get(&p.period.offset(-(lag as i64)))?;
            Some((x, y))
        })
        .collect();

    pearson(&pairs)
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x < MIN_VARIANCE || var_y < MIN_VARIANCE {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Correlations for every ordered pair of distinct series at lags
/// `0..=max_lag`, in input order.
pub fn correlation_matrix(metrics: &[SeriesMetrics], max_lag: usize) -> Vec<LagCorrelations> {
    let mom: Vec<Vec<MetricPoint>> = metrics.iter().map(SeriesMetrics::mom_points).collect();

    let mut out = Vec::new();
    for (i, base) in metrics.iter().enumerate() {
        for (j, target) in metrics.iter().enumerate() {
            if i == j {
                continue;
            }
            let by_lag = (0..=max_lag)
                .map(|lag| lag_correlation(&mom[i], &mom[j], lag))
                .collect();
            out.push(LagCorrelations {
                base: base.series_id.clone(),
                target: target.series_id.clone(),
                by_lag,
            });
        }
    }
    out
}

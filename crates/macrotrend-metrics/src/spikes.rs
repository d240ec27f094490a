//! Spike flagging.
//!
//! A spike is a defined change whose magnitude meets or exceeds a
//! threshold. The threshold is compared against the change in the series'
//! own unit, so 5.0 means five percent for index series and five points for
//! rate series.

use crate::change::{ChangeType, MetricPoint};
use crate::error::{MetricsError, Result};
use crate::period::Period;
use serde::{Deserialize, Serialize};

/// Minimum absolute change that counts as a spike.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SpikeThreshold(f64);

impl SpikeThreshold {
    /// Validate a threshold. It must be finite and non-negative.
    pub fn new(threshold: f64) -> Result<Self> {
        if threshold.is_finite() && threshold >= 0.0 {
            Ok(Self(threshold))
        } else {
            Err(MetricsError::InvalidThreshold(threshold))
        }
    }

    /// Threshold value.
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// Whether a change is large enough to flag.
    pub fn is_spike(&self, change: f64) -> bool {
        change.abs() >= self.0
    }
}

impl Default for SpikeThreshold {
    fn default() -> Self {
        Self(5.0)
    }
}

impl TryFrom<f64> for SpikeThreshold {
    type Error = MetricsError;

    fn try_from(threshold: f64) -> Result<Self> {
        Self::new(threshold)
    }
}

impl From<SpikeThreshold> for f64 {
    fn from(threshold: SpikeThreshold) -> Self {
        threshold.0
    }
}

/// A flagged change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    /// Period of the change
    pub period: Period,
    /// Whether the change is MoM or YoY
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Signed change
    pub magnitude: f64,
}

/// Flag every defined change in `points` at or above `threshold`.
pub fn flag_spikes(
    points: &[MetricPoint],
    change_type: ChangeType,
    threshold: SpikeThreshold,
) -> Vec<Spike> {
    points
        .iter()
        .filter_map(|point| {
            point
                .value
                .filter(|change| threshold.is_spike(*change))
                .map(|magnitude| Spike {
                    period: point.period,
                    change_type,
                    magnitude,
                })
        })
        .collect()
}

/// Flag MoM and YoY spikes together, ordered by period then change type.
pub fn detect_spikes(
    mom: &[MetricPoint],
    yoy: &[MetricPoint],
    threshold: SpikeThreshold,
) -> Vec<Spike> {
    let mut spikes = flag_spikes(mom, ChangeType::Mom, threshold);
    spikes.extend(flag_spikes(yoy, ChangeType::Yoy, threshold));
    spikes.sort_by_key(|s| (s.period, s.change_type));
    spikes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn points(values: &[Option<f64>]) -> Vec<MetricPoint> {
        let start = Period::new(2024, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MetricPoint::new(start.offset(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_flags_at_or_above_threshold() {
        let pts = points(&[Some(1.0), Some(6.0), Some(-7.0), Some(2.0)]);
        let spikes = flag_spikes(&pts, ChangeType::Mom, SpikeThreshold::default());
        assert_eq!(spikes.len(), 2);
        assert_eq!(spikes[0].period, pts[1].period);
        assert_eq!(spikes[0].magnitude, 6.0);
        assert_eq!(spikes[1].period, pts[2].period);
        assert_eq!(spikes[1].magnitude, -7.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let pts = points(&[Some(5.0), Some(-5.0), Some(4.999)]);
        let spikes = flag_spikes(&pts, ChangeType::Yoy, SpikeThreshold::default());
        assert_eq!(spikes.len(), 2);
        assert!(spikes.iter().all(|s| s.change_type == ChangeType::Yoy));
    }

    #[test]
    fn test_undefined_never_flagged() {
        let pts = points(&[None, None]);
        let zero = SpikeThreshold::new(0.0).unwrap();
        assert!(flag_spikes(&pts, ChangeType::Mom, zero).is_empty());
    }

    #[test]
    fn test_detect_orders_by_period_then_type() {
        let mom = points(&[Some(9.0), Some(0.0)]);
        let yoy = points(&[Some(-12.0), Some(8.0)]);
        let spikes = detect_spikes(&mom, &yoy, SpikeThreshold::default());
        let kinds: Vec<_> = spikes.iter().map(|s| s.change_type).collect();
        assert_eq!(kinds, vec![ChangeType::Mom, ChangeType::Yoy, ChangeType::Yoy]);
        assert_eq!(spikes[0].period, spikes[1].period);
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_invalid_threshold(#[case] value: f64) {
        assert!(matches!(
            SpikeThreshold::new(value),
            Err(MetricsError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_spike_json_shape() {
        let spike = Spike {
            period: Period::new(2024, 5).unwrap(),
            change_type: ChangeType::Mom,
            magnitude: -6.5,
        };
        let json = serde_json::to_value(spike).unwrap();
        assert_eq!(json["period"], "2024-05");
        assert_eq!(json["type"], "MoM");
        assert_eq!(json["magnitude"], -6.5);
    }
}

//! Engine configuration.

use crate::error::{MetricsError, Result};
use crate::rolling::RollingWindow;
use crate::spikes::SpikeThreshold;
use serde::{Deserialize, Serialize};

/// Configuration for the [`MetricsEngine`](crate::MetricsEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rolling windows applied to the MoM change (default: 12 and 36 months)
    pub windows: Vec<RollingWindow>,
    /// Minimum absolute change flagged as a spike (default: 5.0)
    pub spike_threshold: SpikeThreshold,
    /// Relative change against a base at or below this magnitude is
    /// undefined (default: 1e-9)
    pub zero_epsilon: f64,
    /// Largest lag for the correlation matrix (default: 3)
    pub correlation_max_lag: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            windows: vec![RollingWindow::TWELVE_MONTHS, RollingWindow::THIRTY_SIX_MONTHS],
            spike_threshold: SpikeThreshold::default(),
            zero_epsilon: 1e-9,
            correlation_max_lag: 3,
        }
    }
}

impl EngineConfig {
    /// Build a config from raw window lengths, validating each one.
    pub fn with_windows(mut self, months: &[i64]) -> Result<Self> {
        self.windows = months
            .iter()
            .map(|&m| RollingWindow::new(m))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Set the spike threshold.
    pub fn with_spike_threshold(mut self, threshold: f64) -> Result<Self> {
        self.spike_threshold = SpikeThreshold::new(threshold)?;
        Ok(self)
    }

    /// Check the settings and collapse repeated windows, keeping the first
    /// occurrence of each.
    pub fn validate(mut self) -> Result<Self> {
        if !self.zero_epsilon.is_finite() || self.zero_epsilon < 0.0 {
            return Err(MetricsError::InvalidConfig(format!(
                "zero_epsilon must be finite and non-negative, got {}",
                self.zero_epsilon
            )));
        }
        let mut seen = Vec::with_capacity(self.windows.len());
        self.windows.retain(|w| {
            if seen.contains(w) {
                false
            } else {
                seen.push(*w);
                true
            }
        });
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        let months: Vec<_> = config.windows.iter().map(|w| w.months()).collect();
        assert_eq!(months, vec![12, 36]);
        assert_eq!(config.spike_threshold.value(), 5.0);
        assert_eq!(config.zero_epsilon, 1e-9);
        assert_eq!(config.correlation_max_lag, 3);
    }

    #[test]
    fn test_with_windows_rejects_zero() {
        let err = EngineConfig::default().with_windows(&[12, 0]).unwrap_err();
        assert_eq!(err, MetricsError::OutOfRangeWindow(0));
    }

    #[test]
    fn test_with_spike_threshold() {
        let config = EngineConfig::default().with_spike_threshold(2.0).unwrap();
        assert_eq!(config.spike_threshold.value(), 2.0);
        assert!(EngineConfig::default().with_spike_threshold(-1.0).is_err());
        assert!(EngineConfig::default().with_spike_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_dedups_windows() {
        let config = EngineConfig::default()
            .with_windows(&[3, 12, 3, 12])
            .unwrap()
            .validate()
            .unwrap();
        let months: Vec<_> = config.windows.iter().map(|w| w.months()).collect();
        assert_eq!(months, vec![3, 12]);
    }

    #[test]
    fn test_validate_rejects_bad_epsilon() {
        let config = EngineConfig {
            zero_epsilon: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MetricsError::InvalidConfig(_))));
    }

    #[test]
    fn test_deserialize_rejects_bad_window() {
        let err = serde_json::from_str::<EngineConfig>(r#"{"windows": [12, -1]}"#);
        assert!(err.is_err());
        let ok: EngineConfig = serde_json::from_str(r#"{"spike_threshold": 2.5}"#).unwrap();
        assert_eq!(ok.spike_threshold.value(), 2.5);
        assert_eq!(ok.windows.len(), 2);
    }
}

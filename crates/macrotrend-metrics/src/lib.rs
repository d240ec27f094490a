#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/macrotrend/macrotrend/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod change;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod period;
pub mod registry;
pub mod rolling;
pub mod series;
pub mod spikes;

pub use catalog::{SeriesCatalog, SeriesSpec, SourceKind};
pub use change::{ChangeType, ChangeUnit, MetricPoint, change_between, mom_change, yoy_change};
pub use config::EngineConfig;
pub use correlation::{LagCorrelations, correlation_matrix, lag_correlation};
pub use engine::{MetricRow, MetricsEngine, SeriesMetrics};
pub use error::{MetricsError, Result};
pub use period::Period;
pub use registry::{MetricInfo, MetricKind, available_metrics, get_metric_info};
pub use rolling::{RollingWindow, rolling_mean};
pub use series::{MergeReport, Observation, Revision, Series, ingest};
pub use spikes::{Spike, SpikeThreshold, detect_spikes, flag_spikes};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

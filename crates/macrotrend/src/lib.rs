#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/macrotrend/macrotrend/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod catalog;

// Re-export main types from sub-crates
pub use macrotrend_data as data;
pub use macrotrend_metrics as metrics;
pub use macrotrend_output as output;

pub use catalog::{RATE_SERIES, bls_series, default_catalog, fred_series};
pub use macrotrend_metrics::{SeriesCatalog, SeriesSpec, SourceKind};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

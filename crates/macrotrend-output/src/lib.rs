#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/macrotrend/macrotrend/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod frame;
pub mod lookup;
pub mod report;
pub mod summary;
pub mod views;

pub use export::{
    ExportError, ExportFormat, Exporter, MetricsTable, NestedEntry, NestedMetrics, TABLE_PRECISION,
    TableRow, round_to,
};
pub use frame::to_dataframe;
pub use lookup::{LookupError, LookupResult, MetricsIndex};
pub use report::{Mover, MoversReport};
pub use summary::{SummaryDocument, generate_summaries};
pub use views::{CORRELATION_PRECISION, VIEW_PRECISION, ViewBuilder};

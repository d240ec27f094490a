//! Error types for metric computation and ingestion.
//!
//! Per-period numeric problems (no prior observation, a zero base) never
//! surface here; they become undefined values in the output. Only
//! structural problems with the input or the configuration are errors.

use crate::period::Period;
use thiserror::Error;

/// Result type for metric operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors raised by ingestion, series maintenance and engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    /// Two observations in one batch disagree on the value of a period.
    #[error("Duplicate period {period} for series {series_id}: {first} vs {second}")]
    DuplicatePeriod {
        /// Series the observations belong to
        series_id: String,
        /// Period that was supplied twice
        period: Period,
        /// First value seen
        first: f64,
        /// Conflicting value
        second: f64,
    },

    /// A rolling window of zero or fewer periods.
    #[error("Rolling window must cover at least one period, got {0}")]
    OutOfRangeWindow(i64),

    /// A spike threshold that is negative or not finite.
    #[error("Invalid spike threshold: {0}")]
    InvalidThreshold(f64),

    /// Any other rejected engine setting.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A period that could not be parsed or is out of range.
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// A NaN or infinite observation value.
    #[error("Invalid value {value} for series {series_id} at {period}")]
    InvalidValue {
        /// Series the observation belongs to
        series_id: String,
        /// Period of the observation
        period: Period,
        /// Rejected value
        value: f64,
    },

    /// A series that has no entry in the catalog.
    #[error("Unknown series: {0}")]
    UnknownSeries(String),

    /// An observation routed to the wrong series.
    #[error("Series mismatch: expected {expected}, found {found}")]
    SeriesMismatch {
        /// Series being updated
        expected: String,
        /// Series named by the observation
        found: String,
    },

    /// An append that is not strictly after the latest recorded period.
    #[error("Out of order append for series {series_id}: {period} is not after {last}")]
    OutOfOrder {
        /// Series being appended to
        series_id: String,
        /// Period that was offered
        period: Period,
        /// Latest recorded period
        last: Period,
    },

    /// A revision for a period that was never recorded.
    #[error("No recorded value for series {series_id} at {period}")]
    NotRecorded {
        /// Series being revised
        series_id: String,
        /// Period with no recorded value
        period: Period,
    },
}

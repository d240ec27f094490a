//! Error types for data operations.

use macrotrend_metrics::MetricsError;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while fetching, storing or syncing data.
#[derive(Debug, Error)]
pub enum DataError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Observation or period rejected by the metrics layer
    #[error("Invalid data: {0}")]
    Metrics(#[from] MetricsError),

    /// Invalid year range
    #[error("Invalid year range: start {start} is after end {end}")]
    InvalidYearRange {
        /// First requested year
        start: i32,
        /// Last requested year
        end: i32,
    },

    /// A required API key was not configured
    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),

    /// FRED API error
    #[error("FRED API error: {0}")]
    FredApi(String),

    /// BLS API error
    #[error("BLS API error: {0}")]
    BlsApi(String),

    /// Document store error
    #[error("Firestore error: {0}")]
    Firestore(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

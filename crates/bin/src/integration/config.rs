//! Application configuration.
//!
//! Settings come from an optional JSON file; anything left out falls back to
//! defaults. API keys are read from the environment once, here, and handed
//! to the clients that need them.

use macrotrend::default_catalog;
use macrotrend_metrics::{EngineConfig, MetricsError, Period, SeriesCatalog};
use macrotrend_output::{TABLE_PRECISION, VIEW_PRECISION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    /// The configuration file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON for [`AppConfig`].
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// The engine settings are inconsistent.
    #[error("Invalid engine configuration: {0}")]
    Engine(#[from] MetricsError),
}

/// Document-store target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct FirestoreConfig {
    /// Google Cloud project id
    pub project_id: String,
    /// Collection the summary documents are written to
    pub collection: String,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: "what-s-it-cost".to_string(),
            collection: "Consumer Spending Indicators".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    /// Directory holding the database and written outputs
    pub data_dir: PathBuf,
    /// Database file; defaults to `<data_dir>/macrotrend.db`
    pub database: Option<PathBuf>,
    /// First period requested from FRED on a full pull
    pub fred_start: Period,
    /// First year requested from BLS on a full pull
    pub bls_start_year: i32,
    /// Metrics engine settings
    pub engine: EngineConfig,
    /// Decimal places in derived views
    pub view_precision: u32,
    /// Decimal places in exported tables
    pub table_precision: u32,
    /// Series to track; defaults to the built-in catalog
    pub series: SeriesCatalog,
    /// Document-store target
    pub firestore: FirestoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: super::store_manager::default_data_dir(),
            database: None,
            fred_start: Period::from_index(1980 * 12),
            bls_start_year: 2000,
            engine: EngineConfig::default(),
            view_precision: VIEW_PRECISION,
            table_precision: TABLE_PRECISION,
            series: default_catalog(),
            firestore: FirestoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or use the defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&text)?
            }
            None => Self::default(),
        };
        config.validate()
    }

    fn validate(mut self) -> Result<Self, ConfigError> {
        self.engine = self.engine.validate()?;
        Ok(self)
    }

    /// Override the engine's spike threshold when one is given.
    pub(crate) fn with_spike_threshold(
        mut self,
        threshold: Option<f64>,
    ) -> Result<Self, ConfigError> {
        if let Some(threshold) = threshold {
            self.engine = self.engine.with_spike_threshold(threshold)?;
        }
        Ok(self)
    }

    /// Path of the SQLite database.
    pub(crate) fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join("macrotrend.db"))
    }

    /// Directory the derived views are written to.
    pub(crate) fn views_dir(&self) -> PathBuf {
        self.data_dir.join("views")
    }
}

/// Credentials taken from the environment.
#[derive(Clone, Default)]
pub(crate) struct ApiKeys {
    pub fred: Option<String>,
    pub bls: Option<String>,
    pub firestore_bearer: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("fred", &self.fred.is_some())
            .field("bls", &self.bls.is_some())
            .field("firestore_bearer", &self.firestore_bearer.is_some())
            .finish()
    }
}

impl ApiKeys {
    /// Read `FRED_API_KEY`, `BLS_API_KEY` and `FIRESTORE_BEARER`. Blank
    /// values count as missing.
    pub(crate) fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            fred: var("FRED_API_KEY"),
            bls: var("BLS_API_KEY"),
            firestore_bearer: var("FIRESTORE_BEARER"),
        }
    }
}

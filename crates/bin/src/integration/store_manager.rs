//! Observation store location and opening.

use super::config::AppConfig;
use macrotrend_data::{ObservationStore, Result};
use std::path::PathBuf;

/// Get the default data directory path.
///
/// Uses platform-specific data directories:
/// - Linux: `~/.local/share/macrotrend/`
/// - macOS: `~/Library/Application Support/macrotrend/`
/// - Windows: `%APPDATA%\macrotrend\`
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("macrotrend")
}

/// Open the configured store, creating its directory if needed.
pub(crate) fn open_store(config: &AppConfig) -> Result<ObservationStore> {
    let path = config.database_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    ObservationStore::new(&path)
}

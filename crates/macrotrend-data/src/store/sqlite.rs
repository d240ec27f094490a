//! SQLite store for observations and their revision history.
//!
//! The `observations` table holds the current value of every
//! `(series_id, period)`. When an upsert changes a stored value, the old
//! and new values are appended to `revisions`; that log is never pruned,
//! not even when a full refresh drops periods upstream no longer publishes.

use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use macrotrend_metrics::{MetricsError, Observation, Period, Series, SeriesSpec};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// SQLite store for series observations.
#[derive(Debug)]
pub struct ObservationStore {
    conn: Connection,
}

/// Outcome of an upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    /// Observations for periods not stored before
    pub inserted: usize,
    /// Observations that replaced a different stored value
    pub revised: usize,
    /// Observations identical to the stored value
    pub unchanged: usize,
    /// Stored periods dropped by a full replace
    #[serde(default)]
    pub removed: usize,
}

impl UpsertReport {
    /// Fold another report into this one.
    pub fn absorb(&mut self, other: &Self) {
        self.inserted += other.inserted;
        self.revised += other.revised;
        self.unchanged += other.unchanged;
        self.removed += other.removed;
    }
}

/// One entry of the revision log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionRecord {
    /// Series whose value was corrected
    pub series_id: String,
    /// Corrected period
    pub period: Period,
    /// Value before the correction
    pub old_value: f64,
    /// Value after the correction
    pub new_value: f64,
    /// When the correction was stored
    pub revised_at: DateTime<Utc>,
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Total number of observations
    pub observations: usize,
    /// Number of distinct series
    pub series: usize,
    /// Number of logged revisions
    pub revisions: usize,
    /// Latest period across all series
    pub latest_period: Option<Period>,
}

impl ObservationStore {
    /// Open (or create) a store at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS observations (
                series_id TEXT NOT NULL,
                period TEXT NOT NULL,
                value REAL NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (series_id, period)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS revisions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                series_id TEXT NOT NULL,
                period TEXT NOT NULL,
                old_value REAL NOT NULL,
                new_value REAL NOT NULL,
                revised_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_revisions_series ON revisions(series_id, period)",
            [],
        )?;

        Ok(())
    }

    /// Insert new observations and apply corrections.
    ///
    /// The batch is checked before anything is written: a period supplied
    /// twice with different values is rejected as a duplicate. Everything
    /// else is applied in a single transaction.
    pub fn upsert(&self, observations: &[Observation]) -> Result<UpsertReport> {
        self.write(observations, false)
    }

    /// Replace the stored history of every series present in the batch.
    ///
    /// The batch is upserted as usual, so corrections are still logged as
    /// revisions, and then stored periods of those series that the batch
    /// does not contain are deleted. Series absent from the batch are left
    /// alone.
    pub fn replace(&self, observations: &[Observation]) -> Result<UpsertReport> {
        self.write(observations, true)
    }

    fn write(&self, observations: &[Observation], replace: bool) -> Result<UpsertReport> {
        let batch = dedupe_batch(observations)?;
        let now = Utc::now().to_rfc3339();
        let mut report = UpsertReport::default();

        let tx = self.conn.unchecked_transaction()?;
        for obs in &batch {
            let period = obs.period.to_string();
            let stored: Option<f64> = tx
                .query_row(
                    "SELECT value FROM observations WHERE series_id = ?1 AND period = ?2",
                    params![obs.series_id, period],
                    |row| row.get(0),
                )
                .optional()?;

            match stored {
                None => {
                    tx.execute(
                        "INSERT INTO observations (series_id, period, value, updated_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![obs.series_id, period, obs.value, now],
                    )?;
                    report.inserted += 1;
                }
                Some(old) if old.to_bits() == obs.value.to_bits() => {
                    report.unchanged += 1;
                }
                Some(old) => {
                    tx.execute(
                        "UPDATE observations SET value = ?3, updated_at = ?4
                         WHERE series_id = ?1 AND period = ?2",
                        params![obs.series_id, period, obs.value, now],
                    )?;
                    tx.execute(
                        "INSERT INTO revisions (series_id, period, old_value, new_value, revised_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![obs.series_id, period, old, obs.value, now],
                    )?;
                    debug!(series = %obs.series_id, %period, old, new = obs.value, "stored revision");
                    report.revised += 1;
                }
            }
        }

        if replace {
            let mut kept: HashMap<&str, HashSet<String>> = HashMap::new();
            for obs in &batch {
                kept.entry(obs.series_id.as_str())
                    .or_default()
                    .insert(obs.period.to_string());
            }
            for (series_id, periods) in &kept {
                let stored: Vec<String> = {
                    let mut stmt =
                        tx.prepare("SELECT period FROM observations WHERE series_id = ?1")?;
                    let rows = stmt
                        .query_map(params![series_id], |row| row.get(0))?
                        .collect::<rusqlite::Result<Vec<String>>>()?;
                    rows
                };
                for period in stored.iter().filter(|p| !periods.contains(*p)) {
                    report.removed += tx.execute(
                        "DELETE FROM observations WHERE series_id = ?1 AND period = ?2",
                        params![series_id, period],
                    )?;
                }
            }
        }
        tx.commit()?;

        info!(
            inserted = report.inserted,
            revised = report.revised,
            unchanged = report.unchanged,
            removed = report.removed,
            "upserted observations"
        );
        Ok(report)
    }

    /// Latest stored period of a series.
    pub fn last_period(&self, series_id: &str) -> Result<Option<Period>> {
        let last: Option<String> = self.conn.query_row(
            "SELECT MAX(period) FROM observations WHERE series_id = ?1",
            params![series_id],
            |row| row.get(0),
        )?;
        Ok(last.map(|p| p.parse::<Period>()).transpose()?)
    }

    /// All stored observations of a series, ascending by period.
    pub fn load_observations(&self, series_id: &str) -> Result<Vec<Observation>> {
        let mut stmt = self.conn.prepare(
            "SELECT period, value FROM observations
             WHERE series_id = ?1
             ORDER BY period ASC",
        )?;
        let rows = stmt.query_map(params![series_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (period, value) = row?;
            out.push(Observation::new(series_id, period.parse()?, value));
        }
        Ok(out)
    }

    /// Load a series with the unit configured in its spec.
    pub fn load_series(&self, spec: &SeriesSpec) -> Result<Series> {
        let points = self
            .load_observations(&spec.id)?
            .into_iter()
            .map(|o| (o.period, o.value));
        Ok(Series::from_points(spec.id.clone(), spec.unit, points)?)
    }

    /// Ids of every stored series.
    pub fn series_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT series_id FROM observations ORDER BY series_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// Revision log, oldest first, optionally for one series.
    pub fn revisions(&self, series_id: Option<&str>) -> Result<Vec<RevisionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT series_id, period, old_value, new_value, revised_at FROM revisions
             WHERE ?1 IS NULL OR series_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![series_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (series_id, period, old_value, new_value, revised_at) = row?;
            let revised_at = DateTime::parse_from_rfc3339(&revised_at)
                .map_err(|e| DataError::Parse(format!("bad revision timestamp: {}", e)))?
                .with_timezone(&Utc);
            out.push(RevisionRecord {
                series_id,
                period: period.parse()?,
                old_value,
                new_value,
                revised_at,
            });
        }
        Ok(out)
    }

    /// Delete the stored observations of a series. Its revision log stays.
    pub fn clear_series(&self, series_id: &str) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM observations WHERE series_id = ?1",
            params![series_id],
        )?;
        debug!(series = series_id, removed, "cleared series");
        Ok(removed)
    }

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let observations: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;

        let series: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT series_id) FROM observations",
            [],
            |row| row.get(0),
        )?;

        let revisions: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM revisions", [], |row| row.get(0))?;

        let latest: Option<String> =
            self.conn
                .query_row("SELECT MAX(period) FROM observations", [], |row| row.get(0))?;

        Ok(StoreStats {
            observations: observations as usize,
            series: series as usize,
            revisions: revisions as usize,
            latest_period: latest.map(|p| p.parse::<Period>()).transpose()?,
        })
    }
}

/// Collapse identical repeats and reject conflicting ones.
fn dedupe_batch(observations: &[Observation]) -> Result<Vec<&Observation>> {
    let mut seen: HashMap<(&str, Period), f64> = HashMap::new();
    let mut out = Vec::with_capacity(observations.len());
    for obs in observations {
        match seen.get(&(obs.series_id.as_str(), obs.period)) {
            None => {
                if !obs.value.is_finite() {
                    return Err(MetricsError::InvalidValue {
                        series_id: obs.series_id.clone(),
                        period: obs.period,
                        value: obs.value,
                    }
                    .into());
                }
                seen.insert((obs.series_id.as_str(), obs.period), obs.value);
                out.push(obs);
            }
            Some(first) if first.to_bits() == obs.value.to_bits() => {}
            Some(first) => {
                return Err(MetricsError::DuplicatePeriod {
                    series_id: obs.series_id.clone(),
                    period: obs.period,
                    first: *first,
                    second: obs.value,
                }
                .into());
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrotrend_metrics::{ChangeUnit, SourceKind};

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    fn obs(id: &str, year: i32, month: u32, value: f64) -> Observation {
        Observation::new(id, p(year, month), value)
    }

    #[test]
    fn test_store_initialization() {
        let store = ObservationStore::in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_upsert_reports_insert_revise_unchanged() {
        let store = ObservationStore::in_memory().unwrap();
        let report = store
            .upsert(&[obs("UNRATE", 2024, 1, 3.7), obs("UNRATE", 2024, 2, 3.9)])
            .unwrap();
        assert_eq!(report.inserted, 2);

        let report = store
            .upsert(&[
                obs("UNRATE", 2024, 1, 3.7),
                obs("UNRATE", 2024, 2, 3.8),
                obs("UNRATE", 2024, 3, 3.8),
            ])
            .unwrap();
        assert_eq!(
            report,
            UpsertReport {
                inserted: 1,
                revised: 1,
                unchanged: 1,
                removed: 0,
            }
        );

        let stored = store.load_observations("UNRATE").unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[1].value, 3.8);

        let log = store.revisions(Some("UNRATE")).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].period, p(2024, 2));
        assert_eq!(log[0].old_value, 3.9);
        assert_eq!(log[0].new_value, 3.8);
    }

    #[test]
    fn test_conflicting_batch_writes_nothing() {
        let store = ObservationStore::in_memory().unwrap();
        let err = store
            .upsert(&[obs("X", 2024, 1, 1.0), obs("X", 2024, 1, 2.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::Metrics(MetricsError::DuplicatePeriod { .. })
        ));
        assert_eq!(store.get_stats().unwrap().observations, 0);

        // identical repeats collapse
        let report = store
            .upsert(&[obs("X", 2024, 1, 1.0), obs("X", 2024, 1, 1.0)])
            .unwrap();
        assert_eq!(report.inserted, 1);
    }

    #[test]
    fn test_last_period_and_ids() {
        let store = ObservationStore::in_memory().unwrap();
        assert_eq!(store.last_period("CPIAUCSL").unwrap(), None);
        store
            .upsert(&[
                obs("CPIAUCSL", 2023, 12, 306.7),
                obs("CPIAUCSL", 2024, 1, 308.4),
                obs("WPU081", 2023, 11, 250.0),
            ])
            .unwrap();
        assert_eq!(store.last_period("CPIAUCSL").unwrap(), Some(p(2024, 1)));
        assert_eq!(store.series_ids().unwrap(), vec!["CPIAUCSL", "WPU081"]);
    }

    #[test]
    fn test_load_series_uses_spec_unit() {
        let store = ObservationStore::in_memory().unwrap();
        store
            .upsert(&[obs("FEDFUNDS", 2024, 2, 5.33), obs("FEDFUNDS", 2024, 1, 5.33)])
            .unwrap();
        let spec = SeriesSpec::new("FEDFUNDS", "Fed Funds", ChangeUnit::Absolute, SourceKind::Fred);
        let series = store.load_series(&spec).unwrap();
        assert_eq!(series.unit(), ChangeUnit::Absolute);
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_period(), Some(p(2024, 1)));
    }

    #[test]
    fn test_clear_series_keeps_revision_log() {
        let store = ObservationStore::in_memory().unwrap();
        store.upsert(&[obs("X", 2024, 1, 1.0)]).unwrap();
        store.upsert(&[obs("X", 2024, 1, 1.5)]).unwrap();
        store.upsert(&[obs("Y", 2024, 1, 9.0)]).unwrap();

        assert_eq!(store.clear_series("X").unwrap(), 1);
        let stats = store.get_stats().unwrap();
        assert_eq!(stats.observations, 1);
        assert_eq!(stats.series, 1);
        assert_eq!(stats.revisions, 1);
        assert_eq!(store.revisions(None).unwrap().len(), 1);
    }

    #[test]
    fn test_replace_drops_unpublished_periods() {
        let store = ObservationStore::in_memory().unwrap();
        store
            .upsert(&[
                obs("X", 2023, 12, 1.0),
                obs("X", 2024, 1, 2.0),
                obs("X", 2024, 2, 3.0),
                obs("Y", 2024, 1, 9.0),
            ])
            .unwrap();

        // upstream stopped publishing 2023-12 and corrected 2024-02
        let report = store
            .replace(&[obs("X", 2024, 1, 2.0), obs("X", 2024, 2, 3.5)])
            .unwrap();
        assert_eq!(
            report,
            UpsertReport {
                inserted: 0,
                revised: 1,
                unchanged: 1,
                removed: 1,
            }
        );

        let periods: Vec<_> = store
            .load_observations("X")
            .unwrap()
            .into_iter()
            .map(|o| o.period)
            .collect();
        assert_eq!(periods, vec![p(2024, 1), p(2024, 2)]);
        assert_eq!(store.load_observations("Y").unwrap().len(), 1);
        assert_eq!(store.revisions(Some("X")).unwrap().len(), 1);
    }

    #[test]
    fn test_replace_with_empty_batch_keeps_everything() {
        let store = ObservationStore::in_memory().unwrap();
        store.upsert(&[obs("X", 2024, 1, 1.0)]).unwrap();
        assert_eq!(store.replace(&[]).unwrap(), UpsertReport::default());
        assert_eq!(store.get_stats().unwrap().observations, 1);
    }

    #[test]
    fn test_rejects_non_finite() {
        let store = ObservationStore::in_memory().unwrap();
        assert!(store.upsert(&[obs("X", 2024, 1, f64::NAN)]).is_err());
    }

    #[test]
    fn test_store_stats() {
        let store = ObservationStore::in_memory().unwrap();
        let stats = store.get_stats().unwrap();
        assert_eq!(stats.observations, 0);
        assert_eq!(stats.series, 0);
        assert_eq!(stats.revisions, 0);
        assert_eq!(stats.latest_period, None);
    }
}

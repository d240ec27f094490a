//! Observations and the series that own them.
//!
//! A [`Series`] is the single source of truth for one statistic: an ordered,
//! duplicate-free map from period to value plus the change unit fixed at
//! ingestion. Derived metrics are recomputed from it and never stored back.

use crate::catalog::SeriesCatalog;
use crate::change::ChangeUnit;
use crate::error::{MetricsError, Result};
use crate::period::Period;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::debug;

/// One value of one series for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Series identifier (e.g. `CPIAUCSL`, `WPU081`)
    pub series_id: String,
    /// Month the value refers to
    pub period: Period,
    /// Observed value
    pub value: f64,
}

impl Observation {
    /// Create a new observation.
    pub fn new(series_id: impl Into<String>, period: Period, value: f64) -> Self {
        Self {
            series_id: series_id.into(),
            period,
            value,
        }
    }
}

/// A replaced value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// Period whose value changed
    pub period: Period,
    /// Value before the revision
    pub old_value: f64,
    /// Value after the revision
    pub new_value: f64,
}

/// Outcome of merging a batch into an existing series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Periods that were not recorded before
    pub appended: Vec<Period>,
    /// Periods whose recorded value was corrected
    pub revised: Vec<Revision>,
    /// Periods that arrived again with the same value
    pub unchanged: usize,
}

impl MergeReport {
    /// Earliest period whose value is new or different, if any.
    ///
    /// Metrics before this period are unaffected by the merge.
    pub fn earliest_change(&self) -> Option<Period> {
        self.appended
            .iter()
            .copied()
            .chain(self.revised.iter().map(|r| r.period))
            .min()
    }
}

/// Ordered history of one statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    id: String,
    unit: ChangeUnit,
    values: BTreeMap<Period, f64>,
}

impl Series {
    /// Create an empty series.
    pub fn new(id: impl Into<String>, unit: ChangeUnit) -> Self {
        Self {
            id: id.into(),
            unit,
            values: BTreeMap::new(),
        }
    }

    /// Build a series from unordered points.
    ///
    /// Repeated periods with identical values collapse; repeated periods
    /// with different values are a [`MetricsError::DuplicatePeriod`].
    pub fn from_points<I>(id: impl Into<String>, unit: ChangeUnit, points: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Period, f64)>,
    {
        let id = id.into();
        let values = collate(&id, points)?;
        Ok(Self { id, unit, values })
    }

    /// Series identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Change unit used for every derived change.
    pub const fn unit(&self) -> ChangeUnit {
        self.unit
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value recorded for a period.
    pub fn get(&self, period: Period) -> Option<f64> {
        self.values.get(&period).copied()
    }

    /// Earliest recorded period.
    pub fn first_period(&self) -> Option<Period> {
        self.values.keys().next().copied()
    }

    /// Latest recorded period.
    pub fn last_period(&self) -> Option<Period> {
        self.values.keys().next_back().copied()
    }

    /// Latest observation.
    pub fn latest(&self) -> Option<(Period, f64)> {
        self.values.iter().next_back().map(|(p, v)| (*p, *v))
    }

    /// Observations in ascending period order.
    pub fn iter(&self) -> impl Iterator<Item = (Period, f64)> + '_ {
        self.values.iter().map(|(p, v)| (*p, *v))
    }

    /// Append a value after the latest recorded period.
    pub fn append(&mut self, period: Period, value: f64) -> Result<()> {
        self.check_value(period, value)?;
        if let Some(last) = self.last_period()
            && period <= last
        {
            return Err(MetricsError::OutOfOrder {
                series_id: self.id.clone(),
                period,
                last,
            });
        }
        self.values.insert(period, value);
        Ok(())
    }

    /// Replace the value of an already recorded period.
    ///
    /// Returns the previous value.
    pub fn revise(&mut self, period: Period, value: f64) -> Result<f64> {
        self.check_value(period, value)?;
        match self.values.get_mut(&period) {
            Some(slot) => {
                let old = *slot;
                *slot = value;
                debug!(series = %self.id, %period, old, new = value, "revised observation");
                Ok(old)
            }
            None => Err(MetricsError::NotRecorded {
                series_id: self.id.clone(),
                period,
            }),
        }
    }

    /// Merge a batch from a later pull.
    ///
    /// New periods are inserted, periods whose value differs from the
    /// recorded one are treated as corrections, and identical re-deliveries
    /// are counted but change nothing. The batch itself must be consistent:
    /// conflicting values for one period inside the batch are rejected
    /// before anything is applied.
    pub fn merge(&mut self, batch: &[Observation]) -> Result<MergeReport> {
        if let Some(stray) = batch.iter().find(|o| o.series_id != self.id) {
            return Err(MetricsError::SeriesMismatch {
                expected: self.id.clone(),
                found: stray.series_id.clone(),
            });
        }
        let incoming = collate(&self.id, batch.iter().map(|o| (o.period, o.value)))?;

        let mut report = MergeReport::default();
        for (period, value) in incoming {
            match self.values.entry(period) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                    report.appended.push(period);
                }
                Entry::Occupied(mut slot) => {
                    let old_value = *slot.get();
                    if old_value.to_bits() == value.to_bits() {
                        report.unchanged += 1;
                    } else {
                        slot.insert(value);
                        report.revised.push(Revision {
                            period,
                            old_value,
                            new_value: value,
                        });
                    }
                }
            }
        }

        debug!(
            series = %self.id,
            appended = report.appended.len(),
            revised = report.revised.len(),
            unchanged = report.unchanged,
            "merged batch"
        );
        Ok(report)
    }

    fn check_value(&self, period: Period, value: f64) -> Result<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(MetricsError::InvalidValue {
                series_id: self.id.clone(),
                period,
                value,
            })
        }
    }
}

/// Sort and deduplicate points for one series.
fn collate<I>(series_id: &str, points: I) -> Result<BTreeMap<Period, f64>>
where
    I: IntoIterator<Item = (Period, f64)>,
{
    let mut values = BTreeMap::new();
    for (period, value) in points {
        if !value.is_finite() {
            return Err(MetricsError::InvalidValue {
                series_id: series_id.to_string(),
                period,
                value,
            });
        }
        match values.entry(period) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(slot) => {
                let first: f64 = *slot.get();
                if first.to_bits() != value.to_bits() {
                    return Err(MetricsError::DuplicatePeriod {
                        series_id: series_id.to_string(),
                        period,
                        first,
                        second: value,
                    });
                }
            }
        }
    }
    Ok(values)
}

/// Group an upstream batch into series.
///
/// The batch may arrive in any order and may repeat observations. Each
/// series takes its change unit from the catalog; a series the catalog does
/// not know is rejected rather than guessed. Series come back sorted by id.
pub fn ingest(batch: Vec<Observation>, catalog: &SeriesCatalog) -> Result<Vec<Series>> {
    let mut grouped: BTreeMap<String, Vec<(Period, f64)>> = BTreeMap::new();
    for obs in batch {
        grouped
            .entry(obs.series_id)
            .or_default()
            .push((obs.period, obs.value));
    }

    grouped
        .into_iter()
        .map(|(id, points)| {
            let unit = catalog
                .get(&id)
                .map(|spec| spec.unit)
                .ok_or_else(|| MetricsError::UnknownSeries(id.clone()))?;
            Series::from_points(id, unit, points)
        })
        .collect()
}

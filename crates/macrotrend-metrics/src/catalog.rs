//! Series catalog.
//!
//! The catalog is where a series' change unit is decided. Ingestion reads
//! the unit from here once; nothing downstream infers it from the series id.

use crate::change::ChangeUnit;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upstream statistics API a series is pulled from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Federal Reserve Economic Data (St. Louis Fed)
    #[display("FRED")]
    Fred,
    /// Bureau of Labor Statistics public API
    #[display("BLS")]
    Bls,
}

/// Configuration of a single series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSpec {
    /// Upstream series identifier
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Unit for derived changes
    pub unit: ChangeUnit,
    /// Where the series is fetched from
    pub source: SourceKind,
}

impl SeriesSpec {
    /// Create a new series spec.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: ChangeUnit,
        source: SourceKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit,
            source,
        }
    }
}

/// Set of configured series, indexed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SeriesSpec>", into = "Vec<SeriesSpec>")]
pub struct SeriesCatalog {
    specs: Vec<SeriesSpec>,
    index: HashMap<String, usize>,
}

impl SeriesCatalog {
    /// Build a catalog. When an id repeats, the first spec wins.
    pub fn new(specs: Vec<SeriesSpec>) -> Self {
        let mut catalog = Self::default();
        for spec in specs {
            catalog.insert(spec);
        }
        catalog
    }

    /// Add a spec unless its id is already present. Returns whether it was added.
    pub fn insert(&mut self, spec: SeriesSpec) -> bool {
        if self.index.contains_key(&spec.id) {
            return false;
        }
        self.index.insert(spec.id.clone(), self.specs.len());
        self.specs.push(spec);
        true
    }

    /// Look up a spec by id.
    pub fn get(&self, id: &str) -> Option<&SeriesSpec> {
        self.index.get(id).map(|&i| &self.specs[i])
    }

    /// Whether a series is configured.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All specs in insertion order.
    pub fn specs(&self) -> &[SeriesSpec] {
        &self.specs
    }

    /// Specs fetched from one source.
    pub fn by_source(&self, source: SourceKind) -> Vec<&SeriesSpec> {
        self.specs.iter().filter(|s| s.source == source).collect()
    }

    /// Number of configured series.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl From<Vec<SeriesSpec>> for SeriesCatalog {
    fn from(specs: Vec<SeriesSpec>) -> Self {
        Self::new(specs)
    }
}

impl From<SeriesCatalog> for Vec<SeriesSpec> {
    fn from(catalog: SeriesCatalog) -> Self {
        catalog.specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SeriesCatalog {
        SeriesCatalog::new(vec![
            SeriesSpec::new("UNRATE", "Unemployment Rate", ChangeUnit::Absolute, SourceKind::Fred),
            SeriesSpec::new("WPU081", "Lumber", ChangeUnit::Relative, SourceKind::Bls),
            SeriesSpec::new("UNRATE", "Duplicate", ChangeUnit::Relative, SourceKind::Fred),
        ])
    }

    #[test]
    fn test_first_spec_wins() {
        let catalog = sample();
        assert_eq!(catalog.len(), 2);
        let spec = catalog.get("UNRATE").unwrap();
        assert_eq!(spec.unit, ChangeUnit::Absolute);
        assert_eq!(spec.name, "Unemployment Rate");
    }

    #[test]
    fn test_by_source() {
        let catalog = sample();
        let bls = catalog.by_source(SourceKind::Bls);
        assert_eq!(bls.len(), 1);
        assert_eq!(bls[0].id, "WPU081");
    }

    #[test]
    fn test_serde_as_list() {
        let catalog = sample();
        let json = serde_json::to_string(&catalog).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"points\""));
        assert!(json.contains("\"bls\""));
        let back: SeriesCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, catalog);
    }
}

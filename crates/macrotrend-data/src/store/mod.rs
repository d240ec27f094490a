//! Persistent observation storage.

pub mod sqlite;

pub use sqlite::{ObservationStore, RevisionRecord, StoreStats, UpsertReport};

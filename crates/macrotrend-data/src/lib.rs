#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/macrotrend/macrotrend/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bls;
pub mod error;
pub mod firestore;
pub mod fred;
mod http;
pub mod store;

pub use bls::{BlsClient, BlsObservation};
pub use error::{DataError, Result};
pub use firestore::FirestoreClient;
pub use fred::FredClient;
pub use store::{ObservationStore, RevisionRecord, StoreStats, UpsertReport};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

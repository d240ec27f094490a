//! Bureau of Labor Statistics (BLS) public API adapter.

pub mod client;

pub use client::{
    BlsClient, BlsObservation, MAX_SERIES_PER_REQUEST, MAX_YEARS_PER_REQUEST, parse_response,
    year_spans,
};

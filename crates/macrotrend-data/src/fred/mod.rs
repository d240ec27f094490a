//! Federal Reserve Economic Data (FRED) adapter.

pub mod client;

pub use client::{FredClient, parse_observations};

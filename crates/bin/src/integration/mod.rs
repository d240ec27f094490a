//! Integration layer for the CLI.
//!
//! Configuration loading, the observation store location, and the
//! pull/compute/sync pipeline that ties the library crates together.

pub(crate) mod config;
pub(crate) mod pipeline;
pub(crate) mod store_manager;

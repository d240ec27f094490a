//! Cloud Firestore REST adapter for pushing summary documents.

pub mod client;

pub use client::{FirestoreClient, encode_fields, encode_value};

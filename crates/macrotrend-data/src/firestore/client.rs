//! Firestore REST client.
//!
//! Documents are written with `PATCH`, which creates the document or
//! replaces its fields. Field values are typed the way the REST API
//! expects: strings as `stringValue`, numbers as `doubleValue`, booleans as
//! `booleanValue`. Null fields are omitted so an undefined metric never
//! shows up as zero.

use crate::error::{DataError, Result};
use crate::http::{RateLimiter, build_client};
use reqwest::Url;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Firestore REST API base URL
const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Default rate limit between writes
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(50);

/// Encode one JSON value as a Firestore typed value. `None` for null.
pub fn encode_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(json!({ "booleanValue": b })),
        Value::Number(n) => n.as_f64().map(|f| json!({ "doubleValue": f })),
        Value::String(s) => Some(json!({ "stringValue": s })),
        other => Some(json!({ "stringValue": other.to_string() })),
    }
}

/// Encode a flat JSON object as a Firestore document body.
pub fn encode_fields(fields: &Map<String, Value>) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .filter_map(|(key, value)| encode_value(value).map(|v| (key.clone(), v)))
        .collect();
    json!({ "fields": encoded })
}

/// Firestore REST client
pub struct FirestoreClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
    project_id: String,
    bearer_token: Option<String>,
}

impl FirestoreClient {
    /// Create a client for a project.
    ///
    /// The bearer token is sent as-is; obtaining one is left to the caller.
    pub fn new(project_id: impl Into<String>, bearer_token: Option<String>) -> Result<Self> {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Err(DataError::Firestore("Empty project id".to_string()));
        }

        Ok(Self {
            client: build_client()?,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            base_url: FIRESTORE_BASE_URL.to_string(),
            project_id,
            bearer_token: bearer_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Point the client at a different API root (e.g. the local emulator).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// URL of a document, with every path segment percent-encoded.
    pub fn document_url(&self, collection: &str, document_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| DataError::Firestore(format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| DataError::Firestore("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend([
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                collection,
                document_id,
            ]);
        Ok(url)
    }

    /// Create or replace a document.
    pub async fn patch_document(
        &self,
        collection: &str,
        document_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<()> {
        if document_id.is_empty() {
            return Err(DataError::Firestore("Empty document id".to_string()));
        }
        let url = self.document_url(collection, document_id)?;
        let body = encode_fields(fields);

        self.rate_limiter.lock().await.wait().await;
        debug!(%url, "patching document");

        let mut request = self.client.patch(url).json(&body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(DataError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DataError::Firestore(format!(
                "Failed to write {}/{}: HTTP {}: {}",
                collection, document_id, status, detail
            )));
        }

        info!(collection, document = document_id, "uploaded document");
        Ok(())
    }
}

impl std::fmt::Debug for FirestoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreClient")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("authenticated", &self.bearer_token.is_some())
            .finish_non_exhaustive()
    }
}

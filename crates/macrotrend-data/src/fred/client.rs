//! FRED API client with rate limiting.
//!
//! Observations are requested at monthly frequency so that daily and weekly
//! series (policy rates, yields) arrive as one value per month.

use crate::error::{DataError, Result};
use crate::http::{RateLimiter, build_client};
use macrotrend_metrics::{Observation, Period};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// FRED series observations endpoint
const FRED_OBSERVATIONS_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Default rate limit: FRED allows 120 requests per minute
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(500);

/// Marker FRED uses for a missing value
const MISSING_VALUE: &str = ".";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_message: String,
}

/// Parse a FRED observations payload.
///
/// Missing values (`"."`) are skipped. A date or value that cannot be parsed
/// is an error rather than a silently dropped row.
pub fn parse_observations(series_id: &str, body: &str) -> Result<Vec<Observation>> {
    let response: ObservationsResponse = serde_json::from_str(body)?;

    response
        .observations
        .into_iter()
        .filter(|raw| raw.value.trim() != MISSING_VALUE)
        .map(|raw| -> Result<Observation> {
            let period: Period = raw.date.parse()?;
            let value: f64 = raw.value.trim().parse().map_err(|_| {
                DataError::Parse(format!(
                    "{} value {:?} at {} is not a number",
                    series_id, raw.value, raw.date
                ))
            })?;
            Ok(Observation::new(series_id, period, value))
        })
        .collect()
}

/// FRED API client with rate limiting
pub struct FredClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
    api_key: String,
}

impl FredClient {
    /// Create a client with the default rate limit.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_rate_limit(api_key, DEFAULT_RATE_LIMIT)
    }

    /// Create a client with a custom minimum interval between requests.
    pub fn with_rate_limit(api_key: impl Into<String>, min_interval: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DataError::MissingApiKey("FRED"));
        }

        Ok(Self {
            client: build_client()?,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(min_interval))),
            base_url: FRED_OBSERVATIONS_URL.to_string(),
            api_key,
        })
    }

    /// Point the client at a different observations endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch monthly observations of a series from `start` onwards.
    ///
    /// # Example
    /// ```no_run
    /// use macrotrend_data::FredClient;
    /// use macrotrend_metrics::Period;
    ///
    /// # async fn example() -> macrotrend_data::Result<()> {
    /// let client = FredClient::new("my-api-key")?;
    /// let observations = client
    ///     .fetch_observations("CPIAUCSL", Period::new(2020, 1)?)
    ///     .await?;
    /// println!("{} observations", observations.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_observations(
        &self,
        series_id: &str,
        start: Period,
    ) -> Result<Vec<Observation>> {
        if series_id.is_empty() {
            return Err(DataError::FredApi("Empty series id".to_string()));
        }

        self.rate_limiter.lock().await.wait().await;

        let observation_start = start.first_day().to_string();
        debug!(series = series_id, %observation_start, "requesting FRED observations");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("series_id", series_id),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("frequency", "m"),
                ("observation_start", observation_start.as_str()),
            ])
            .send()
            .await
            .map_err(DataError::Network)?;

        let status = response.status();
        let body = response.text().await.map_err(DataError::Network)?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error_message)
                .unwrap_or(body);
            return Err(DataError::FredApi(format!(
                "Failed to fetch {}: HTTP {}: {}",
                series_id, status, detail
            )));
        }

        let observations = parse_observations(series_id, &body)?;
        info!(
            series = series_id,
            count = observations.len(),
            "fetched FRED observations"
        );
        Ok(observations)
    }
}

impl std::fmt::Debug for FredClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FredClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

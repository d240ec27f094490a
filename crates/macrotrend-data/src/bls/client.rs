//! BLS API v2 client with rate limiting.
//!
//! One request carries at most [`MAX_SERIES_PER_REQUEST`] series and spans
//! at most [`MAX_YEARS_PER_REQUEST`] years, so a pull is split into a grid
//! of series chunks by year spans.

use crate::error::{DataError, Result};
use crate::http::{RateLimiter, build_client};
use macrotrend_metrics::{Observation, Period};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// BLS time series data endpoint
const BLS_DATA_URL: &str = "https://api.bls.gov/publicAPI/v2/timeseries/data/";

/// Default rate limit between requests
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(250);

/// Most series the API accepts in one request
pub const MAX_SERIES_PER_REQUEST: usize = 50;

/// Longest span of years the API accepts in one request
pub const MAX_YEARS_PER_REQUEST: i32 = 20;

/// Status reported by a successful request
const REQUEST_SUCCEEDED: &str = "REQUEST_SUCCEEDED";

/// Footnote code marking a preliminary value
const PRELIMINARY_CODE: &str = "P";

#[derive(Debug, Serialize)]
struct DataRequest<'a> {
    seriesid: &'a [String],
    startyear: String,
    endyear: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    registrationkey: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct DataResponse {
    status: String,
    #[serde(default)]
    message: Vec<String>,
    #[serde(rename = "Results")]
    results: Option<ResultsBlock>,
}

#[derive(Debug, Deserialize)]
struct ResultsBlock {
    #[serde(default)]
    series: Vec<SeriesBlock>,
}

#[derive(Debug, Deserialize)]
struct SeriesBlock {
    #[serde(rename = "seriesID")]
    series_id: String,
    #[serde(default)]
    data: Vec<DataPoint>,
}

#[derive(Debug, Deserialize)]
struct DataPoint {
    year: String,
    period: String,
    value: String,
    #[serde(default)]
    footnotes: Vec<Footnote>,
}

#[derive(Debug, Default, Deserialize)]
struct Footnote {
    code: Option<String>,
}

/// An observation as published by BLS.
#[derive(Debug, Clone, PartialEq)]
pub struct BlsObservation {
    /// The observation itself
    pub observation: Observation,
    /// Whether BLS marked the value preliminary (subject to revision)
    pub preliminary: bool,
}

/// Split `[start, end]` into consecutive spans of at most
/// [`MAX_YEARS_PER_REQUEST`] years.
pub fn year_spans(start: i32, end: i32) -> Result<Vec<(i32, i32)>> {
    if start > end {
        return Err(DataError::InvalidYearRange { start, end });
    }
    let mut spans = Vec::new();
    let mut from = start;
    while from <= end {
        let to = (from + MAX_YEARS_PER_REQUEST - 1).min(end);
        spans.push((from, to));
        from = to + 1;
    }
    Ok(spans)
}

/// Parse a BLS v2 response payload.
///
/// Only monthly periods (`M01`..`M12`) are kept; annual averages (`M13`) and
/// quarterly or semiannual periods are dropped. Values of `-` or empty are
/// unavailable and skipped. Any status other than `REQUEST_SUCCEEDED` is an
/// error carrying the API's messages.
pub fn parse_response(body: &str) -> Result<Vec<BlsObservation>> {
    let response: DataResponse = serde_json::from_str(body)?;

    if response.status != REQUEST_SUCCEEDED {
        return Err(DataError::BlsApi(format!(
            "{}: {}",
            response.status,
            response.message.join("; ")
        )));
    }
    for message in &response.message {
        warn!(%message, "BLS API message");
    }

    let mut out = Vec::new();
    for series in response.results.map(|r| r.series).unwrap_or_default() {
        for point in series.data {
            if !is_monthly(&point.period) {
                continue;
            }
            let raw = point.value.trim();
            if raw.is_empty() || raw == "-" {
                continue;
            }
            let period = Period::from_bls(&point.year, &point.period)?;
            let value: f64 = raw.parse().map_err(|_| {
                DataError::Parse(format!(
                    "{} value {:?} at {} is not a number",
                    series.series_id, point.value, period
                ))
            })?;
            let preliminary = point
                .footnotes
                .iter()
                .any(|f| f.code.as_deref() == Some(PRELIMINARY_CODE));
            out.push(BlsObservation {
                observation: Observation::new(series.series_id.trim(), period, value),
                preliminary,
            });
        }
    }
    Ok(out)
}

fn is_monthly(period: &str) -> bool {
    period
        .strip_prefix('M')
        .and_then(|m| m.parse::<u32>().ok())
        .is_some_and(|m| (1..=12).contains(&m))
}

/// BLS API client with rate limiting
pub struct BlsClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
    registration_key: Option<String>,
}

impl BlsClient {
    /// Create a client. The registration key is optional; without it BLS
    /// applies its lower anonymous quotas.
    pub fn new(registration_key: Option<String>) -> Result<Self> {
        Self::with_rate_limit(registration_key, DEFAULT_RATE_LIMIT)
    }

    /// Create a client with a custom minimum interval between requests.
    pub fn with_rate_limit(
        registration_key: Option<String>,
        min_interval: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(min_interval))),
            base_url: BLS_DATA_URL.to_string(),
            registration_key: registration_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Point the client at a different data endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether requests carry a registration key.
    pub fn is_registered(&self) -> bool {
        self.registration_key.is_some()
    }

    /// Fetch monthly observations of many series for `[start_year, end_year]`.
    ///
    /// # Example
    /// ```no_run
    /// use macrotrend_data::BlsClient;
    ///
    /// # async fn example() -> macrotrend_data::Result<()> {
    /// let client = BlsClient::new(None)?;
    /// let ids = vec!["WPU081".to_string(), "WPU1017".to_string()];
    /// let observations = client.fetch(&ids, 2015, 2024).await?;
    /// println!("{} observations", observations.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch(
        &self,
        series_ids: &[String],
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<BlsObservation>> {
        let spans = year_spans(start_year, end_year)?;
        let mut out = Vec::new();

        for chunk in series_ids.chunks(MAX_SERIES_PER_REQUEST) {
            for &(from, to) in &spans {
                out.extend(self.fetch_span(chunk, from, to).await?);
            }
        }

        info!(
            series = series_ids.len(),
            count = out.len(),
            preliminary = out.iter().filter(|o| o.preliminary).count(),
            "fetched BLS observations"
        );
        Ok(out)
    }

    async fn fetch_span(
        &self,
        series_ids: &[String],
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<BlsObservation>> {
        let request = DataRequest {
            seriesid: series_ids,
            startyear: start_year.to_string(),
            endyear: end_year.to_string(),
            registrationkey: self.registration_key.as_deref(),
        };

        self.rate_limiter.lock().await.wait().await;
        debug!(
            series = series_ids.len(),
            start_year, end_year, "requesting BLS data"
        );

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(DataError::Network)?;

        if !response.status().is_success() {
            return Err(DataError::BlsApi(format!(
                "Failed to fetch {} series for {}-{}: HTTP {}",
                series_ids.len(),
                start_year,
                end_year,
                response.status()
            )));
        }

        let body = response.text().await.map_err(DataError::Network)?;
        parse_response(&body)
    }
}

impl std::fmt::Debug for BlsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlsClient")
            .field("base_url", &self.base_url)
            .field("registered", &self.is_registered())
            .finish_non_exhaustive()
    }
}

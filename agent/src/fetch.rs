use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use vitals_core::dictionary::{self, Indicator};

use crate::cache::Cache;

const WORLD_BANK_BASE_URL: &str = "https://api.worldbank.org/v2";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "vitals-agent/1.0";

/// Health statistics update roughly annually, so a long TTL is safe.
pub const CACHE_TTL: Duration = Duration::from_secs(90 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(
        "Country '{0}' not recognized. Try countries like: Nigeria, USA, India, UK, Kenya, Brazil, Japan, etc."
    )]
    CountryNotFound(String),
    /// Legitimate data-absence outcome, distinct from transport
    /// failures: the World Bank simply has no recent value for this
    /// country/indicator pair.
    #[error(
        "No recent data available for {country} - {indicator}. The World Bank may not have this data for this country."
    )]
    NoData { country: String, indicator: String },
    #[error("World Bank API error: {status} {status_text}")]
    Upstream { status: u16, status_text: String },
    /// Distinct from `Transport` so callers can retry timeouts without
    /// retrying data absence.
    #[error("Request timeout: World Bank API took too long to respond. Please try again.")]
    Timeout,
    #[error("Failed to fetch health data: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Shaped statistic for one (country, indicator) pair. Country name and
/// code come from the upstream payload, not the caller's input, since
/// the World Bank normalizes display names itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatResult {
    pub country: String,
    pub country_code: String,
    pub indicator: String,
    pub indicator_name: String,
    pub value: Option<f64>,
    pub year: String,
    pub unit: String,
    pub success: bool,
}

/// Fetches one indicator value for one country, cache-first.
///
/// The cache handle is injected at construction; the fetcher owns no
/// process-wide state.
pub struct StatsFetcher {
    http: reqwest::Client,
    cache: Arc<dyn Cache>,
    base_url: String,
}

impl StatsFetcher {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self::with_base_url(cache, WORLD_BANK_BASE_URL)
    }

    pub fn with_base_url(cache: Arc<dyn Cache>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            cache,
            base_url: base_url.into(),
        }
    }

    pub async fn fetch(&self, country: &str, indicator: Indicator) -> Result<StatResult, FetchError> {
        let code = dictionary::resolve_country(country)
            .ok_or_else(|| FetchError::CountryNotFound(country.to_string()))?;

        let cache_key = cache_key(code, indicator);
        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Ok(result) = serde_json::from_value::<StatResult>(cached) {
                return Ok(result);
            }
            // Stale shape from an older deployment; fall through to refetch.
        }

        let url = format!(
            "{}/country/{}/indicator/{}?format=json&mrnev=1&per_page=1",
            self.base_url,
            code,
            indicator.series_code()
        );
        tracing::info!(event = "world_bank_fetch", country = %code, indicator = indicator.key());

        let response = self
            .http
            .get(&url)
            .timeout(FETCH_TIMEOUT)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Transport(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let payload: Value = response.json().await.map_err(FetchError::Transport)?;
        let result = shape_stat_result(&payload, country, indicator)?;

        self.cache
            .set(&cache_key, &serde_json::to_value(&result).unwrap_or(Value::Null), CACHE_TTL)
            .await;

        Ok(result)
    }
}

pub fn cache_key(country_code: &str, indicator: Indicator) -> String {
    format!("health:{}:{}", country_code, indicator.key())
}

/// Shape the World Bank response: a 2-element array of
/// `[metadata, dataPoints[]]` where the first data point carries the
/// most recent non-empty value. An absent/empty array or a null value
/// is data absence, not a transport fault.
fn shape_stat_result(
    payload: &Value,
    requested_country: &str,
    indicator: Indicator,
) -> Result<StatResult, FetchError> {
    let no_data = || FetchError::NoData {
        country: requested_country.to_string(),
        indicator: indicator.key().to_string(),
    };

    let point = payload
        .get(1)
        .and_then(Value::as_array)
        .and_then(|points| points.first())
        .ok_or_else(no_data)?;

    let value = point.get("value").and_then(Value::as_f64).ok_or_else(no_data)?;

    Ok(StatResult {
        country: point
            .pointer("/country/value")
            .and_then(Value::as_str)
            .unwrap_or(requested_country)
            .to_string(),
        country_code: point
            .get("countryiso3code")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        indicator: indicator.key().to_string(),
        indicator_name: indicator.display_name().to_string(),
        value: Some(value),
        year: point
            .get("date")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        unit: indicator.unit().to_string(),
        success: true,
    })
}

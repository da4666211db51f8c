//! The rate provider trait and the two HTTP implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use time::Date;

use crate::currency::CurrencyCode;

/// Why a single provider attempt failed.
///
/// These errors never leave the resolver; they only decide whether the next
/// provider in the chain is tried.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request could not be sent or the response body could not be read.
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider responded with a non-success HTTP status.
    #[error("provider returned HTTP status {0}")]
    Status(u16),

    /// The response parsed, but did not contain a usable rate for the
    /// requested currency.
    #[error("no usable rate for {0} in the provider response")]
    MissingRate(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        ProviderError::Transport(error.to_string())
    }
}

/// A single source of conversion rates.
///
/// Providers share one contract so the resolver can hold them as a uniform,
/// ordered list: given a currency pair and an optional as-of date, return
/// the multiplier from `from` to `to`. Providers that only serve latest
/// rates ignore the date.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// A short name for log messages.
    fn name(&self) -> &'static str;

    /// Fetch the rate converting one unit of `from` into `to`.
    async fn fetch_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: Option<Date>,
    ) -> Result<f64, ProviderError>;
}

/// The response body shape shared by both providers: a map of quote
/// currency to rate.
#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

impl RatesResponse {
    fn rate_for(&self, to: &CurrencyCode) -> Result<f64, ProviderError> {
        self.rates
            .get(to.as_str())
            .copied()
            .ok_or_else(|| ProviderError::MissingRate(to.to_string()))
    }
}

async fn parse_rates_response(response: reqwest::Response) -> Result<RatesResponse, ProviderError> {
    if !response.status().is_success() {
        return Err(ProviderError::Status(response.status().as_u16()));
    }

    Ok(response.json::<RatesResponse>().await?)
}

const EXCHANGE_RATE_HOST_URL: &str = "https://api.exchangerate.host";

/// The primary provider. Serves both latest and historical rates, keyed by
/// base currency and quote symbol.
pub struct ExchangeRateHost {
    client: reqwest::Client,
    base_url: String,
}

impl ExchangeRateHost {
    /// Create a provider pointing at the real exchangerate.host API.
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, EXCHANGE_RATE_HOST_URL)
    }

    /// Create a provider pointing at `base_url` instead of the real API.
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl RateProvider for ExchangeRateHost {
    fn name(&self) -> &'static str {
        "exchangerate.host"
    }

    async fn fetch_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: Option<Date>,
    ) -> Result<f64, ProviderError> {
        // An as-of date selects the historical endpoint, e.g. "/2024-01-05".
        let path = match as_of {
            Some(date) => date.to_string(),
            None => "latest".to_owned(),
        };
        let url = format!("{}/{path}?base={from}&symbols={to}", self.base_url);

        let response = self.client.get(url).send().await?;

        parse_rates_response(response).await?.rate_for(to)
    }
}

const OPEN_ER_API_URL: &str = "https://open.er-api.com";

/// The fallback provider. Only serves latest rates, keyed by base currency
/// in the path; the as-of date is ignored.
pub struct OpenErApi {
    client: reqwest::Client,
    base_url: String,
}

impl OpenErApi {
    /// Create a provider pointing at the real open.er-api.com API.
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, OPEN_ER_API_URL)
    }

    /// Create a provider pointing at `base_url` instead of the real API.
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl RateProvider for OpenErApi {
    fn name(&self) -> &'static str {
        "open.er-api.com"
    }

    async fn fetch_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        _as_of: Option<Date>,
    ) -> Result<f64, ProviderError> {
        let url = format!("{}/v6/latest/{from}", self.base_url);

        let response = self.client.get(url).send().await?;

        parse_rates_response(response).await?.rate_for(to)
    }
}

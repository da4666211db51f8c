//! Foreign-exchange rate resolution.
//!
//! Rates come from an ordered chain of HTTP providers, tried in turn until
//! one yields a usable rate. The chain mirrors the providers the app has
//! always used: exchangerate.host (supports historical as-of dates) first,
//! then open.er-api.com (latest rates only).

mod endpoint;
mod provider;
mod resolver;

pub use endpoint::get_rate;
pub use provider::{ExchangeRateHost, OpenErApi, ProviderError, RateProvider};
pub use resolver::RateResolver;

/// The provider chain used in production: exchangerate.host first, then
/// ER-API as fallback.
pub fn default_provider_chain(client: reqwest::Client) -> Vec<Box<dyn RateProvider>> {
    vec![
        Box::new(ExchangeRateHost::new(client.clone())),
        Box::new(OpenErApi::new(client)),
    ]
}

//! Walks the provider chain to turn a currency pair into a rate.

use time::Date;
use tracing::warn;

use crate::currency::CurrencyCode;

use super::provider::RateProvider;

/// The rate used when every provider fails.
const FALLBACK_RATE: f64 = 1.0;

/// Resolves conversion rates by trying an ordered list of providers.
///
/// Resolution is infallible: if the pair is degenerate or every provider
/// fails, the rate is 1. Callers that need to distinguish a real rate from
/// the fallback should watch the warning logs.
pub struct RateResolver {
    providers: Vec<Box<dyn RateProvider>>,
}

impl RateResolver {
    /// Create a resolver that consults `providers` in order.
    pub fn new(providers: Vec<Box<dyn RateProvider>>) -> Self {
        Self { providers }
    }

    /// Resolve the rate converting one unit of `from` into `to`, optionally
    /// as of a past date.
    ///
    /// A same-currency pair is always 1 and contacts no provider. Rates
    /// that are not finite and positive are treated as provider failures.
    pub async fn resolve(&self, from: &CurrencyCode, to: &CurrencyCode, as_of: Option<Date>) -> f64 {
        if from == to {
            return 1.0;
        }

        for provider in &self.providers {
            match provider.fetch_rate(from, to, as_of).await {
                Ok(rate) if rate.is_finite() && rate > 0.0 => return rate,
                Ok(rate) => {
                    warn!(
                        "provider {} returned unusable rate {rate} for {from}->{to}",
                        provider.name()
                    );
                }
                Err(error) => {
                    warn!(
                        "provider {} failed for {from}->{to}: {error}",
                        provider.name()
                    );
                }
            }
        }

        warn!("no provider produced a rate for {from}->{to}, falling back to {FALLBACK_RATE}");

        FALLBACK_RATE
    }
}

/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - chain                                                |
/// |   - fetchers                                             |
/// |   - service                                              |
/// +----------------------------------------------------------+

/// Ordered fallback over several rate fetchers.
pub mod chain;

/// HTTP adapters for the external rate sources.
pub mod fetchers;

/// Cache-backed rate lookups.
pub mod service;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

pub use chain::FetcherChain;
pub use fetchers::{CurrencyBeaconFetcher, NbuFetcher};
pub use service::RateService;

/// Exchange rate observed for a currency pair
///
/// `value` is the price of one unit of `currency_from` in `currency_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub currency_from: String,
    pub currency_to: String,
    pub value: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl Rate {
    /// Creates a rate observed now
    pub fn new(currency_from: &str, currency_to: &str, value: Decimal) -> Self {
        Self {
            currency_from: currency_from.to_owned(),
            currency_to: currency_to.to_owned(),
            value,
            observed_at: Utc::now(),
        }
    }

    pub fn observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    /// Whether the rate is younger than `freshness` at `now`
    pub fn is_fresh(&self, freshness: Duration, now: DateTime<Utc>) -> bool {
        now - self.observed_at < freshness
    }
}

/// Errors that can occur while acquiring a rate
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetcher cannot quote this currency. Raised before any network call.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// The request could not be sent or the connection failed
    #[error("request to {fetcher} failed: {message}")]
    Network {
        fetcher: &'static str,
        message: String,
    },

    /// The provider answered with a non-200 status
    #[error("{fetcher} responded with status {status}")]
    Status { fetcher: &'static str, status: u16 },

    /// The payload did not have the expected shape
    #[error("unexpected payload from {fetcher}: {message}")]
    Decode {
        fetcher: &'static str,
        message: String,
    },

    /// The provider answered but had no usable rate
    #[error("{fetcher} returned no rate")]
    NoData { fetcher: &'static str },

    /// The deadline for acquiring a rate expired
    #[error("rate fetch timed out")]
    Timeout,

    /// The chain has no links
    #[error("no rate fetchers configured")]
    NoFetchers,
}

impl FetchError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, FetchError::UnsupportedCurrency(_))
    }
}

/// A single rate source
#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Identifier used in logs and errors
    fn name(&self) -> &'static str;

    /// Currency codes this source can quote, `None` if they could not be resolved
    async fn supported_currencies(&self) -> Option<Arc<HashSet<String>>>;

    /// Fetches the current rate for the pair
    ///
    /// Implementations must call [`RateFetcher::ensure_supported`] first so an
    /// unsupported pair never reaches the network.
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Rate, FetchError>;

    /// Fails with `UnsupportedCurrency` unless both codes are supported
    ///
    /// A source whose currency list cannot be resolved supports nothing.
    async fn ensure_supported(&self, from: &str, to: &str) -> Result<(), FetchError> {
        let Some(supported) = self.supported_currencies().await else {
            return Err(FetchError::UnsupportedCurrency(from.to_owned()));
        };

        for code in [from, to] {
            if !supported.contains(code) {
                return Err(FetchError::UnsupportedCurrency(code.to_owned()));
            }
        }
        Ok(())
    }
}

/// Anything able to produce a rate for a pair: the fetcher chain or the cached service
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Rate, FetchError>;
}

/// Port to the persisted rate cache
#[async_trait]
pub trait RateRepository: Send + Sync {
    /// Most recently saved rate for the pair
    async fn latest(&self, from: &str, to: &str) -> Result<Option<Rate>, StorageError>;

    /// Replaces the cached rate for the rate's pair
    async fn save(&self, rate: &Rate) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rate_freshness_is_exclusive_of_the_window() {
        let now = Utc::now();
        let rate = Rate::new("USD", "UAH", dec!(41.2)).observed_at(now - Duration::minutes(30));

        assert!(rate.is_fresh(Duration::hours(1), now));
        assert!(!rate.is_fresh(Duration::minutes(30), now));
    }

    #[test]
    fn only_unsupported_currency_is_flagged_as_unsupported() {
        assert!(FetchError::UnsupportedCurrency("XYZ".into()).is_unsupported());
        assert!(!FetchError::NoData { fetcher: "NBU" }.is_unsupported());
    }
}

//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods      |
// |-------------------------|---------------------------------------------------|------------------|
// | RateService             | Serves rates from the cache, refreshing when stale| fetch_rate       |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{Instrument, Span, debug, info_span, warn};

use super::{FetchError, Rate, RateProvider, RateRepository};

/// Cache in front of a rate provider
///
/// A cached rate younger than `freshness` is returned without touching the
/// provider. Otherwise the provider is asked and its result overwrites the
/// cached entry. Cache errors are logged and treated as a miss; provider
/// errors are returned unchanged.
pub struct RateService {
    repository: Arc<dyn RateRepository>,
    provider: Arc<dyn RateProvider>,
    freshness: Duration,
    span: Span,
}

impl RateService {
    pub fn new(
        repository: Arc<dyn RateRepository>,
        provider: Arc<dyn RateProvider>,
        freshness: Duration,
    ) -> Self {
        Self {
            repository,
            provider,
            freshness,
            span: info_span!("rate_service"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    async fn cached(&self, from: &str, to: &str) -> Option<Rate> {
        match self.repository.latest(from, to).await {
            Ok(Some(rate)) if rate.is_fresh(self.freshness, Utc::now()) => Some(rate),
            Ok(Some(rate)) => {
                debug!(from, to, observed_at = %rate.observed_at, "cached rate is stale");
                None
            }
            Ok(None) => None,
            Err(err) => {
                warn!(from, to, error = %err, "rate cache lookup failed");
                None
            }
        }
    }

    async fn refresh(&self, from: &str, to: &str) -> Result<Rate, FetchError> {
        if let Some(rate) = self.cached(from, to).await {
            debug!(from, to, "serving cached rate");
            return Ok(rate);
        }

        let rate = self.provider.fetch_rate(from, to).await?;
        if let Err(err) = self.repository.save(&rate).await {
            warn!(from, to, error = %err, "failed to cache rate");
        }
        Ok(rate)
    }
}

#[async_trait]
impl RateProvider for RateService {
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Rate, FetchError> {
        self.refresh(from, to).instrument(self.span.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryRateRepository, StorageError};
    use mockall::{mock, predicate::eq};
    use rust_decimal_macros::dec;

    mock! {
        pub Provider {}

        #[async_trait]
        impl RateProvider for Provider {
            async fn fetch_rate(&self, from: &str, to: &str) -> Result<Rate, FetchError>;
        }
    }

    mock! {
        pub Repository {}

        #[async_trait]
        impl RateRepository for Repository {
            async fn latest(&self, from: &str, to: &str) -> Result<Option<Rate>, StorageError>;
            async fn save(&self, rate: &Rate) -> Result<(), StorageError>;
        }
    }

    fn service(repository: Arc<dyn RateRepository>, provider: MockProvider) -> RateService {
        RateService::new(repository, Arc::new(provider), Duration::hours(1))
    }

    #[tokio::test]
    async fn fresh_cache_hit_skips_provider() {
        let repository = Arc::new(InMemoryRateRepository::new());
        repository
            .save(&Rate::new("USD", "UAH", dec!(41.0)).observed_at(Utc::now() - Duration::minutes(5)))
            .await
            .unwrap();

        let mut provider = MockProvider::new();
        provider.expect_fetch_rate().never();

        let rate = service(repository, provider).fetch_rate("USD", "UAH").await.unwrap();
        assert_eq!(rate.value, dec!(41.0));
    }

    #[tokio::test]
    async fn stale_entry_is_refreshed_and_overwritten() {
        let repository = Arc::new(InMemoryRateRepository::new());
        repository
            .save(&Rate::new("USD", "UAH", dec!(40.0)).observed_at(Utc::now() - Duration::hours(2)))
            .await
            .unwrap();

        let mut provider = MockProvider::new();
        provider
            .expect_fetch_rate()
            .with(eq("USD"), eq("UAH"))
            .times(1)
            .returning(|from, to| Ok(Rate::new(from, to, dec!(41.7))));

        let service = service(repository.clone(), provider);
        let rate = service.fetch_rate("USD", "UAH").await.unwrap();

        assert_eq!(rate.value, dec!(41.7));
        let cached = repository.latest("USD", "UAH").await.unwrap().unwrap();
        assert_eq!(cached.value, dec!(41.7));
    }

    #[tokio::test]
    async fn miss_populates_cache_for_next_call() {
        let repository = Arc::new(InMemoryRateRepository::new());
        let mut provider = MockProvider::new();
        provider
            .expect_fetch_rate()
            .times(1)
            .returning(|from, to| Ok(Rate::new(from, to, dec!(41.2))));

        let service = service(repository, provider);
        let first = service.fetch_rate("USD", "UAH").await.unwrap();
        let second = service.fetch_rate("USD", "UAH").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn provider_error_is_propagated_and_nothing_cached() {
        let repository = Arc::new(InMemoryRateRepository::new());
        let mut provider = MockProvider::new();
        provider.expect_fetch_rate().returning(|_, _| {
            Err(FetchError::NoData {
                fetcher: "NBU",
            })
        });

        let err = service(repository.clone(), provider)
            .fetch_rate("USD", "UAH")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::NoData { fetcher: "NBU" }));
        assert!(repository.latest("USD", "UAH").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn storage_failures_do_not_hide_a_fetched_rate() {
        let mut repository = MockRepository::new();
        repository
            .expect_latest()
            .returning(|_, _| Err(StorageError::Unavailable("db down".into())));
        repository
            .expect_save()
            .times(1)
            .returning(|_| Err(StorageError::Unavailable("db down".into())));

        let mut provider = MockProvider::new();
        provider
            .expect_fetch_rate()
            .times(1)
            .returning(|from, to| Ok(Rate::new(from, to, dec!(41.9))));

        let rate = service(Arc::new(repository), provider)
            .fetch_rate("USD", "UAH")
            .await
            .unwrap();
        assert_eq!(rate.value, dec!(41.9));
    }
}

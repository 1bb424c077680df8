//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods      |
// |-------------------------|---------------------------------------------------|------------------|
// | FetcherChain            | Tries rate fetchers in order until one succeeds   | fetch_rate       |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, Span, info, info_span, warn};

use super::{FetchError, Rate, RateFetcher, RateProvider};

/// Immutable, ordered list of rate fetchers
///
/// The first fetcher that produces a rate wins; results are never compared
/// across fetchers. Any failure, including an unsupported currency, moves on
/// to the next fetcher. When every fetcher failed, the error of the last one
/// is returned.
pub struct FetcherChain {
    links: Vec<Arc<dyn RateFetcher>>,
    span: Span,
}

impl FetcherChain {
    pub fn new(links: Vec<Arc<dyn RateFetcher>>) -> Self {
        Self {
            links,
            span: info_span!("fetcher_chain"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Names of the links, in the order they are tried
    pub fn names(&self) -> Vec<&'static str> {
        self.links.iter().map(|link| link.name()).collect()
    }
}

#[async_trait]
impl RateProvider for FetcherChain {
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Rate, FetchError> {
        async {
            let mut last_error = None;

            for link in &self.links {
                match link.fetch_rate(from, to).await {
                    Ok(rate) => {
                        info!(fetcher = link.name(), from, to, rate = %rate.value, "fetched rate");
                        return Ok(rate);
                    }
                    Err(err) => {
                        warn!(fetcher = link.name(), from, to, error = %err, "fetcher failed");
                        last_error = Some(err);
                    }
                }
            }

            Err(last_error.unwrap_or(FetchError::NoFetchers))
        }
        .instrument(self.span.clone())
        .await
    }
}

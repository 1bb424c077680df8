//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods      |
// |-------------------------|---------------------------------------------------|------------------|
// | CurrencyBeaconFetcher   | Latest rates from the CurrencyBeacon API          | fetch_rate       |
// | LatestResponse          | `/v1/latest` payload                              |                  |
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{decode_error, http_client, network_error, positive_decimal};
use crate::rate::{FetchError, Rate, RateFetcher};

const PROVIDER_ID: &str = "CURRENCY_BEACON";
const LATEST_URL: &str = "https://api.currencybeacon.com/v1/latest";
const SUPPORTED_CURRENCIES_URL: &str = "https://currencybeacon.com/supported-currencies";
const CURRENCY_CODE_SELECTOR: &str = "tbody tr > td:first-child > a";

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

pub struct CurrencyBeaconFetcher {
    client: Client,
    api_key: String,
    latest_url: String,
    supported_url: String,
    /// Filled by the first successful scrape, failed scrapes are retried
    supported: OnceCell<Arc<HashSet<String>>>,
}

impl CurrencyBeaconFetcher {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: http_client(),
            api_key: api_key.to_owned(),
            latest_url: LATEST_URL.to_owned(),
            supported_url: SUPPORTED_CURRENCIES_URL.to_owned(),
            supported: OnceCell::new(),
        }
    }

    /// Points the fetcher at other endpoints, used against local servers in tests
    pub fn with_urls(mut self, latest_url: &str, supported_url: &str) -> Self {
        self.latest_url = latest_url.to_owned();
        self.supported_url = supported_url.to_owned();
        self
    }

    async fn scrape_supported(&self) -> Result<Arc<HashSet<String>>, FetchError> {
        let response = self
            .client
            .get(&self.supported_url)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER_ID, e))?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                fetcher: PROVIDER_ID,
                status: response.status().as_u16(),
            });
        }

        let page = response
            .text()
            .await
            .map_err(|e| network_error(PROVIDER_ID, e))?;
        let codes = parse_currency_codes(&page)?;

        if codes.is_empty() {
            return Err(FetchError::NoData {
                fetcher: PROVIDER_ID,
            });
        }
        debug!(count = codes.len(), "resolved supported currencies");
        Ok(Arc::new(codes))
    }
}

/// Reads the first column of the currency table
fn parse_currency_codes(page: &str) -> Result<HashSet<String>, FetchError> {
    let selector =
        Selector::parse(CURRENCY_CODE_SELECTOR).map_err(|e| decode_error(PROVIDER_ID, e))?;
    let document = Html::parse_document(page);

    Ok(document
        .select(&selector)
        .map(|cell| cell.text().collect::<String>().trim().to_uppercase())
        .filter(|code| !code.is_empty())
        .collect())
}

#[async_trait]
impl RateFetcher for CurrencyBeaconFetcher {
    fn name(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn supported_currencies(&self) -> Option<Arc<HashSet<String>>> {
        match self
            .supported
            .get_or_try_init(|| self.scrape_supported())
            .await
        {
            Ok(codes) => Some(codes.clone()),
            Err(err) => {
                warn!(fetcher = PROVIDER_ID, error = %err, "could not resolve supported currencies");
                None
            }
        }
    }

    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Rate, FetchError> {
        self.ensure_supported(from, to).await?;

        let response = self
            .client
            .get(&self.latest_url)
            .query(&[("api_key", self.api_key.as_str()), ("base", from), ("symbols", to)])
            .send()
            .await
            .map_err(|e| network_error(PROVIDER_ID, e))?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                fetcher: PROVIDER_ID,
                status: response.status().as_u16(),
            });
        }

        let payload: LatestResponse = response
            .json()
            .await
            .map_err(|e| decode_error(PROVIDER_ID, e))?;

        let value = payload.rates.get(to).copied().ok_or(FetchError::NoData {
            fetcher: PROVIDER_ID,
        })?;

        Ok(Rate::new(from, to, positive_decimal(PROVIDER_ID, value)?))
    }
}

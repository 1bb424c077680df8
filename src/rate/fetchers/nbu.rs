//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods      |
// |-------------------------|---------------------------------------------------|------------------|
// | NbuFetcher              | Official NBU rates, always quoted in UAH          | fetch_rate       |
// | ExchangeEntry           | One element of the statdirectory response         |                  |
//--------------------------------------------------------------------------------------------------

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{decode_error, http_client, network_error, positive_decimal};
use crate::rate::{FetchError, Rate, RateFetcher};

const PROVIDER_ID: &str = "NBU";
const EXCHANGE_URL: &str = "https://bank.gov.ua/NBUStatService/v1/statdirectory/exchange";
const QUOTE_CURRENCY: &str = "UAH";
const SUPPORTED: [&str; 5] = ["UAH", "USD", "EUR", "GBP", "PLN"];

#[derive(Debug, Deserialize)]
struct ExchangeEntry {
    rate: f64,
}

pub struct NbuFetcher {
    client: Client,
    base_url: String,
    supported: Arc<HashSet<String>>,
}

impl Default for NbuFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NbuFetcher {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            base_url: EXCHANGE_URL.to_owned(),
            supported: Arc::new(SUPPORTED.iter().map(|c| c.to_string()).collect()),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_owned();
        self
    }

    fn exchange_url(&self, from: &str) -> String {
        let date = Utc::now().format("%Y%m%d");
        format!("{}?valcode={from}&date={date}&json", self.base_url)
    }
}

#[async_trait]
impl RateFetcher for NbuFetcher {
    fn name(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn supported_currencies(&self) -> Option<Arc<HashSet<String>>> {
        Some(self.supported.clone())
    }

    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Rate, FetchError> {
        if to != QUOTE_CURRENCY {
            return Err(FetchError::UnsupportedCurrency(to.to_owned()));
        }
        self.ensure_supported(from, to).await?;

        let response = self
            .client
            .get(self.exchange_url(from))
            .send()
            .await
            .map_err(|e| network_error(PROVIDER_ID, e))?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status {
                fetcher: PROVIDER_ID,
                status: response.status().as_u16(),
            });
        }

        let entries: Vec<ExchangeEntry> = response
            .json()
            .await
            .map_err(|e| decode_error(PROVIDER_ID, e))?;

        let entry = entries.first().ok_or(FetchError::NoData {
            fetcher: PROVIDER_ID,
        })?;

        Ok(Rate::new(from, to, positive_decimal(PROVIDER_ID, entry.rate)?))
    }
}

/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - currency_beacon                                      |
/// |   - nbu                                                  |
/// +----------------------------------------------------------+

/// CurrencyBeacon API with a scraped list of supported currencies.
pub mod currency_beacon;

/// National Bank of Ukraine official rates, UAH quotes only.
pub mod nbu;

use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;

use super::FetchError;

pub use currency_beacon::CurrencyBeaconFetcher;
pub use nbu::NbuFetcher;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared client settings for every rate source
pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub(crate) fn network_error(fetcher: &'static str, err: reqwest::Error) -> FetchError {
    FetchError::Network {
        fetcher,
        message: err.to_string(),
    }
}

pub(crate) fn decode_error(fetcher: &'static str, err: impl ToString) -> FetchError {
    FetchError::Decode {
        fetcher,
        message: err.to_string(),
    }
}

/// Converts a provider float into a positive decimal
///
/// Zero, negative and non-finite values are treated as missing data.
pub(crate) fn positive_decimal(fetcher: &'static str, value: f64) -> Result<Decimal, FetchError> {
    match Decimal::try_from(value) {
        Ok(decimal) if decimal > Decimal::ZERO => Ok(decimal),
        _ => Err(FetchError::NoData { fetcher }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_decimal_rejects_zero_and_negative_rates() {
        assert!(positive_decimal("test", 41.5).is_ok());
        assert!(matches!(
            positive_decimal("test", 0.0),
            Err(FetchError::NoData { fetcher: "test" })
        ));
        assert!(positive_decimal("test", -1.0).is_err());
        assert!(positive_decimal("test", f64::NAN).is_err());
    }
}

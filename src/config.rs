use dotenv::dotenv;
use std::env;
use std::time::Duration;
use thiserror::Error;

const RABBIT_URL: &str = "RABBIT_URL";
const APP_ID: &str = "APP_ID";
const CURRENCY_BEACON_API_KEY: &str = "CURRENCY_BEACON_API_KEY";
const USER_QUEUE_NAME: &str = "USER_QUEUE_NAME";
const USER_COMPENSATE_QUEUE_NAME: &str = "USER_COMPENSATE_QUEUE_NAME";
const OUTBOUND_COMPENSATE_QUEUE_NAME: &str = "OUTBOUND_COMPENSATE_QUEUE_NAME";
const RATE_FROM: &str = "RATE_FROM";
const RATE_TO: &str = "RATE_TO";
const RATE_FRESHNESS_SECS: &str = "RATE_FRESHNESS_SECS";
const RATE_REFRESH_INTERVAL_SECS: &str = "RATE_REFRESH_INTERVAL_SECS";
const NOTIFY_TIMEOUT_SECS: &str = "NOTIFY_TIMEOUT_SECS";
const HANDLER_TIMEOUT_SECS: &str = "HANDLER_TIMEOUT_SECS";
const DEBUG: &str = "DEBUG";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to load environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Process configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub rabbit_url: String,
    pub app_id: String,
    pub currency_beacon_api_key: String,
    /// Inbound `subscribed` / `unsubscribed` events
    pub user_queue_name: String,
    /// Inbound compensation events
    pub user_compensate_queue_name: String,
    /// Where compensations for failed forward events are published
    pub outbound_compensate_queue_name: String,
    pub rate_from: String,
    pub rate_to: String,
    pub rate_freshness: Duration,
    pub rate_refresh_interval: Duration,
    pub notify_timeout: Duration,
    pub handler_timeout: Duration,
    pub debug: bool,
}

impl Config {
    pub fn from_env() -> Config {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_from_env() -> Result<Config, ConfigError> {
        // Load .env file
        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let seconds = |key: &'static str, default: u64| match lookup(key) {
            None => Ok(Duration::from_secs(default)),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid { key, value }),
        };

        Ok(Config {
            rabbit_url: required(RABBIT_URL)?,
            app_id: or_default(APP_ID, "rate-notifier"),
            currency_beacon_api_key: required(CURRENCY_BEACON_API_KEY)?,
            user_queue_name: required(USER_QUEUE_NAME)?,
            user_compensate_queue_name: required(USER_COMPENSATE_QUEUE_NAME)?,
            outbound_compensate_queue_name: required(OUTBOUND_COMPENSATE_QUEUE_NAME)?,
            rate_from: or_default(RATE_FROM, "USD").to_uppercase(),
            rate_to: or_default(RATE_TO, "UAH").to_uppercase(),
            rate_freshness: seconds(RATE_FRESHNESS_SECS, 3600)?,
            rate_refresh_interval: seconds(RATE_REFRESH_INTERVAL_SECS, 86400)?,
            notify_timeout: seconds(NOTIFY_TIMEOUT_SECS, 30)?,
            handler_timeout: seconds(HANDLER_TIMEOUT_SECS, 5)?,
            debug: lookup(DEBUG).is_some_and(|value| matches!(value.trim(), "true" | "1")),
        })
    }
}

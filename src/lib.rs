//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Currency rate notifier. Fetches an exchange rate through a chain of fallback providers, caches
// it, emails it to subscribers on a schedule and keeps the subscriber list in sync with
// subscription events coming from the broker.
//--------------------------------------------------------------------------------------------------

pub mod config;
pub mod notification;
pub mod rate;
pub mod storage;
pub mod subscription;

// Re-export key types for easier usage
pub use config::{Config, ConfigError};
pub use notification::{LogMailer, MailSender, MessageFormatter, Notifier, PlainRateFormatter};
pub use rate::{FetchError, FetcherChain, Rate, RateFetcher, RateProvider, RateService};
pub use storage::{InMemoryRateRepository, InMemorySubscriberRepository, StorageError};
pub use subscription::{
    EventKind, HandlerError, Subscriber, SubscriberRepository, SubscriptionConsumer,
    SubscriptionEvent, SubscriptionHandler,
};

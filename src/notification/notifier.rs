//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods      |
// |-------------------------|---------------------------------------------------|------------------|
// | Notifier                | Emails the current rate to every subscriber       | notify           |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{Instrument, Span, error, info, info_span, warn};

use super::{MailSender, MessageFormatter};
use crate::rate::{FetchError, Rate, RateProvider};
use crate::subscription::SubscriberRepository;

const DEFAULT_FROM: &str = "USD";
const DEFAULT_TO: &str = "UAH";
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs one notify cycle per `notify` call
///
/// The rate is fetched once per cycle under a deadline. Without a rate no
/// email is sent. A failed send is logged and the remaining subscribers are
/// still attempted.
pub struct Notifier {
    mailer: Arc<dyn MailSender>,
    rates: Arc<dyn RateProvider>,
    subscribers: Arc<dyn SubscriberRepository>,
    formatter: Arc<dyn MessageFormatter>,
    currency_from: String,
    currency_to: String,
    fetch_timeout: Duration,
    span: Span,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn MailSender>,
        rates: Arc<dyn RateProvider>,
        subscribers: Arc<dyn SubscriberRepository>,
        formatter: Arc<dyn MessageFormatter>,
    ) -> Self {
        Self {
            mailer,
            rates,
            subscribers,
            formatter,
            currency_from: DEFAULT_FROM.to_owned(),
            currency_to: DEFAULT_TO.to_owned(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            span: info_span!("notifier"),
        }
    }

    pub fn with_pair(mut self, from: &str, to: &str) -> Self {
        self.currency_from = from.to_owned();
        self.currency_to = to.to_owned();
        self
    }

    /// Deadline for acquiring the rate, fallbacks included
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub async fn notify(&self) {
        self.run_cycle().instrument(self.span.clone()).await
    }

    async fn fetch_rate(&self) -> Result<Rate, FetchError> {
        let fetch = self.rates.fetch_rate(&self.currency_from, &self.currency_to);
        match timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    async fn run_cycle(&self) {
        let rate = match self.fetch_rate().await {
            Ok(rate) => rate,
            Err(err) => {
                error!(
                    from = %self.currency_from,
                    to = %self.currency_to,
                    error = %err,
                    "could not fetch rate, skipping notification"
                );
                return;
            }
        };

        let subscribers = match self.subscribers.find_all().await {
            Ok(subscribers) => subscribers,
            Err(err) => {
                error!(error = %err, "could not list subscribers");
                return;
            }
        };

        let subject = self.formatter.subject(&rate);
        let body = self.formatter.body(&rate);
        let mut failed = 0;

        for subscriber in &subscribers {
            if let Err(err) = self.mailer.send(&subscriber.email, &subject, &body).await {
                failed += 1;
                warn!(recipient = %subscriber.email, error = %err, "failed to send notification");
            }
        }

        info!(
            rate = %rate.value,
            recipients = subscribers.len(),
            failed,
            "notification cycle finished"
        );
    }
}

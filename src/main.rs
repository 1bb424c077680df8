//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Service entry point. Wires the rate fetcher chain, the rate cache and the notifier, sends the
// rate to every subscriber on a fixed interval and keeps subscribers in sync with the user
// service through two queues:
//   USER_QUEUE_NAME             subscribed / unsubscribed
//   USER_COMPENSATE_QUEUE_NAME  subscribed-compensate / unsubscribed-compensate
// Failed forward events are compensated on OUTBOUND_COMPENSATE_QUEUE_NAME.
//--------------------------------------------------------------------------------------------------
// cargo run --bin rate-notifier
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use anyhow::Context;
use rabbitmq::{Publisher, QueueConfig};
use tokio::{signal, time};
use tracing::{Level, error, info, info_span};

use rate_notifier::{
    Config, FetcherChain, InMemoryRateRepository, InMemorySubscriberRepository, LogMailer,
    Notifier, PlainRateFormatter, RateFetcher, RateService, SubscriberRepository,
    SubscriptionConsumer,
    rate::{CurrencyBeaconFetcher, NbuFetcher},
    subscription::{ApplySubscribe, ApplyUnsubscribe, CompensationPublisher, RemoveSubscriber},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_max_level(if config.debug { Level::DEBUG } else { Level::INFO })
        .init();

    info!(app_id = %config.app_id, "starting rate notifier");

    let chain = FetcherChain::new(vec![
        Arc::new(CurrencyBeaconFetcher::new(&config.currency_beacon_api_key)) as Arc<dyn RateFetcher>,
        Arc::new(NbuFetcher::new()) as Arc<dyn RateFetcher>,
    ]);
    info!(fetchers = ?chain.names(), "fetcher chain ready");

    let freshness = chrono::Duration::from_std(config.rate_freshness)
        .context("rate freshness out of range")?;
    let rates = Arc::new(RateService::new(
        Arc::new(InMemoryRateRepository::new()),
        Arc::new(chain),
        freshness,
    ));
    let subscribers: Arc<dyn SubscriberRepository> = Arc::new(InMemorySubscriberRepository::new());

    let notifier = Notifier::new(
        Arc::new(LogMailer),
        rates,
        subscribers.clone(),
        Arc::new(PlainRateFormatter),
    )
    .with_pair(&config.rate_from, &config.rate_to)
    .with_fetch_timeout(config.notify_timeout);

    // Compensations for failed forward events
    let compensation_publisher = Publisher::connect(
        &QueueConfig::new(&config.rabbit_url, &config.outbound_compensate_queue_name),
        &config.app_id,
    )
    .await
    .context("failed to create compensation publisher")?;
    let compensations: Arc<dyn CompensationPublisher> =
        Arc::new(compensation_publisher.get_dispatcher());

    // Consumption starts on connect and messages are acked on receipt, so
    // anything delivered before the handlers below are registered is lost.
    // Both queues are expected to be empty when the service starts.
    let user_consumer = SubscriptionConsumer::connect(&QueueConfig::new(
        &config.rabbit_url,
        &config.user_queue_name,
    ))
    .await
    .context("failed to create user consumer")?
    .with_handler_timeout(config.handler_timeout)
    .with_span(info_span!("user_consumer"));

    user_consumer
        .listen_subscribe(Arc::new(ApplySubscribe::new(
            subscribers.clone(),
            compensations.clone(),
        )))
        .await?;
    user_consumer
        .listen_unsubscribe(Arc::new(ApplyUnsubscribe::new(
            subscribers.clone(),
            compensations,
        )))
        .await?;

    let compensate_consumer = SubscriptionConsumer::connect(&QueueConfig::new(
        &config.rabbit_url,
        &config.user_compensate_queue_name,
    ))
    .await
    .context("failed to create compensation consumer")?
    .with_handler_timeout(config.handler_timeout)
    .with_span(info_span!("compensate_consumer"));

    // Both compensations leave the subscriber absent
    let remove = Arc::new(RemoveSubscriber::new(subscribers.clone()));
    compensate_consumer
        .listen_subscribe_compensate(remove.clone())
        .await?;
    compensate_consumer
        .listen_unsubscribe_compensate(remove)
        .await?;

    let mut refresh = time::interval(config.rate_refresh_interval);
    info!(every = ?config.rate_refresh_interval, "notification schedule started");

    let schedule = async {
        loop {
            refresh.tick().await;
            notifier.notify().await;
        }
    };

    // A notify cycle in flight is abandoned on Ctrl-C
    tokio::select! {
        _ = schedule => {}
        result = signal::ctrl_c() => {
            if let Err(err) = result {
                error!(error = %err, "failed to listen for shutdown signal");
            }
        }
    }

    info!("shutting down");
    if let Err(err) = user_consumer.close().await {
        error!(error = %err, "failed to close user consumer");
    }
    if let Err(err) = compensate_consumer.close().await {
        error!(error = %err, "failed to close compensation consumer");
    }
    if let Err(err) = compensation_publisher.close().await {
        error!(error = %err, "failed to close compensation publisher");
    }

    Ok(())
}

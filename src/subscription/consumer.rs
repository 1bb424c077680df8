//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods      |
// |-------------------------|---------------------------------------------------|------------------|
// | SubscriptionHandler     | Business action for one event kind                | handle           |
// | KindListener            | Decodes, filters by kind and bounds the handler   | on_message       |
// | SubscriptionConsumer    | Registers typed handlers on a broker consumer     | listen_*, close  |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rabbitmq::{Consumer, Listener, ListenerError, QueueConfig, RabbitMQError};
use tokio::time::timeout;
use tracing::{Instrument, Span, debug, info, info_span};

use super::{EventKind, HandlerError, SubscriptionEvent};

const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(5);

/// Typed callback for one kind of subscription event
///
/// Messages are acknowledged before handlers run and are never redelivered,
/// while the same event may still be published more than once. Handlers must
/// therefore be idempotent.
#[async_trait]
pub trait SubscriptionHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, email: &str) -> Result<(), HandlerError>;
}

struct KindListener {
    kind: EventKind,
    handler: Arc<dyn SubscriptionHandler>,
    handler_timeout: Duration,
    span: Span,
}

impl KindListener {
    async fn dispatch(&self, body: &[u8]) -> Result<(), HandlerError> {
        let event = SubscriptionEvent::decode(body)?;
        if event.kind() != self.kind {
            return Ok(());
        }

        info!(handler = self.handler.name(), kind = ?self.kind, "delivering event");
        match timeout(self.handler_timeout, self.handler.handle(event.email())).await {
            Ok(result) => result,
            Err(_) => Err(HandlerError::Timeout(self.handler_timeout)),
        }
    }
}

#[async_trait]
impl Listener for KindListener {
    fn name(&self) -> &str {
        self.handler.name()
    }

    async fn on_message(&self, body: &[u8]) -> Result<(), ListenerError> {
        self.dispatch(body)
            .instrument(self.span.clone())
            .await
            .map_err(ListenerError::from)
    }
}

/// Dispatches subscription events from one queue to typed handlers
///
/// Each registered handler only sees events of its own kind; several kinds
/// share the single underlying consumer. A handler invocation is bounded by
/// the handler timeout. Failures, including undecodable messages, are logged
/// by the delivery loop and the message is dropped.
pub struct SubscriptionConsumer {
    consumer: Consumer,
    handler_timeout: Duration,
    span: Span,
}

impl SubscriptionConsumer {
    /// Connects to the broker and starts consuming `config`'s queue
    pub async fn connect(config: &QueueConfig) -> Result<Self, RabbitMQError> {
        Ok(Self::new(Consumer::connect(config).await?))
    }

    pub fn new(consumer: Consumer) -> Self {
        let span = info_span!("subscription_consumer", queue = consumer.queue_name());
        Self {
            consumer,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
            span,
        }
    }

    pub fn with_handler_timeout(mut self, handler_timeout: Duration) -> Self {
        self.handler_timeout = handler_timeout;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub async fn listen_subscribe(
        &self,
        handler: Arc<dyn SubscriptionHandler>,
    ) -> Result<(), RabbitMQError> {
        self.listen(EventKind::Subscribed, handler).await
    }

    pub async fn listen_unsubscribe(
        &self,
        handler: Arc<dyn SubscriptionHandler>,
    ) -> Result<(), RabbitMQError> {
        self.listen(EventKind::Unsubscribed, handler).await
    }

    pub async fn listen_subscribe_compensate(
        &self,
        handler: Arc<dyn SubscriptionHandler>,
    ) -> Result<(), RabbitMQError> {
        self.listen(EventKind::SubscribedCompensate, handler).await
    }

    pub async fn listen_unsubscribe_compensate(
        &self,
        handler: Arc<dyn SubscriptionHandler>,
    ) -> Result<(), RabbitMQError> {
        self.listen(EventKind::UnsubscribedCompensate, handler).await
    }

    async fn listen(
        &self,
        kind: EventKind,
        handler: Arc<dyn SubscriptionHandler>,
    ) -> Result<(), RabbitMQError> {
        debug!(parent: &self.span, handler = handler.name(), ?kind, "registering handler");
        self.consumer
            .subscribe(Arc::new(KindListener {
                kind,
                handler,
                handler_timeout: self.handler_timeout,
                span: self.span.clone(),
            }))
            .await
    }

    /// Stops dispatching; a handler already running is allowed to finish
    pub fn stop(&self) {
        self.consumer.stop();
    }

    pub async fn close(self) -> Result<(), RabbitMQError> {
        self.consumer.close().await
    }
}

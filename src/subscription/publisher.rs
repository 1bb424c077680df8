use rabbitmq::PublisherDispatcher;
use tracing::debug;

use super::{HandlerError, SubscriptionEvent};

/// Sink for compensation events
pub trait CompensationPublisher: Send + Sync {
    fn publish_compensation(&self, event: &SubscriptionEvent) -> Result<(), HandlerError>;
}

impl CompensationPublisher for PublisherDispatcher {
    fn publish_compensation(&self, event: &SubscriptionEvent) -> Result<(), HandlerError> {
        let body = event.encode()?;
        self.publish(body)?;
        debug!(queue = self.queue_name(), kind = ?event.kind(), "published compensation");
        Ok(())
    }
}

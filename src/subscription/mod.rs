/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - consumer                                             |
/// |   - event                                                |
/// |   - handlers                                             |
/// |   - publisher                                            |
/// +----------------------------------------------------------+

/// Typed, kind-filtered dispatch on top of the broker consumer.
pub mod consumer;

/// Subscription event wire format.
pub mod event;

/// Business handlers that apply or undo subscription changes.
pub mod handlers;

/// Outbound compensation events.
pub mod publisher;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rabbitmq::RabbitMQError;
use thiserror::Error;

use crate::storage::StorageError;

pub use consumer::{SubscriptionConsumer, SubscriptionHandler};
pub use event::{EventKind, SubscriptionEvent};
pub use handlers::{ApplySubscribe, ApplyUnsubscribe, RemoveSubscriber, RestoreSubscriber};
pub use publisher::CompensationPublisher;

/// An active subscription to rate emails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Port to the subscriber store
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// All active subscribers
    async fn find_all(&self) -> Result<Vec<Subscriber>, StorageError>;

    /// Fails with `StorageError::Conflict` if the email is already subscribed
    async fn create(&self, email: &str) -> Result<(), StorageError>;

    /// Fails with `StorageError::NotFound` if the email is not subscribed
    async fn delete(&self, email: &str) -> Result<(), StorageError>;

    async fn exists(&self, email: &str) -> Result<bool, StorageError>;
}

/// Errors raised while handling a subscription event
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to decode event: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("handler timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to publish compensation: {0}")]
    Publish(#[from] RabbitMQError),
}

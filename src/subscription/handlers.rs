//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Event kind        |
// |-------------------------|---------------------------------------------------|-------------------|
// | ApplySubscribe          | Stores a subscriber, compensates on failure       | subscribed        |
// | ApplyUnsubscribe        | Removes a subscriber, compensates on failure      | unsubscribed      |
// | RemoveSubscriber        | Ensures a subscriber is absent                    | *-compensate      |
// | RestoreSubscriber       | Ensures a subscriber is present                   | (not bound)       |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::{
    CompensationPublisher, EventKind, HandlerError, SubscriberRepository, SubscriptionEvent,
    SubscriptionHandler,
};
use crate::storage::StorageError;

/// Publishes the compensation for a failed forward event
///
/// A publish failure is logged; the storage failure stays the reported error.
fn compensate(publisher: &dyn CompensationPublisher, kind: EventKind, email: &str) {
    let Some(event) = SubscriptionEvent::new(kind, email).compensation() else {
        return;
    };

    match publisher.publish_compensation(&event) {
        Ok(()) => info!(email, kind = ?event.kind(), "compensation requested"),
        Err(err) => error!(email, error = %err, "failed to publish compensation"),
    }
}

/// Handles `subscribed` by creating the subscriber
///
/// An existing subscriber counts as success. Any other storage failure
/// publishes `subscribed-compensate` so the upstream can roll back.
pub struct ApplySubscribe {
    subscribers: Arc<dyn SubscriberRepository>,
    compensations: Arc<dyn CompensationPublisher>,
}

impl ApplySubscribe {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        compensations: Arc<dyn CompensationPublisher>,
    ) -> Self {
        Self {
            subscribers,
            compensations,
        }
    }
}

#[async_trait]
impl SubscriptionHandler for ApplySubscribe {
    fn name(&self) -> &'static str {
        "apply_subscribe"
    }

    async fn handle(&self, email: &str) -> Result<(), HandlerError> {
        match self.subscribers.create(email).await {
            Ok(()) => {
                info!(email, "subscriber created");
                Ok(())
            }
            Err(StorageError::Conflict(_)) => {
                warn!(email, "subscriber already exists");
                Ok(())
            }
            Err(err) => {
                compensate(self.compensations.as_ref(), EventKind::Subscribed, email);
                Err(err.into())
            }
        }
    }
}

/// Handles `unsubscribed` by deleting the subscriber
///
/// A missing subscriber counts as success. Any other storage failure
/// publishes `unsubscribed-compensate`.
pub struct ApplyUnsubscribe {
    subscribers: Arc<dyn SubscriberRepository>,
    compensations: Arc<dyn CompensationPublisher>,
}

impl ApplyUnsubscribe {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        compensations: Arc<dyn CompensationPublisher>,
    ) -> Self {
        Self {
            subscribers,
            compensations,
        }
    }
}

#[async_trait]
impl SubscriptionHandler for ApplyUnsubscribe {
    fn name(&self) -> &'static str {
        "apply_unsubscribe"
    }

    async fn handle(&self, email: &str) -> Result<(), HandlerError> {
        match self.subscribers.delete(email).await {
            Ok(()) => {
                info!(email, "subscriber deleted");
                Ok(())
            }
            Err(StorageError::NotFound(_)) => {
                warn!(email, "subscriber already absent");
                Ok(())
            }
            Err(err) => {
                compensate(self.compensations.as_ref(), EventKind::Unsubscribed, email);
                Err(err.into())
            }
        }
    }
}

/// Rolls a subscription back by deleting it; replaying is harmless
pub struct RemoveSubscriber {
    subscribers: Arc<dyn SubscriberRepository>,
}

impl RemoveSubscriber {
    pub fn new(subscribers: Arc<dyn SubscriberRepository>) -> Self {
        Self { subscribers }
    }
}

#[async_trait]
impl SubscriptionHandler for RemoveSubscriber {
    fn name(&self) -> &'static str {
        "remove_subscriber"
    }

    async fn handle(&self, email: &str) -> Result<(), HandlerError> {
        match self.subscribers.delete(email).await {
            Ok(()) => {
                info!(email, "subscription rolled back");
                Ok(())
            }
            Err(StorageError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Re-creates a subscriber; replaying is harmless
///
/// The service binds both compensation kinds to [`RemoveSubscriber`]. This
/// handler is for deployments where an upstream rollback of an unsubscribe
/// must bring the subscriber back.
pub struct RestoreSubscriber {
    subscribers: Arc<dyn SubscriberRepository>,
}

impl RestoreSubscriber {
    pub fn new(subscribers: Arc<dyn SubscriberRepository>) -> Self {
        Self { subscribers }
    }
}

#[async_trait]
impl SubscriptionHandler for RestoreSubscriber {
    fn name(&self) -> &'static str {
        "restore_subscriber"
    }

    async fn handle(&self, email: &str) -> Result<(), HandlerError> {
        match self.subscribers.create(email).await {
            Ok(()) => {
                info!(email, "subscriber restored");
                Ok(())
            }
            Err(StorageError::Conflict(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemorySubscriberRepository;
    use crate::subscription::Subscriber;
    use mockall::{mock, predicate::eq};

    mock! {
        pub Subscribers {}

        #[async_trait]
        impl SubscriberRepository for Subscribers {
            async fn find_all(&self) -> Result<Vec<Subscriber>, StorageError>;
            async fn create(&self, email: &str) -> Result<(), StorageError>;
            async fn delete(&self, email: &str) -> Result<(), StorageError>;
            async fn exists(&self, email: &str) -> Result<bool, StorageError>;
        }
    }

    mock! {
        pub Compensations {}

        impl CompensationPublisher for Compensations {
            fn publish_compensation(&self, event: &SubscriptionEvent) -> Result<(), HandlerError>;
        }
    }

    fn unavailable() -> StorageError {
        StorageError::Unavailable("db down".to_owned())
    }

    #[tokio::test]
    async fn subscribe_creates_subscriber_and_tolerates_duplicates() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let mut compensations = MockCompensations::new();
        compensations.expect_publish_compensation().never();

        let handler = ApplySubscribe::new(subscribers.clone(), Arc::new(compensations));
        handler.handle("a@x.com").await.unwrap();
        handler.handle("a@x.com").await.unwrap();

        assert_eq!(subscribers.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_subscribe_publishes_compensation() {
        let mut subscribers = MockSubscribers::new();
        subscribers
            .expect_create()
            .with(eq("a@x.com"))
            .returning(|_| Err(unavailable()));

        let mut compensations = MockCompensations::new();
        compensations
            .expect_publish_compensation()
            .withf(|event| {
                event.kind() == EventKind::SubscribedCompensate && event.email() == "a@x.com"
            })
            .times(1)
            .returning(|_| Ok(()));

        let handler = ApplySubscribe::new(Arc::new(subscribers), Arc::new(compensations));
        let err = handler.handle("a@x.com").await.unwrap_err();

        assert!(matches!(err, HandlerError::Storage(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn failed_unsubscribe_publishes_compensation() {
        let mut subscribers = MockSubscribers::new();
        subscribers.expect_delete().returning(|_| Err(unavailable()));

        let mut compensations = MockCompensations::new();
        compensations
            .expect_publish_compensation()
            .withf(|event| event.kind() == EventKind::UnsubscribedCompensate)
            .times(1)
            .returning(|_| Ok(()));

        let handler = ApplyUnsubscribe::new(Arc::new(subscribers), Arc::new(compensations));
        assert!(handler.handle("a@x.com").await.is_err());
    }

    #[tokio::test]
    async fn unsubscribe_of_missing_subscriber_is_not_compensated() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let mut compensations = MockCompensations::new();
        compensations.expect_publish_compensation().never();

        let handler = ApplyUnsubscribe::new(subscribers, Arc::new(compensations));
        handler.handle("ghost@x.com").await.unwrap();
    }

    #[tokio::test]
    async fn remove_subscriber_is_idempotent() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        subscribers.create("a@x.com").await.unwrap();
        let handler = RemoveSubscriber::new(subscribers.clone());

        handler.handle("a@x.com").await.unwrap();
        assert!(!subscribers.exists("a@x.com").await.unwrap());

        handler.handle("a@x.com").await.unwrap();
        assert!(!subscribers.exists("a@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn restore_subscriber_is_idempotent() {
        let subscribers = Arc::new(InMemorySubscriberRepository::new());
        let handler = RestoreSubscriber::new(subscribers.clone());

        handler.handle("a@x.com").await.unwrap();
        assert!(subscribers.exists("a@x.com").await.unwrap());

        handler.handle("a@x.com").await.unwrap();
        assert_eq!(subscribers.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn restore_subscriber_reports_storage_outage() {
        let mut subscribers = MockSubscribers::new();
        subscribers.expect_create().returning(|_| Err(unavailable()));

        let handler = RestoreSubscriber::new(Arc::new(subscribers));
        assert!(matches!(
            handler.handle("a@x.com").await,
            Err(HandlerError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn remove_subscriber_reports_storage_outage() {
        let mut subscribers = MockSubscribers::new();
        subscribers.expect_delete().returning(|_| Err(unavailable()));

        let handler = RemoveSubscriber::new(Arc::new(subscribers));
        assert!(matches!(
            handler.handle("a@x.com").await,
            Err(HandlerError::Storage(_))
        ));
    }
}

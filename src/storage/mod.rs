//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// In-memory adapters for the two persistence ports: cached rates and subscribers.
// The relational store used in production lives outside this crate; these adapters back the
// service binary when no database is wired in, and every test in the crate.
//--------------------------------------------------------------------------------------------------
// | Name                          | Description                                 | Key Methods     |
// |-------------------------------|---------------------------------------------|-----------------|
// | StorageError                  | Failure reported by a persistence port      |                 |
// | InMemoryRateRepository        | Last rate per currency pair                 | latest, save    |
// | InMemorySubscriberRepository  | Active subscribers in insertion order       | create, delete  |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;

use crate::rate::{Rate, RateRepository};
use crate::subscription::{Subscriber, SubscriberRepository};

/// Errors reported by the persistence ports
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Subscriber already exists
    #[error("subscriber already exists: {0}")]
    Conflict(String),

    /// Subscriber does not exist
    #[error("subscriber not found: {0}")]
    NotFound(String),

    /// Backend could not serve the request
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Keeps only the most recent rate for each `(from, to)` pair
#[derive(Debug, Default)]
pub struct InMemoryRateRepository {
    rates: RwLock<HashMap<(String, String), Rate>>,
}

impl InMemoryRateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateRepository for InMemoryRateRepository {
    async fn latest(&self, from: &str, to: &str) -> Result<Option<Rate>, StorageError> {
        let rates = self.rates.read();
        Ok(rates.get(&(from.to_owned(), to.to_owned())).cloned())
    }

    async fn save(&self, rate: &Rate) -> Result<(), StorageError> {
        let key = (rate.currency_from.clone(), rate.currency_to.clone());
        self.rates.write().insert(key, rate.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySubscriberRepository {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl InMemorySubscriberRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriberRepository for InMemorySubscriberRepository {
    async fn find_all(&self) -> Result<Vec<Subscriber>, StorageError> {
        Ok(self.subscribers.read().clone())
    }

    async fn create(&self, email: &str) -> Result<(), StorageError> {
        let mut subscribers = self.subscribers.write();
        if subscribers.iter().any(|s| s.email == email) {
            return Err(StorageError::Conflict(email.to_owned()));
        }

        subscribers.push(Subscriber {
            email: email.to_owned(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn delete(&self, email: &str) -> Result<(), StorageError> {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.email != email);

        if subscribers.len() == before {
            return Err(StorageError::NotFound(email.to_owned()));
        }
        Ok(())
    }

    async fn exists(&self, email: &str) -> Result<bool, StorageError> {
        Ok(self.subscribers.read().iter().any(|s| s.email == email))
    }
}

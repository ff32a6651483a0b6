//! Tenant-scoped repositories over the key/value store.
//!
//! The repository layer translates between domain models and the JSON
//! records in the store. All persistence goes through these
//! repositories; handlers and the dispatcher never build keys or touch
//! the store directly.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

pub mod attempts;
pub mod event_types;
pub mod events;
pub mod subscriptions;

use crate::{
    error::{Result, StoreError},
    store::KeyValueStore,
};

/// Container for all repository instances.
///
/// Shares one [`KeyValueStore`] handle across the repositories; cloning
/// `Storage` is cheap.
#[derive(Clone)]
pub struct Storage {
    /// Repository for ingested events and the recent-event index.
    pub events: Arc<events::Repository>,

    /// Repository for the subscription catalog.
    pub subscriptions: Arc<subscriptions::Repository>,

    /// Repository for the event-type catalog.
    pub event_types: Arc<event_types::Repository>,

    /// Repository for delivery attempt records.
    pub attempts: Arc<attempts::Repository>,
}

impl Storage {
    /// Creates a storage instance over the given key/value store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            events: Arc::new(events::Repository::new(store.clone())),
            subscriptions: Arc::new(subscriptions::Repository::new(store.clone())),
            event_types: Arc::new(event_types::Repository::new(store.clone())),
            attempts: Arc::new(attempts::Repository::new(store)),
        }
    }

    /// Verifies the backing store answers reads.
    ///
    /// Used by the readiness probe.
    pub async fn health_check(&self) -> Result<()> {
        self.events.store().get("webhook:health-probe").await?;
        Ok(())
    }
}

/// Serializes a record for storage.
pub(crate) fn encode<T: Serialize>(record: &T) -> Result<bytes::Bytes> {
    let json = serde_json::to_vec(record).map_err(StoreError::Encode)?;
    Ok(bytes::Bytes::from(json))
}

/// Parses a stored record, naming the offending key on failure.
pub(crate) fn decode<T: DeserializeOwned>(key: &str, raw: &[u8]) -> Result<T> {
    serde_json::from_slice(raw).map_err(|source| StoreError::InvalidRecord {
        key: key.to_string(),
        source,
    })
}

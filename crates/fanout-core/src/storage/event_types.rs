//! Repository for the event-type catalog.
//!
//! Read-only from the engine's point of view; the external catalog
//! service owns writes. `put` exists for seeding and tests.

use std::sync::Arc;

use crate::{
    error::Result,
    models::{EventType, TenantId},
    store::{keys, KeyValueStore},
};

/// Repository for event-type catalog entries.
pub struct Repository {
    store: Arc<dyn KeyValueStore>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads a catalog entry by ID.
    pub async fn get(&self, tenant: &TenantId, id: &str) -> Result<Option<EventType>> {
        let key = keys::event_type(tenant, id);
        match self.store.get(&key).await? {
            Some(raw) => Ok(Some(super::decode(&key, &raw)?)),
            None => Ok(None),
        }
    }

    /// Writes a catalog entry.
    pub async fn put(&self, tenant: &TenantId, event_type: &EventType) -> Result<()> {
        let key = keys::event_type(tenant, &event_type.id);
        self.store.put(&key, super::encode(event_type)?).await
    }

    /// Lists all of a tenant's catalog entries.
    pub async fn list(&self, tenant: &TenantId) -> Result<Vec<EventType>> {
        let prefix = keys::event_type_prefix(tenant);
        let mut entries = Vec::new();
        for key in self.store.list(&prefix).await? {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match super::decode::<EventType>(&key, &raw) {
                Ok(entry) => entries.push(entry),
                Err(_) => continue,
            }
        }
        Ok(entries)
    }
}

//! Repository for the subscription catalog.
//!
//! Subscription records are created and edited by an external catalog
//! service; the engine reads them for matching and writes back only the
//! delivery-health fields. A per-tenant index of subscription IDs drives
//! listing, mirroring the recent-event index.

use std::sync::Arc;

use crate::{
    error::Result,
    models::{Subscription, SubscriptionId, TenantId},
    store::{keys, KeyValueStore},
};

/// Repository for subscription records.
pub struct Repository {
    store: Arc<dyn KeyValueStore>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads a single subscription by ID.
    pub async fn get(
        &self,
        tenant: &TenantId,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>> {
        let key = keys::subscription(tenant, id.as_str());
        match self.store.get(&key).await? {
            Some(raw) => Ok(Some(super::decode(&key, &raw)?)),
            None => Ok(None),
        }
    }

    /// Writes a subscription record, adding it to the tenant index if
    /// absent.
    ///
    /// Used by tests and seeding, and by the dispatcher when persisting
    /// health updates (where the ID is already indexed).
    pub async fn put(&self, tenant: &TenantId, subscription: &Subscription) -> Result<()> {
        let key = keys::subscription(tenant, subscription.id.as_str());
        self.store.put(&key, super::encode(subscription)?).await?;

        let mut index = self.load_index(tenant).await?;
        if !index.contains(&subscription.id) {
            index.push(subscription.id.clone());
            let index_key = keys::subscription_index(tenant);
            self.store.put(&index_key, super::encode(&index)?).await?;
        }
        Ok(())
    }

    /// Lists all of a tenant's subscriptions.
    ///
    /// Index entries whose record is missing or unreadable are skipped,
    /// so one corrupt record never blocks matching for the rest.
    pub async fn list(&self, tenant: &TenantId) -> Result<Vec<Subscription>> {
        let index = self.load_index(tenant).await?;

        let mut subscriptions = Vec::with_capacity(index.len());
        for id in &index {
            let key = keys::subscription(tenant, id.as_str());
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match super::decode::<Subscription>(&key, &raw) {
                Ok(sub) => subscriptions.push(sub),
                Err(_) => continue,
            }
        }
        Ok(subscriptions)
    }

    async fn load_index(&self, tenant: &TenantId) -> Result<Vec<SubscriptionId>> {
        let key = keys::subscription_index(tenant);
        match self.store.get(&key).await? {
            Some(raw) => Ok(super::decode(&key, &raw).unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }
}

//! Repository for delivery attempt records.
//!
//! One record per HTTP attempt, keyed by tenant, delivery ID, and
//! attempt index. Records are append-only audit data; nothing updates or
//! deletes them.

use std::sync::Arc;

use crate::{
    error::Result,
    models::{DeliveryAttempt, DeliveryId, TenantId},
    store::{keys, KeyValueStore},
};

/// Repository for delivery attempt records.
pub struct Repository {
    store: Arc<dyn KeyValueStore>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persists one attempt record.
    pub async fn record(&self, tenant: &TenantId, attempt: &DeliveryAttempt) -> Result<()> {
        let key = keys::attempt(tenant, &attempt.id, attempt.attempt);
        self.store.put(&key, super::encode(attempt)?).await
    }

    /// Lists all attempts of one delivery sequence, ordered by attempt
    /// index.
    ///
    /// Prefix listing returns keys lexicographically, which misorders
    /// numeric suffixes past attempt 9, so records are re-sorted by
    /// their attempt field.
    pub async fn list_for_delivery(
        &self,
        tenant: &TenantId,
        delivery_id: &DeliveryId,
    ) -> Result<Vec<DeliveryAttempt>> {
        let prefix = keys::attempt_prefix(tenant, delivery_id);
        let mut attempts = Vec::new();
        for key in self.store.list(&prefix).await? {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            attempts.push(super::decode::<DeliveryAttempt>(&key, &raw)?);
        }
        attempts.sort_by_key(|a| a.attempt);
        Ok(attempts)
    }
}

//! Key/value store contract and in-memory implementation.
//!
//! All persistence flows through the [`KeyValueStore`] trait: string
//! keys, opaque byte values, prefix listing. Production deployments plug
//! in a real backend; [`MemoryStore`] backs tests and standalone runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::Result;

/// Key builders for every record the engine stores.
///
/// Keys are namespaced under `webhook:` and scoped by tenant, so a
/// prefix listing for one tenant can never observe another tenant's
/// records.
pub mod keys {
    use crate::models::{DeliveryId, TenantId};

    /// Key for a single stored event.
    pub fn event(tenant: &TenantId, event_id: &str) -> String {
        format!("webhook:event:{tenant}:{event_id}")
    }

    /// Key for the per-tenant recent-event index.
    pub fn event_index(tenant: &TenantId) -> String {
        format!("webhook:event-index:{tenant}")
    }

    /// Key for a single subscription record.
    pub fn subscription(tenant: &TenantId, subscription_id: &str) -> String {
        format!("webhook:subscription:{tenant}:{subscription_id}")
    }

    /// Prefix under which all of a tenant's subscriptions live.
    pub fn subscription_prefix(tenant: &TenantId) -> String {
        format!("webhook:subscription:{tenant}:")
    }

    /// Key for the per-tenant subscription index.
    pub fn subscription_index(tenant: &TenantId) -> String {
        format!("webhook:subscription-index:{tenant}")
    }

    /// Key for a single event-type catalog entry.
    pub fn event_type(tenant: &TenantId, type_id: &str) -> String {
        format!("webhook:event-type:{tenant}:{type_id}")
    }

    /// Prefix under which all of a tenant's event types live.
    pub fn event_type_prefix(tenant: &TenantId) -> String {
        format!("webhook:event-type:{tenant}:")
    }

    /// Key for one delivery attempt record.
    pub fn attempt(tenant: &TenantId, delivery_id: &DeliveryId, attempt: u32) -> String {
        format!("webhook:attempt:{tenant}:{delivery_id}:{attempt}")
    }

    /// Prefix under which all attempts of one delivery sequence live.
    pub fn attempt_prefix(tenant: &TenantId, delivery_id: &DeliveryId) -> String {
        format!("webhook:attempt:{tenant}:{delivery_id}:")
    }
}

/// Minimal key/value persistence contract.
///
/// Writes are last-write-wins with no transactions or compare-and-swap;
/// callers that need stronger guarantees serialize their own writers.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Writes `value` under `key`, replacing any existing value.
    async fn put(&self, key: &str, value: Bytes) -> Result<()>;

    /// Removes the value under `key`. Deleting a missing key is not an
    /// error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists all keys starting with `prefix`, in lexicographic order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-memory [`KeyValueStore`] backed by a `BTreeMap`.
///
/// The ordered map gives lexicographic prefix listing for free. Used by
/// the test suites and by standalone runs without an external store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true when the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TenantId;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let store = MemoryStore::new();
        store.put("k1", Bytes::from_static(b"v1")).await.unwrap();

        assert_eq!(store.get("k1").await.unwrap(), Some(Bytes::from_static(b"v1")));

        store.delete("k1").await.unwrap();
        assert_eq!(store.get("k1").await.unwrap(), None);

        // Deleting again is a no-op.
        store.delete("k1").await.unwrap();
    }

    #[tokio::test]
    async fn list_returns_only_prefix_matches_in_order() {
        let store = MemoryStore::new();
        for key in ["a:2", "a:1", "b:1", "a:3"] {
            store.put(key, Bytes::from_static(b"x")).await.unwrap();
        }

        let keys = store.list("a:").await.unwrap();
        assert_eq!(keys, vec!["a:1", "a:2", "a:3"]);

        assert!(store.list("c:").await.unwrap().is_empty());
    }

    #[test]
    fn keys_are_tenant_scoped() {
        let acme = TenantId::new("acme");
        let other = TenantId::new("other");

        assert_eq!(keys::event(&acme, "evt_1"), "webhook:event:acme:evt_1");
        assert_eq!(keys::event_index(&acme), "webhook:event-index:acme");
        assert!(!keys::subscription(&acme, "s1").starts_with(&keys::subscription_prefix(&other)));
        assert!(keys::subscription(&acme, "s1").starts_with(&keys::subscription_prefix(&acme)));
    }
}

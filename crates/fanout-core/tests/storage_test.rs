//! Integration tests for the storage repositories.
//!
//! Exercises the repositories against the in-memory store, covering the
//! index maintenance, pagination, tenant isolation, and corrupt-record
//! behavior the handlers and dispatcher rely on.

use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use chrono::Utc;
use fanout_core::{
    models::{
        DeliveryAttempt, DeliveryId, Endpoint, Event, EventId, Subscription, SubscriptionId,
        TenantId,
    },
    storage::{events::EVENT_INDEX_CAP, Storage},
    store::keys,
    KeyValueStore, MemoryStore,
};

fn test_event(id: &str) -> Event {
    Event {
        id: EventId::new(id),
        event_type: "order.created".to_string(),
        occurred_at: Utc::now(),
        received_at: Utc::now(),
        labels: HashMap::new(),
        payload: serde_json::json!({ "n": 1 }),
    }
}

fn test_subscription(id: &str, tenant: &str) -> Subscription {
    Subscription {
        id: SubscriptionId::new(id),
        tenant_id: TenantId::new(tenant),
        description: String::new(),
        enabled: true,
        event_type_ids: vec!["order.created".to_string()],
        labels: Vec::new(),
        endpoint: Endpoint {
            method: "POST".to_string(),
            url: "https://example.com/hook".to_string(),
            headers: Vec::new(),
        },
        signing: Default::default(),
        delivery: Default::default(),
        last_delivery: None,
        failure_count: 0,
        created_at: Some(Utc::now()),
        updated_at: Some(Utc::now()),
    }
}

fn setup() -> (Storage, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Storage::new(store.clone()), store)
}

#[tokio::test]
async fn storage_health_check() {
    let (storage, _) = setup();
    assert!(storage.health_check().await.is_ok());
}

#[tokio::test]
async fn event_create_and_get_roundtrip() {
    let (storage, _) = setup();
    let tenant = TenantId::new("acme");
    let event = test_event("evt_1");

    storage.events.create(&tenant, &event).await.unwrap();

    let found = storage.events.get(&tenant, &event.id).await.unwrap();
    assert!(found.is_some());
    let found = found.unwrap();
    assert_eq!(found.id, event.id);
    assert_eq!(found.event_type, "order.created");

    // Unknown IDs read as absent, not as errors.
    let missing = storage.events.get(&tenant, &EventId::new("evt_nope")).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn event_index_is_newest_first_and_capped() {
    let (storage, _) = setup();
    let tenant = TenantId::new("acme");

    for i in 0..(EVENT_INDEX_CAP + 5) {
        let event = test_event(&format!("evt_{i}"));
        storage.events.create(&tenant, &event).await.unwrap();
    }

    let (recent, next) = storage.events.list_recent(&tenant, 3, None).await.unwrap();
    let ids: Vec<&str> = recent.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["evt_204", "evt_203", "evt_202"]);
    assert_eq!(next.unwrap().as_str(), "evt_202");

    // The index holds at most EVENT_INDEX_CAP entries.
    let (all, next) = storage.events.list_recent(&tenant, usize::MAX, None).await.unwrap();
    assert_eq!(all.len(), EVENT_INDEX_CAP);
    assert!(next.is_none());
}

#[tokio::test]
async fn event_list_paginates_with_cursor() {
    let (storage, _) = setup();
    let tenant = TenantId::new("acme");

    for i in 0..5 {
        storage.events.create(&tenant, &test_event(&format!("evt_{i}"))).await.unwrap();
    }

    let (first, cursor) = storage.events.list_recent(&tenant, 2, None).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].id.as_str(), "evt_4");

    let cursor = cursor.unwrap();
    assert_eq!(cursor.as_str(), "evt_3");
    let (second, _) = storage.events.list_recent(&tenant, 2, Some(&cursor)).await.unwrap();
    let ids: Vec<&str> = second.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["evt_2", "evt_1"]);

    // Last page carries no cursor.
    let (last, next) =
        storage.events.list_recent(&tenant, 2, Some(&EventId::new("evt_1"))).await.unwrap();
    assert!(last.is_empty());
    assert!(next.is_none());

    // Unknown cursor restarts from the top.
    let (restarted, _) = storage
        .events
        .list_recent(&tenant, 2, Some(&EventId::new("evt_unknown")))
        .await
        .unwrap();
    assert_eq!(restarted[0].id.as_str(), "evt_4");
}

#[tokio::test]
async fn events_are_isolated_by_tenant() {
    let (storage, _) = setup();
    let acme = TenantId::new("acme");
    let other = TenantId::new("other");

    storage.events.create(&acme, &test_event("evt_a")).await.unwrap();

    assert!(storage.events.get(&other, &EventId::new("evt_a")).await.unwrap().is_none());
    let (events, _) = storage.events.list_recent(&other, 10, None).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn subscription_put_maintains_index_without_duplicates() {
    let (storage, _) = setup();
    let tenant = TenantId::new("acme");
    let mut sub = test_subscription("sub-1", "acme");

    storage.subscriptions.put(&tenant, &sub).await.unwrap();

    // A second write of the same subscription must not duplicate the
    // index entry.
    sub.failure_count = 2;
    storage.subscriptions.put(&tenant, &sub).await.unwrap();

    let listed = storage.subscriptions.list(&tenant).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].failure_count, 2);
}

#[tokio::test]
async fn subscription_list_skips_unreadable_records() {
    let (storage, store) = setup();
    let tenant = TenantId::new("acme");

    storage.subscriptions.put(&tenant, &test_subscription("sub-1", "acme")).await.unwrap();
    storage.subscriptions.put(&tenant, &test_subscription("sub-2", "acme")).await.unwrap();

    // Corrupt one record in place.
    let key = keys::subscription(&tenant, "sub-1");
    store.put(&key, Bytes::from_static(b"not json")).await.unwrap();

    let listed = storage.subscriptions.list(&tenant).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id.as_str(), "sub-2");
}

#[tokio::test]
async fn attempts_list_in_numeric_order() {
    let (storage, _) = setup();
    let tenant = TenantId::new("acme");
    let delivery_id = DeliveryId::new();

    // Write attempts out of order, including a two-digit index that
    // would sort before "2" lexicographically.
    for attempt in [10u32, 2, 0, 1] {
        let record = DeliveryAttempt {
            id: delivery_id,
            attempt,
            subscription_id: SubscriptionId::new("sub-1"),
            event_id: EventId::new("evt_1"),
            at: Utc::now(),
            ok: false,
            status: Some(500),
            latency_ms: 12,
            error: Some("HTTP 500".to_string()),
        };
        storage.attempts.record(&tenant, &record).await.unwrap();
    }

    let attempts = storage.attempts.list_for_delivery(&tenant, &delivery_id).await.unwrap();
    let order: Vec<u32> = attempts.iter().map(|a| a.attempt).collect();
    assert_eq!(order, vec![0, 1, 2, 10]);
}

//! Delivery sequence execution and fan-out.
//!
//! The dispatcher turns one persisted event into independent delivery
//! sequences, one per matching subscription. Each sequence runs in its
//! own task: attempts with backoff, an attempt record per try, and a
//! terminal health update on the subscription.
//!
//! Health updates are serialized per subscription. Concurrent sequences
//! for the same subscription take a lock, re-read the stored record,
//! and mutate that, so no terminal update can overwrite another's
//! failure count.

use std::{collections::HashMap, sync::Arc, sync::Mutex};

use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};

use fanout_core::{
    models::{DeliveryAttempt, DeliveryId, Event, LastDelivery, Subscription, SubscriptionId, TenantId},
    storage::Storage,
    Clock, StoreError,
};

use crate::{
    client::{AttemptClient, AttemptRequest},
    error::Result,
    matcher, policy::EffectivePolicy, signature,
    HEADER_DELIVERY_ID, HEADER_EVENT_ID, HEADER_EVENT_TYPE,
};

/// Schedules and executes delivery sequences.
///
/// Cheap to share behind an `Arc`; all sequences use one HTTP client
/// and one storage handle.
pub struct Dispatcher {
    storage: Storage,
    client: AttemptClient,
    clock: Arc<dyn Clock>,
    health_locks: Mutex<HashMap<SubscriptionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given storage and clock.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Configuration` if the HTTP client cannot
    /// be built.
    pub fn new(storage: Storage, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            storage,
            client: AttemptClient::new()?,
            clock,
            health_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Fans an event out to every matching subscription.
    ///
    /// Loads the tenant's subscriptions, filters them against the
    /// event, and spawns one detached delivery task per match. Returns
    /// the number of deliveries scheduled; it never waits for any of
    /// them.
    #[instrument(skip(self, event), fields(tenant = %tenant, event_id = %event.id))]
    pub async fn fan_out(self: &Arc<Self>, tenant: &TenantId, event: &Event) -> Result<usize> {
        let subscriptions = self.storage.subscriptions.list(tenant).await?;
        let matched: Vec<Subscription> =
            matcher::matching_subscriptions(&subscriptions, event).into_iter().cloned().collect();

        debug!(
            candidates = subscriptions.len(),
            matched = matched.len(),
            "matched subscriptions for event"
        );

        let count = matched.len();
        for subscription in matched {
            let dispatcher = Arc::clone(self);
            let tenant = tenant.clone();
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = dispatcher.deliver(&tenant, &subscription, &event).await {
                    error!(
                        tenant = %tenant,
                        subscription_id = %subscription.id,
                        event_id = %event.id,
                        error = %e,
                        "delivery sequence aborted"
                    );
                }
            });
        }
        Ok(count)
    }

    /// Runs one complete delivery sequence for one subscription.
    ///
    /// Attempts until a 2xx response or the retry budget is exhausted,
    /// persisting a record per attempt, then folds the terminal outcome
    /// into the subscription's health fields.
    ///
    /// # Errors
    ///
    /// Returns a storage error if an attempt record or the health
    /// update cannot be persisted. HTTP failures are not errors; they
    /// drive the retry loop.
    #[instrument(skip(self, subscription, event), fields(
        tenant = %tenant,
        subscription_id = %subscription.id,
        event_id = %event.id,
    ))]
    pub async fn deliver(
        &self,
        tenant: &TenantId,
        subscription: &Subscription,
        event: &Event,
    ) -> Result<()> {
        let delivery_id = DeliveryId::new();
        let policy = EffectivePolicy::from_stored(&subscription.delivery);

        let body = Bytes::from(serde_json::to_vec(event).map_err(StoreError::Encode)?);
        let request = AttemptRequest {
            method: subscription.endpoint.method.to_uppercase(),
            url: subscription.endpoint.url.clone(),
            headers: build_headers(subscription, event, &delivery_id, &body),
            body,
            timeout: policy.timeout,
        };

        for attempt in 0..=policy.retries {
            let outcome = self.client.execute(&request).await;

            let record = DeliveryAttempt {
                id: delivery_id,
                attempt,
                subscription_id: subscription.id.clone(),
                event_id: event.id.clone(),
                at: self.clock.now_utc(),
                ok: outcome.ok,
                status: outcome.status,
                latency_ms: outcome.latency_ms,
                error: outcome.error.clone(),
            };
            self.storage.attempts.record(tenant, &record).await?;

            if outcome.ok {
                info!(
                    delivery_id = %delivery_id,
                    attempt,
                    status = outcome.status,
                    "delivery succeeded"
                );
                self.finalize(tenant, &subscription.id, &policy, &record).await?;
                return Ok(());
            }

            if attempt < policy.retries {
                debug!(
                    delivery_id = %delivery_id,
                    attempt,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "attempt failed, backing off"
                );
                self.clock.sleep(policy.backoff_delay(attempt)).await;
                continue;
            }

            warn!(
                delivery_id = %delivery_id,
                attempts = policy.retries + 1,
                error = outcome.error.as_deref().unwrap_or(""),
                "delivery failed, retry budget exhausted"
            );
            self.finalize(tenant, &subscription.id, &policy, &record).await?;
        }
        Ok(())
    }

    /// Applies the terminal outcome to the subscription's health fields.
    ///
    /// Success resets the failure count; failure increments it and
    /// disables the subscription once the threshold is reached. The
    /// stored record is re-read under a per-subscription lock so
    /// concurrent sequences cannot lose each other's updates.
    async fn finalize(
        &self,
        tenant: &TenantId,
        subscription_id: &SubscriptionId,
        policy: &EffectivePolicy,
        terminal: &DeliveryAttempt,
    ) -> Result<()> {
        let lock = self.health_lock(subscription_id);
        let _guard = lock.lock_owned().await;

        // Deleted mid-flight: dropping the update beats resurrecting
        // the record.
        let Some(mut subscription) = self.storage.subscriptions.get(tenant, subscription_id).await?
        else {
            debug!(subscription_id = %subscription_id, "subscription gone, skipping health update");
            return Ok(());
        };

        subscription.last_delivery = Some(LastDelivery {
            at: terminal.at,
            ok: terminal.ok,
            status: terminal.status,
            latency_ms: terminal.latency_ms,
            error: terminal.error.clone(),
        });

        if terminal.ok {
            subscription.failure_count = 0;
        } else {
            subscription.failure_count = subscription.failure_count.saturating_add(1);
            if policy.disable_after_failures > 0
                && subscription.failure_count >= policy.disable_after_failures
            {
                subscription.enabled = false;
                warn!(
                    subscription_id = %subscription_id,
                    failure_count = subscription.failure_count,
                    "subscription auto-disabled after consecutive failures"
                );
            }
        }

        self.storage.subscriptions.put(tenant, &subscription).await?;
        Ok(())
    }

    fn health_lock(&self, subscription_id: &SubscriptionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.health_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(subscription_id.clone()).or_default().clone()
    }
}

/// Builds the ordered header list for one delivery sequence.
///
/// Subscriber-configured static headers come first, then the engine
/// identification headers and the signature, so a static header can
/// never clobber the engine's.
fn build_headers(
    subscription: &Subscription,
    event: &Event,
    delivery_id: &DeliveryId,
    body: &[u8],
) -> Vec<(String, String)> {
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];

    for pair in &subscription.endpoint.headers {
        let name = pair.name.trim();
        if name.is_empty() {
            continue;
        }
        headers.push((name.to_string(), pair.value.trim().to_string()));
    }

    headers.push((HEADER_EVENT_ID.to_string(), event.id.to_string()));
    headers.push((HEADER_EVENT_TYPE.to_string(), event.event_type.clone()));
    headers.push((HEADER_DELIVERY_ID.to_string(), delivery_id.to_string()));

    if let Some((name, value)) = signature::signature_header(&subscription.signing, body) {
        headers.push((name, value));
    }

    headers
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fanout_core::models::{Endpoint, EventId, HeaderPair, Signing, SigningMode};

    use super::*;

    fn subscription_with_headers(headers: Vec<HeaderPair>, signing: Signing) -> Subscription {
        Subscription {
            id: SubscriptionId::new("sub-1"),
            tenant_id: TenantId::new("acme"),
            description: String::new(),
            enabled: true,
            event_type_ids: vec!["order.created".to_string()],
            labels: Vec::new(),
            endpoint: Endpoint {
                method: "POST".to_string(),
                url: "https://example.com/hook".to_string(),
                headers,
            },
            signing,
            delivery: Default::default(),
            last_delivery: None,
            failure_count: 0,
            created_at: None,
            updated_at: None,
        }
    }

    fn test_event() -> Event {
        Event {
            id: EventId::new("evt_1"),
            event_type: "order.created".to_string(),
            occurred_at: Utc::now(),
            received_at: Utc::now(),
            labels: HashMap::new(),
            payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn engine_headers_follow_static_headers() {
        let sub = subscription_with_headers(
            vec![HeaderPair {
                name: HEADER_EVENT_ID.to_string(),
                value: "spoofed".to_string(),
            }],
            Signing::default(),
        );
        let delivery_id = DeliveryId::new();

        let headers = build_headers(&sub, &test_event(), &delivery_id, b"{}");

        // The engine's value appears after the static one, so it wins
        // once the list is collapsed last-wins.
        let positions: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, (name, _))| name == HEADER_EVENT_ID)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(positions.len(), 2);
        assert_eq!(headers[positions[1]].1, "evt_1");
    }

    #[test]
    fn blank_static_header_names_are_dropped() {
        let sub = subscription_with_headers(
            vec![
                HeaderPair { name: "  ".to_string(), value: "x".to_string() },
                HeaderPair { name: " X-Keep ".to_string(), value: " v ".to_string() },
            ],
            Signing::default(),
        );

        let headers = build_headers(&sub, &test_event(), &DeliveryId::new(), b"{}");
        assert!(headers.iter().any(|(n, v)| n == "X-Keep" && v == "v"));
        assert!(!headers.iter().any(|(n, _)| n.trim().is_empty()));
    }

    #[test]
    fn signature_header_present_when_signing_enabled() {
        let sub = subscription_with_headers(
            Vec::new(),
            Signing {
                mode: SigningMode::HmacSha256,
                header: None,
                secret: Some("secret".to_string()),
            },
        );

        let headers = build_headers(&sub, &test_event(), &DeliveryId::new(), b"{\"a\":1}");
        let sig = headers.iter().find(|(n, _)| n == crate::DEFAULT_SIGNATURE_HEADER);
        assert!(sig.is_some());
        assert!(sig.unwrap().1.starts_with("sha256="));
    }
}

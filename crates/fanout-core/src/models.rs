//! Domain models and strongly-typed identifiers.
//!
//! Defines events, subscriptions, delivery attempts, and newtype ID
//! wrappers for compile-time type safety. Records serialize to camelCase
//! JSON, which is the format stored in the key/value store and sent on
//! the wire to subscriber endpoints.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strongly-typed tenant identifier.
///
/// The isolation boundary: every event, subscription, and attempt is
/// scoped to a tenant. The identifier format is owned by the tenant
/// resolution collaborator, so this wraps an opaque string rather than
/// imposing a UUID shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    /// Creates a tenant ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly-typed event identifier.
///
/// Engine-generated at ingestion. Re-ingesting identical content yields
/// a new ID; there is no content-based deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// Generates a fresh event ID with the `evt_` prefix.
    pub fn generate() -> Self {
        Self(format!("evt_{}", Uuid::new_v4()))
    }

    /// Creates an event ID from an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly-typed subscription identifier.
///
/// Assigned by the external CRUD collaborator that manages the
/// subscription catalog; opaque to this engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    /// Creates a subscription ID from an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly-typed delivery identifier.
///
/// Generated once per delivery sequence and shared by every attempt in
/// that sequence, grouping the attempt records for one
/// (subscription, event) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId(pub Uuid);

impl DeliveryId {
    /// Creates a new random delivery ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeliveryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog entry naming a category of events a tenant can emit.
///
/// Created and deleted by the external CRUD collaborator; read-only to
/// the delivery engine. Events reference a type by `name`, and that
/// reference is not validated against the catalog at ingest time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    /// Unique identifier for this catalog entry.
    pub id: String,
    /// Tenant that owns the entry.
    pub tenant_id: TenantId,
    /// The event-type name subscriptions and events refer to.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry was last updated.
    pub updated_at: DateTime<Utc>,
}

/// An immutable fact ingested once.
///
/// Persisted at ingest and never mutated afterwards. The payload is
/// opaque: the engine serializes and forwards it without imposing any
/// schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Engine-generated identifier, unique per ingestion.
    pub id: EventId,
    /// Event-type name this event belongs to.
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the event happened, per the caller; defaults to `received_at`.
    pub occurred_at: DateTime<Utc>,
    /// When the engine accepted the event.
    pub received_at: DateTime<Utc>,
    /// Caller-supplied labels used for subscription filtering.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Opaque caller-defined payload, forwarded verbatim.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// A label selector on a subscription.
///
/// A selector with no value requires only that the key exists in the
/// event's labels; a selector with a value requires exact equality.
/// Selectors combine as AND-of-filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    /// Label key that must be present on the event.
    pub key: String,
    /// Optional exact value constraint. An empty string behaves like no
    /// constraint, matching the stored catalog format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl LabelSelector {
    /// Creates a key-presence selector.
    pub fn key(key: impl Into<String>) -> Self {
        Self { key: key.into(), value: None }
    }

    /// Creates an exact key/value selector.
    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: Some(value.into()) }
    }
}

/// A static header attached to every outbound request for a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPair {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Where matching events are delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// HTTP method, e.g. `POST`.
    #[serde(default = "default_method")]
    pub method: String,
    /// Destination URL. Only http/https endpoints are ever dispatched to.
    pub url: String,
    /// Static headers merged into every request.
    #[serde(default)]
    pub headers: Vec<HeaderPair>,
}

fn default_method() -> String {
    "POST".to_string()
}

/// Request signing mode for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SigningMode {
    /// No signature header is attached.
    #[default]
    None,
    /// HMAC-SHA256 over the exact raw request body, hex encoded.
    HmacSha256,
}

/// Signing configuration for a subscription.
///
/// The secret is generated once at creation by the CRUD collaborator and
/// never returned afterwards; the engine only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signing {
    /// Signing mode.
    #[serde(default)]
    pub mode: SigningMode,
    /// Header name carrying the signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Shared secret used for HMAC signing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Backoff strategy between delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Constant delay between attempts.
    Fixed,
    /// Delay doubles each attempt, capped.
    #[default]
    #[serde(alias = "expo")]
    Exponential,
}

/// Per-subscription delivery policy.
///
/// Stored values are clamped defensively at dispatch time, so
/// out-of-range values in the catalog never break delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPolicy {
    /// Number of retries after the initial attempt, clamped to [0, 20].
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Backoff strategy between attempts.
    #[serde(default)]
    pub backoff: Backoff,
    /// Per-attempt timeout in milliseconds, clamped to [1000, 60000].
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Consecutive failed delivery sequences before the subscription is
    /// auto-disabled. Zero means never auto-disable.
    #[serde(default = "default_disable_after_failures")]
    pub disable_after_failures: u32,
}

fn default_retries() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_disable_after_failures() -> u32 {
    10
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            backoff: Backoff::default(),
            timeout_ms: default_timeout_ms(),
            disable_after_failures: default_disable_after_failures(),
        }
    }
}

/// Summary of the most recent terminal delivery outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastDelivery {
    /// When the terminal attempt finished.
    pub at: DateTime<Utc>,
    /// Whether the sequence ended in success.
    pub ok: bool,
    /// HTTP status of the terminal attempt, if a response was received.
    pub status: Option<u16>,
    /// Latency of the terminal attempt in milliseconds.
    pub latency_ms: u64,
    /// Error description, absent on success.
    pub error: Option<String>,
}

/// A tenant-owned rule describing where and how matching events are
/// delivered.
///
/// Created, updated, and deleted by the external CRUD collaborator. The
/// engine itself mutates only `enabled`, `failure_count`, and
/// `last_delivery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Unique identifier.
    pub id: SubscriptionId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Whether the subscription is eligible for matching. Flips to
    /// `false` automatically when the auto-disable threshold is reached.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Event-type names this subscription cares about.
    #[serde(default)]
    pub event_type_ids: Vec<String>,
    /// Label selectors, all of which must be satisfied.
    #[serde(default)]
    pub labels: Vec<LabelSelector>,
    /// Destination endpoint.
    pub endpoint: Endpoint,
    /// Request signing configuration.
    #[serde(default)]
    pub signing: Signing,
    /// Retry/backoff/timeout policy.
    #[serde(default)]
    pub delivery: DeliveryPolicy,
    /// Most recent terminal delivery outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_delivery: Option<LastDelivery>,
    /// Consecutive failed delivery sequences since the last success.
    #[serde(default)]
    pub failure_count: u32,
    /// When the subscription was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the subscription was last updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

/// An immutable record of one HTTP delivery attempt.
///
/// One record is written per attempt, success or failure, and never
/// mutated. All attempts of one delivery sequence share the same `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAttempt {
    /// Delivery ID shared across the sequence.
    pub id: DeliveryId,
    /// Zero-based attempt index within the sequence.
    pub attempt: u32,
    /// Subscription being delivered to.
    pub subscription_id: SubscriptionId,
    /// Event being delivered.
    pub event_id: EventId,
    /// When the attempt finished.
    pub at: DateTime<Utc>,
    /// Whether the HTTP status was in [200, 300).
    pub ok: bool,
    /// HTTP status, or `None` on transport failure or timeout.
    pub status: Option<u16>,
    /// Attempt latency in milliseconds.
    pub latency_ms: u64,
    /// Error description: `Timeout`, a transport error message, or
    /// `HTTP <status>` for non-2xx responses.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_parses_minimal_catalog_record() {
        // The external CRUD collaborator may omit everything optional.
        let json = r#"{
            "id": "sub-1",
            "tenantId": "acme",
            "endpoint": { "url": "https://example.com/hook" }
        }"#;

        let sub: Subscription = serde_json::from_str(json).expect("minimal record should parse");
        assert!(sub.enabled);
        assert_eq!(sub.endpoint.method, "POST");
        assert_eq!(sub.delivery.retries, 3);
        assert_eq!(sub.delivery.timeout_ms, 5000);
        assert_eq!(sub.delivery.disable_after_failures, 10);
        assert_eq!(sub.failure_count, 0);
        assert!(sub.last_delivery.is_none());
        assert_eq!(sub.signing.mode, SigningMode::None);
    }

    #[test]
    fn backoff_accepts_legacy_expo_alias() {
        let policy: DeliveryPolicy =
            serde_json::from_str(r#"{ "backoff": "expo" }"#).expect("alias should parse");
        assert_eq!(policy.backoff, Backoff::Exponential);

        let policy: DeliveryPolicy =
            serde_json::from_str(r#"{ "backoff": "fixed" }"#).expect("fixed should parse");
        assert_eq!(policy.backoff, Backoff::Fixed);
    }

    #[test]
    fn signing_mode_uses_kebab_case() {
        let signing: Signing =
            serde_json::from_str(r#"{ "mode": "hmac-sha256", "secret": "s" }"#)
                .expect("signing should parse");
        assert_eq!(signing.mode, SigningMode::HmacSha256);

        let json = serde_json::to_string(&signing).expect("signing should serialize");
        assert!(json.contains("hmac-sha256"));
    }

    #[test]
    fn event_serializes_with_wire_field_names() {
        let event = Event {
            id: EventId::new("evt_test"),
            event_type: "order.created".to_string(),
            occurred_at: Utc::now(),
            received_at: Utc::now(),
            labels: HashMap::from([("region".to_string(), "SG".to_string())]),
            payload: serde_json::json!({ "orderId": 42 }),
        };

        let json = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(json["id"], "evt_test");
        assert_eq!(json["type"], "order.created");
        assert!(json.get("occurredAt").is_some());
        assert!(json.get("receivedAt").is_some());
    }

    #[test]
    fn event_ids_are_unique_per_generation() {
        assert_ne!(EventId::generate(), EventId::generate());
    }
}

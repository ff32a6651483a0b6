//! Webhook delivery engine: matching, signing, and retrying dispatch.
//!
//! Given a persisted event, this crate finds the subscriptions it
//! matches, then runs one delivery sequence per match: build the
//! request, optionally sign it, attempt it up to `retries + 1` times
//! with backoff, persist every attempt, and fold the terminal outcome
//! into the subscription's health fields.
//!
//! Delivery sequences are independent tasks. A slow or failing
//! subscriber never delays another subscriber, and nothing about a
//! sequence's outcome is reported back to the event producer.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod matcher;
pub mod policy;
pub mod signature;

pub use client::{AttemptClient, AttemptOutcome};
pub use dispatcher::Dispatcher;
pub use error::{DeliveryError, Result};
pub use matcher::matching_subscriptions;
pub use policy::EffectivePolicy;

/// User agent sent with every outbound delivery request.
pub const USER_AGENT: &str = "Fanout-Webhooks/1.0";

/// Header carrying the event ID on every delivery.
pub const HEADER_EVENT_ID: &str = "X-Fanout-Event-Id";

/// Header carrying the event-type name on every delivery.
pub const HEADER_EVENT_TYPE: &str = "X-Fanout-Event-Type";

/// Header carrying the delivery ID on every delivery.
pub const HEADER_DELIVERY_ID: &str = "X-Fanout-Delivery-Id";

/// Signature header used when a subscription enables signing without
/// naming its own header.
pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Fanout-Signature";

//! Core domain models and storage contracts.
//!
//! Provides strongly-typed identifiers, the webhook domain records, the
//! key/value store contract, and the tenant-scoped repositories built on
//! top of it. All other crates depend on these foundational types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod storage;
pub mod store;
pub mod time;

pub use error::{Result, StoreError};
pub use models::{
    Backoff, DeliveryAttempt, DeliveryId, DeliveryPolicy, Endpoint, Event, EventId, EventType,
    HeaderPair, LabelSelector, LastDelivery, Signing, SigningMode, Subscription, SubscriptionId,
    TenantId,
};
pub use storage::Storage;
pub use store::{KeyValueStore, MemoryStore};
pub use time::{Clock, RealClock, TestClock};

//! HTTP request handlers.

pub mod events;
pub mod health;
pub mod ingest;

pub use events::{get_event, list_events};
pub use health::{health_check, liveness_check, readiness_check};
pub use ingest::ingest_event;

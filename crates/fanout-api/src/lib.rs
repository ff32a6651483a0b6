//! HTTP surface of the webhook distribution engine.
//!
//! Exposes event intake, recent-event reads, and health probes over
//! axum. Requests authenticate with a bearer token that resolves to a
//! tenant; everything a handler touches is scoped to that tenant.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use middleware::auth::{StaticTokenResolver, TenantResolver};
pub use server::{create_router, start_server};
pub use state::AppState;

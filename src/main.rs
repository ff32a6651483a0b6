//! Fanout webhook distribution service.
//!
//! Main entry point. Wires the store, repositories, dispatcher, and
//! HTTP server together and coordinates startup and shutdown.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::info;

use fanout_api::{AppState, Config, StaticTokenResolver};
use fanout_core::{models::TenantId, storage::Storage, Clock, MemoryStore, RealClock};
use fanout_delivery::Dispatcher;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting fanout webhook distribution service");

    let config = Config::load()?;
    let addr = config.parse_server_addr()?;
    info!(
        addr = %addr,
        tenant = %config.api_tenant,
        request_timeout = config.request_timeout,
        "Configuration loaded"
    );

    // In-memory store; swap in a durable KeyValueStore for production.
    let store = Arc::new(MemoryStore::new());
    let storage = Storage::new(store);

    let clock: Arc<dyn Clock> = Arc::new(RealClock::new());
    let dispatcher = Arc::new(Dispatcher::new(storage.clone(), clock.clone())?);

    let resolver = Arc::new(StaticTokenResolver::single(
        config.api_token.clone(),
        TenantId::new(config.api_tenant.clone()),
    ));

    let state = AppState::new(storage, dispatcher, resolver, clock);

    info!(addr = %addr, "Fanout is ready to receive events");
    fanout_api::start_server(state, addr, Duration::from_secs(config.request_timeout)).await?;

    info!("Fanout shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,fanout=debug,tower_http=debug"))
        .expect("Invalid RUST_LOG environment variable");

    let fmt_layer = fmt::layer().with_target(true).with_file(true).with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

//! Shared application state.

use std::sync::Arc;

use fanout_core::{storage::Storage, Clock};
use fanout_delivery::Dispatcher;

use crate::middleware::auth::TenantResolver;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Repositories over the key/value store.
    pub storage: Storage,
    /// Delivery dispatcher; fan-out happens through this.
    pub dispatcher: Arc<Dispatcher>,
    /// Resolves bearer tokens to tenants.
    pub resolver: Arc<dyn TenantResolver>,
    /// Time source for record timestamps.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Creates application state from its collaborators.
    pub fn new(
        storage: Storage,
        dispatcher: Arc<Dispatcher>,
        resolver: Arc<dyn TenantResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { storage, dispatcher, resolver, clock }
    }
}

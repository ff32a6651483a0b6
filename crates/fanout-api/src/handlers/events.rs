//! Read endpoints for ingested events.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::instrument;

use fanout_core::models::{EventId, TenantId};

use crate::{
    error::{ok_envelope, ApiError},
    AppState,
};

/// Largest page size the list endpoint serves.
const MAX_PAGE_SIZE: usize = 200;

/// Default page size when the caller does not ask for one.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Query parameters for the event list.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Page size, clamped to [1, 200].
    pub limit: Option<usize>,
    /// ID of the last event from the previous page.
    pub cursor: Option<String>,
}

/// Lists recent events, newest first.
#[instrument(name = "list_events", skip(state, query), fields(tenant = %tenant))]
pub async fn list_events(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let cursor = query.cursor.map(EventId::new);

    let (items, next_cursor) =
        state.storage.events.list_recent(&tenant, limit, cursor.as_ref()).await?;

    Ok(ok_envelope(serde_json::json!({
        "items": items,
        "cursor": next_cursor,
    })))
}

/// Reads a single event by ID.
#[instrument(name = "get_event", skip(state), fields(tenant = %tenant, event_id = %id))]
pub async fn get_event(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let event = state
        .storage
        .events
        .get(&tenant, &EventId::new(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(ok_envelope(event))
}

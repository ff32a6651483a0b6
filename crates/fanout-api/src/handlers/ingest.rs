//! Event intake handler.
//!
//! Validates the submission, persists the event, schedules deliveries
//! for every matching subscription, and acknowledges immediately. The
//! acknowledgement never waits on any subscriber endpoint; delivery
//! outcomes are observable only through attempt records and
//! subscription health.

use std::collections::HashMap;

use axum::{extract::State, Extension, Json};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use fanout_core::models::{Event, EventId, TenantId};

use crate::{
    error::{ok_envelope, ApiError},
    AppState,
};

/// Request body for event intake.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    /// Event-type name the event belongs to. Required; not validated
    /// against the catalog.
    #[serde(default)]
    pub event_type_id: String,
    /// Labels for subscription filtering.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// When the event happened; defaults to receipt time.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Opaque payload forwarded to subscribers.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Data section of a successful intake response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    /// Identifier assigned to the ingested event.
    pub event_id: EventId,
    /// When the engine accepted the event.
    pub received_at: DateTime<Utc>,
    /// How many subscriptions matched.
    pub matched_subscriptions: usize,
    /// How many delivery sequences were scheduled.
    pub deliveries_queued: usize,
}

/// Ingests one event and schedules its deliveries.
///
/// The body is parsed manually from bytes so malformed JSON maps to a
/// 400 rather than an unprocessable-entity rejection.
///
/// # Errors
///
/// - 400: body is not valid JSON, or `eventTypeId` is missing
/// - 500: the event or its index could not be persisted
#[instrument(name = "ingest_event", skip(state, body), fields(tenant = %tenant))]
pub async fn ingest_event(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantId>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request: IngestRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))?;

    let event_type_id = request.event_type_id.trim().to_string();
    if event_type_id.is_empty() {
        return Err(ApiError::BadRequest("Missing eventTypeId".to_string()));
    }

    let received_at = state.clock.now_utc();
    let event = Event {
        id: EventId::generate(),
        event_type: event_type_id,
        occurred_at: request.occurred_at.unwrap_or(received_at),
        received_at,
        labels: request.labels,
        payload: request.payload,
    };

    state.storage.events.create(&tenant, &event).await?;

    let scheduled = state.dispatcher.fan_out(&tenant, &event).await?;

    info!(
        event_id = %event.id,
        event_type = %event.event_type,
        scheduled,
        "event ingested"
    );

    Ok(ok_envelope(IngestResponse {
        event_id: event.id,
        received_at,
        matched_subscriptions: scheduled,
        deliveries_queued: scheduled,
    }))
}

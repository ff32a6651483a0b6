//! API error type and response envelope.
//!
//! Every response uses the same JSON envelope: `{"success": true,
//! "data": ...}` on success, `{"success": false, "error": "..."}` on
//! failure. Internal error details never reach the caller; they go to
//! the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use fanout_core::StoreError;

/// Errors a handler can return.
#[derive(Debug)]
pub enum ApiError {
    /// The request was malformed; the message is safe to echo.
    BadRequest(String),
    /// No valid credentials were presented.
    Unauthorized,
    /// The requested record does not exist.
    NotFound,
    /// Storage failed; logged, reported as a generic server error.
    Storage(StoreError),
    /// Delivery scheduling failed; logged, reported generically.
    Delivery(fanout_delivery::DeliveryError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}

impl From<fanout_delivery::DeliveryError> for ApiError {
    fn from(e: fanout_delivery::DeliveryError) -> Self {
        Self::Delivery(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            Self::Storage(e) => {
                error!(error = %e, "storage error while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            },
            Self::Delivery(e) => {
                error!(error = %e, "delivery error while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            },
        };

        (status, Json(serde_json::json!({ "success": false, "error": message }))).into_response()
    }
}

/// Wraps handler data in the success envelope.
pub fn ok_envelope<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "data": data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let response = ApiError::BadRequest("Missing eventTypeId".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_errors_hide_details() {
        let response =
            ApiError::Storage(StoreError::unavailable("kv down")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

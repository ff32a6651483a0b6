//! HTTP execution of single delivery attempts.
//!
//! One attempt is one request to the subscriber's endpoint with the
//! policy timeout applied. Every attempt produces an [`AttemptOutcome`]
//! whether or not a response arrived; the dispatcher decides whether to
//! retry.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use tracing::debug;

use crate::error::{DeliveryError, Result};

/// A fully prepared delivery request.
///
/// Headers are an ordered list; later entries with the same name
/// replace earlier ones, which is how engine identification headers win
/// over subscriber-configured static headers.
#[derive(Debug, Clone)]
pub struct AttemptRequest {
    /// HTTP method name, uppercased.
    pub method: String,
    /// Destination URL.
    pub url: String,
    /// Ordered header list, last occurrence of a name wins.
    pub headers: Vec<(String, String)>,
    /// Raw request body. The same bytes are signed and sent.
    pub body: Bytes,
    /// Per-attempt timeout from the effective policy.
    pub timeout: Duration,
}

/// Result of one HTTP attempt.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    /// True when a response arrived with status in [200, 300).
    pub ok: bool,
    /// Response status, or `None` when no response arrived.
    pub status: Option<u16>,
    /// Wall time from send to response or failure, in milliseconds.
    pub latency_ms: u64,
    /// `Timeout`, a transport error message, or `HTTP <status>` for
    /// non-2xx responses. `None` on success.
    pub error: Option<String>,
}

/// HTTP client for delivery attempts.
///
/// Connection pooling is shared across all delivery sequences. No
/// client-wide timeout is set; each attempt carries its own from the
/// subscription policy.
#[derive(Debug, Clone)]
pub struct AttemptClient {
    client: reqwest::Client,
}

impl AttemptClient {
    /// Creates a client with the engine user agent.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Configuration` if the underlying HTTP
    /// client cannot be built.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| DeliveryError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Executes one attempt and reports its outcome.
    ///
    /// Never returns an error: anything that keeps a response from
    /// arriving is an unsuccessful outcome with `status: None`.
    pub async fn execute(&self, request: &AttemptRequest) -> AttemptOutcome {
        let method = Method::from_bytes(request.method.as_bytes()).unwrap_or(Method::POST);
        let headers = build_header_map(&request.headers);

        let started = Instant::now();
        let response = self
            .client
            .request(method, &request.url)
            .headers(headers)
            .body(request.body.clone())
            .timeout(request.timeout)
            .send()
            .await;

        let latency_ms = started.elapsed().as_millis() as u64;

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                let ok = (200..300).contains(&status);
                debug!(status, latency_ms, "attempt completed");
                AttemptOutcome {
                    ok,
                    status: Some(status),
                    latency_ms,
                    error: if ok { None } else { Some(format!("HTTP {status}")) },
                }
            },
            Err(e) => {
                let error = if e.is_timeout() {
                    "Timeout".to_string()
                } else {
                    e.to_string()
                };
                debug!(latency_ms, error = %error, "attempt failed without response");
                AttemptOutcome { ok: false, status: None, latency_ms, error: Some(error) }
            },
        }
    }
}

/// Collapses the ordered header list into a header map, last name wins.
///
/// Headers that are not valid HTTP header names or values are dropped
/// rather than failing the whole attempt.
fn build_header_map(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let Ok(name) = HeaderName::try_from(name.as_str()) else {
            continue;
        };
        let Ok(value) = HeaderValue::try_from(value.as_str()) else {
            continue;
        };
        map.insert(name, value);
    }
    map
}

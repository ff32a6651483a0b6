//! Bearer-token authentication with tenant injection.
//!
//! Tenant resolution is a collaborator seam: the engine does not own
//! accounts or tokens, it only needs a token mapped to a tenant. The
//! [`StaticTokenResolver`] covers standalone runs and tests; a real
//! deployment plugs in its own resolver.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use async_trait::async_trait;

use fanout_core::models::TenantId;

use crate::{error::ApiError, state::AppState};

/// Maps bearer tokens to tenants.
#[async_trait]
pub trait TenantResolver: Send + Sync {
    /// Resolves a token to its tenant, or `None` when the token is
    /// unknown.
    async fn resolve(&self, token: &str) -> Option<TenantId>;
}

/// Resolver backed by a fixed token/tenant list.
#[derive(Debug, Default)]
pub struct StaticTokenResolver {
    tokens: Vec<(String, TenantId)>,
}

impl StaticTokenResolver {
    /// Creates a resolver with a single token.
    pub fn single(token: impl Into<String>, tenant: TenantId) -> Self {
        Self { tokens: vec![(token.into(), tenant)] }
    }

    /// Adds another token mapping.
    pub fn with_token(mut self, token: impl Into<String>, tenant: TenantId) -> Self {
        self.tokens.push((token.into(), tenant));
        self
    }
}

#[async_trait]
impl TenantResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str) -> Option<TenantId> {
        self.tokens.iter().find(|(t, _)| t == token).map(|(_, tenant)| tenant.clone())
    }
}

/// Extracts the bearer token from the Authorization header.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

/// Axum middleware that authenticates requests and injects the tenant.
///
/// Handlers read the tenant back out of request extensions; a request
/// without a resolvable token never reaches a handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(req.headers()).ok_or(ApiError::Unauthorized)?;

    let tenant = state.resolver.resolve(token).await.ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(tenant);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer tok-123"));
        assert_eq!(extract_token(&headers), Some("tok-123"));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert_eq!(extract_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_token(&headers), None);
    }

    #[tokio::test]
    async fn static_resolver_maps_known_tokens() {
        let resolver = StaticTokenResolver::single("tok-a", TenantId::new("acme"))
            .with_token("tok-b", TenantId::new("beta"));

        assert_eq!(resolver.resolve("tok-a").await, Some(TenantId::new("acme")));
        assert_eq!(resolver.resolve("tok-b").await, Some(TenantId::new("beta")));
        assert_eq!(resolver.resolve("tok-c").await, None);
    }
}

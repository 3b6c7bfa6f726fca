use axum::body::Body;
use axum::extract::{Query, Request};
use axum::http::{HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;

use crate::error::AppError;

/// Authentication configuration for the REST API.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for `/api/v1` access. None = auth disabled.
    pub bearer_token: Option<String>,
}

/// Axum middleware that validates Bearer token authentication.
/// If no token is configured (`AuthConfig::bearer_token` is None), all
/// requests are allowed through (auth disabled).
///
/// `EventSource` cannot set headers, so a `?token=` query parameter is
/// accepted as well.
pub async fn bearer_auth_middleware(
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    if let Some(ref expected) = auth_config.bearer_token
        && !token_matches(&headers, expected)
        && !query_token_matches(request.uri(), expected)
    {
        return Err(AppError::Unauthorized("Missing or invalid bearer token".to_string()));
    }

    Ok(next.run(request).await)
}

/// Check the `Authorization: Bearer` header against `expected`.
fn token_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()))
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Percent-decoded `token` query parameter, if present and non-empty.
fn query_token(uri: &Uri) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// Check a query-string token against the configured one.
fn query_token_matches(uri: &Uri, expected: &str) -> bool {
    query_token(uri).is_some_and(|t| constant_time_eq(t.as_bytes(), expected.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

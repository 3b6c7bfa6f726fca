use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};

use arcadia_core::sandbox::{FRAME_SANDBOX, ResourceHandle};

use crate::error::AppError;
use crate::state::AppState;

/// `Content-Security-Policy` for served programs. The `sandbox` directive gives
/// the document an opaque origin even if it is opened outside the iframe.
pub fn content_security_policy(block_network: bool) -> String {
    if block_network {
        format!("sandbox {FRAME_SANDBOX}; connect-src 'none'")
    } else {
        format!("sandbox {FRAME_SANDBOX}")
    }
}

/// GET /sandbox/{handle}: serve a minted program document.
///
/// Revoked or unknown handles are 404.
pub async fn serve_program(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound("Sandbox resource not found".to_string());
    let handle = ResourceHandle::parse(&handle).ok_or_else(not_found)?;
    let blob = state.blobs.get(&handle).ok_or_else(not_found)?;

    let csp = content_security_policy(state.config.sandbox.block_network);
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(blob.mime));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_str(&csp).map_err(|e| AppError::Internal(e.to_string()))?,
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );

    Ok((headers, blob.content.to_string()).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csp_sandboxes_scripts() {
        assert_eq!(
            content_security_policy(false),
            "sandbox allow-scripts allow-pointer-lock"
        );
    }

    #[test]
    fn csp_can_block_network() {
        assert!(content_security_policy(true).ends_with("; connect-src 'none'"));
    }
}

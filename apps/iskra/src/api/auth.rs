//! # API Key Gate
//!
//! Optional bearer-token authentication. Setting `ISKRA_API_KEY` turns
//! the gate on; every route except `/health` then requires the key in
//! the `Authorization` header, either as `Bearer <key>` or raw. With
//! the variable unset the gate is transparent.
//!
//! Key comparison is constant-time over length-padded buffers so
//! neither content nor length of the configured key leaks through
//! response timing.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

/// The configured API key, if any.
///
/// An empty `ISKRA_API_KEY` counts as unset.
pub fn configured_api_key() -> Option<String> {
    std::env::var("ISKRA_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Constant-time key comparison.
///
/// Both sides are padded to a common length before `ct_eq` so the
/// comparison always touches the same number of bytes; the length
/// check folds in afterwards.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let width = provided.len().max(expected.len());
    let mut lhs = vec![0u8; width];
    let mut rhs = vec![0u8; width];
    lhs[..provided.len()].copy_from_slice(provided);
    rhs[..expected.len()].copy_from_slice(expected);
    let bytes_equal: bool = lhs.ct_eq(&rhs).into();
    bytes_equal && provided.len() == expected.len()
}

/// Middleware enforcing the API key gate.
pub async fn require_api_key(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = configured_api_key() else {
        return Ok(next.run(request).await);
    };

    // Load balancers hit /health without credentials.
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let Some(header_value) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!(
            event = "auth_failure",
            reason = "missing_authorization_header",
            "Missing Authorization header"
        );
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized"));
    };

    let provided = header_value.strip_prefix("Bearer ").unwrap_or(header_value);
    if keys_match(provided.as_bytes(), expected.as_bytes()) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(
            event = "auth_failure",
            reason = "invalid_api_key",
            "Authentication failed: invalid API key"
        );
        Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

// =============================================================================
// TESTS
// =============================================================================

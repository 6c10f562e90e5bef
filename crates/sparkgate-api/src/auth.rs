//! HTTP Basic authentication gate

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::error::{Error, Result};
use crate::server::AppState;

/// Decode `Authorization: Basic <base64(user:password)>`
pub fn extract_basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value
        .strip_prefix("Basic ")
        .or_else(|| value.strip_prefix("basic "))?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Middleware rejecting requests without valid credentials.
///
/// Passes everything through when no validator is configured.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let Some(validator) = state.auth.as_ref() else {
        return Ok(next.run(request).await);
    };

    let (user, password) = extract_basic_credentials(request.headers())
        .ok_or_else(|| Error::Unauthorized("missing basic credentials".to_string()))?;
    validator.validate(&user, &password)?;

    debug!(user = %user, path = %request.uri().path(), "Authenticated request");
    Ok(next.run(request).await)
}

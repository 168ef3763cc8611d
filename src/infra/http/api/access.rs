//! Access guard for routes that expose one user's private data.
//!
//! Runs outside the response cache, so a cached hit is gated the same way as
//! a fresh read.

use axum::{
    body::Body,
    extract::RawPathParams,
    http::Request,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::error::ApiError;
use super::extract::Caller;

/// Admit the request only when the caller is one of the users named in the
/// path.
pub async fn require_path_user(
    Caller(caller): Caller,
    params: RawPathParams,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let named = params
        .iter()
        .any(|(_, value)| Uuid::parse_str(value).is_ok_and(|id| id == caller));
    if !named {
        return Err(ApiError::forbidden(Some(
            "caller must be a user named in the path".to_string(),
        )));
    }
    Ok(next.run(request).await)
}

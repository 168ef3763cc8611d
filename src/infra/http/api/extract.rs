//! Caller identity supplied by the upstream auth layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use super::error::ApiError;

pub const CALLER_HEADER: &str = "x-user-id";

/// Id of the user performing a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Uuid);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| ApiError::unauthorized(Some(format!("missing `{CALLER_HEADER}` header"))))?;
        let value = raw
            .to_str()
            .map_err(|_| ApiError::unauthorized(Some(format!("`{CALLER_HEADER}` is not ASCII"))))?;
        Uuid::parse_str(value.trim())
            .map(Caller)
            .map_err(|_| ApiError::unauthorized(Some(format!("`{CALLER_HEADER}` is not a user id"))))
    }
}

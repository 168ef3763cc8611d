//! Friendship, message and notification handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::Caller;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn create_friendship(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Json(payload): Json<FriendshipCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let friendship = state.social.befriend(caller, payload.user_id).await?;
    Ok((StatusCode::CREATED, envelope(friendship)))
}

pub async fn delete_friendship(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.social.unfriend(caller, id).await?;
    Ok(envelope(Deleted::new(id)))
}

pub async fn send_message(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Json(payload): Json<MessageCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .social
        .send_message(caller, payload.recipient_id, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, envelope(message)))
}

pub async fn get_conversation(
    State(state): State<ApiState>,
    Path((a, b)): Path<(Uuid, Uuid)>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .social
        .conversation(a, b, query.page_request())
        .await?;
    Ok(envelope(page))
}

pub async fn list_notifications(
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .social
        .notifications(user_id, query.page_request())
        .await?;
    Ok(envelope(page))
}

pub async fn mark_notification_read(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state.social.mark_read(caller, id).await?;
    Ok(envelope(notification))
}

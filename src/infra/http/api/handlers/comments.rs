//! Comment handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::Caller;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_comments(
    State(state): State<ApiState>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.posts.comments(post_id, query.page_request()).await?;
    Ok(envelope(page))
}

pub async fn create_comment(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .posts
        .add_comment(caller, post_id, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, envelope(comment)))
}

pub async fn get_comment(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.posts.get_comment(id).await?;
    Ok(envelope(comment))
}

pub async fn update_comment(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .posts
        .update_comment(caller, id, &payload.content)
        .await?;
    Ok(envelope(comment))
}

pub async fn delete_comment(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.posts.delete_comment(caller, id).await?;
    Ok(envelope(Deleted::new(id)))
}

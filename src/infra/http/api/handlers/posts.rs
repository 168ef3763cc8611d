//! Post and like handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::Caller;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_posts(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.posts.list(query.page_request()).await?;
    Ok(envelope(page))
}

pub async fn get_post(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.get(id).await?;
    Ok(envelope(post))
}

pub async fn create_post(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Json(payload): Json<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.create(caller, &payload.content).await?;
    Ok((StatusCode::CREATED, envelope(post)))
}

pub async fn update_post(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.update(caller, id, &payload.content).await?;
    Ok(envelope(post))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.posts.delete(caller, id).await?;
    Ok(envelope(Deleted::new(id)))
}

pub async fn list_likes(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.posts.likes(id, query.page_request()).await?;
    Ok(envelope(page))
}

pub async fn like_post(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let like = state.posts.like(caller, id).await?;
    Ok((StatusCode::CREATED, envelope(like)))
}

pub async fn unlike_post(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.posts.unlike(caller, id).await?;
    Ok(envelope(Deleted::new(id)))
}

//! User handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::users::{CreateUserCommand, UpdateUserCommand};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::Caller;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_users(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.users.list(query.page_request()).await?;
    Ok(envelope(page))
}

pub async fn get_user(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.get(id).await?;
    Ok(envelope(user))
}

pub async fn create_user(
    State(state): State<ApiState>,
    Json(payload): Json<UserCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .create(CreateUserCommand {
            username: payload.username,
            email: payload.email,
            display_name: payload.display_name,
            bio: payload.bio,
        })
        .await?;
    Ok((StatusCode::CREATED, envelope(user)))
}

pub async fn update_user(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .update(
            caller,
            id,
            UpdateUserCommand {
                display_name: payload.display_name,
                bio: payload.bio,
            },
        )
        .await?;
    Ok(envelope(user))
}

pub async fn delete_user(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.users.delete(caller, id).await?;
    Ok(envelope(Deleted::new(id)))
}

pub async fn list_user_posts(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.users.posts_of(id, query.page_request()).await?;
    Ok(envelope(page))
}

pub async fn list_user_friends(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.users.friends_of(id, query.page_request()).await?;
    Ok(envelope(page))
}

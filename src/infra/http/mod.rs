//! HTTP surface: resource routes, health probe and shared middleware.

pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};

use axum::{
    Router,
    extract::State,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;

use crate::cache::CacheTrigger;

use api::models::envelope;

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    cache: CacheHealth,
}

#[derive(Debug, Serialize)]
struct CacheHealth {
    enabled: bool,
    backend: &'static str,
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    registered_keys: Option<usize>,
}

/// Liveness plus cache store readiness. Never cached; the registry size is a
/// single cardinality read.
async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let cache = &state.cache;
    let ready = cache.registry.store().is_ready();
    let registered_keys = if cache.config.enabled && ready {
        cache.registry.registered_count().await.ok()
    } else {
        None
    };

    envelope(HealthReport {
        status: "ok",
        cache: CacheHealth {
            enabled: cache.config.enabled,
            backend: cache.config.backend.as_str(),
            ready,
            registered_keys,
        },
    })
}

/// Full application router.
pub fn build_router(state: ApiState, trigger: CacheTrigger) -> Router {
    let health_router = Router::new()
        .route("/health", get(health))
        .with_state(state.clone());

    build_api_router(state, trigger)
        .merge(health_router)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

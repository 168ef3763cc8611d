//! Read-through response cache middleware.
//!
//! Wraps GET routes: a stored body is served with a `cache: true` marker, a
//! miss runs the handler and stores its 200 body in the background. Any store
//! failure degrades to plain pass-through.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{
    CacheConfig, CacheRegistry,
    keys::{CacheKey, Category},
    store::KvStore,
};

const METRIC_HIT: &str = "agora_cache_hit_total";
const METRIC_MISS: &str = "agora_cache_miss_total";
const METRIC_BYPASS: &str = "agora_cache_bypass_total";
pub(crate) const METRIC_STORE_ERROR: &str = "agora_cache_store_error_total";

/// Field added to bodies served from the store.
pub const HIT_MARKER: &str = "cache";

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: Arc<CacheConfig>,
    pub registry: Arc<CacheRegistry>,
}

impl CacheState {
    pub fn new(config: CacheConfig, store: Arc<dyn KvStore>) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(CacheRegistry::new(store)),
        }
    }

    /// Cache settings for one route, using the default TTL.
    pub fn route(&self, category: Category) -> RouteCache {
        RouteCache {
            ttl: self.config.default_ttl,
            cache: self.clone(),
            category,
        }
    }
}

/// Per-route cache declaration: the category its keys register under and
/// how long they live.
#[derive(Clone)]
pub struct RouteCache {
    cache: CacheState,
    category: Category,
    ttl: Duration,
}

impl RouteCache {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(route): State<RouteCache>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !route.cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let registry = route.cache.registry.clone();
    if !registry.store().is_ready() {
        counter!(METRIC_BYPASS).increment(1);
        debug!(cache = "response", outcome = "bypass", "store disconnected");
        return next.run(request).await;
    }

    let key = CacheKey::from_uri(request.uri());

    match registry.store().get(key.as_str()).await {
        Ok(Some(stored)) => match mark_hit(&stored) {
            Some(body) => {
                counter!(METRIC_HIT).increment(1);
                debug!(cache = "response", outcome = "hit", key = %key, "serving cached response");
                return (StatusCode::OK, Json(body)).into_response();
            }
            None => debug!(cache = "response", key = %key, "stored entry unreadable"),
        },
        Ok(None) => {}
        Err(err) => {
            counter!(METRIC_STORE_ERROR).increment(1);
            warn!(cache = "response", key = %key, error = %err, "cache lookup failed");
        }
    }

    counter!(METRIC_MISS).increment(1);
    debug!(cache = "response", outcome = "miss", key = %key, "executing handler");

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(cache = "response", error = %err, "failed to read response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Some(entry) = cacheable_body(&bytes, route.cache.config.max_body_bytes) {
        tokio::spawn(populate(registry, key, route.category, entry, route.ttl));
    }

    Response::from_parts(parts, Body::from(bytes))
}

/// Parse a stored body and add the hit marker. Anything that is not a JSON
/// object is treated as a miss.
fn mark_hit(stored: &str) -> Option<Value> {
    let mut value: Value = serde_json::from_str(stored).ok()?;
    value
        .as_object_mut()?
        .insert(HIT_MARKER.to_string(), Value::Bool(true));
    Some(value)
}

/// Text to store for a handler body, if it is a JSON object within the size
/// limit.
fn cacheable_body(bytes: &Bytes, max_bytes: usize) -> Option<String> {
    if bytes.len() > max_bytes {
        debug!(cache = "response", size = bytes.len(), "body too large to cache");
        return None;
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(_)) => std::str::from_utf8(bytes).ok().map(str::to_string),
        Ok(_) => None,
        Err(err) => {
            debug!(cache = "response", error = %err, "body is not JSON, skipping cache");
            None
        }
    }
}

async fn populate(
    registry: Arc<CacheRegistry>,
    key: CacheKey,
    category: Category,
    body: String,
    ttl: Duration,
) {
    if let Err(err) = registry.store().set_ex(key.as_str(), &body, ttl).await {
        counter!(METRIC_STORE_ERROR).increment(1);
        warn!(cache = "response", key = %key, error = %err, "failed to store response");
        return;
    }

    if let Err(err) = registry.register(&key, category).await {
        counter!(METRIC_STORE_ERROR).increment(1);
        warn!(cache = "response", key = %key, error = %err, "failed to register key");
        return;
    }

    debug!(cache = "response", key = %key, ttl_secs = ttl.as_secs(), "response stored");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_marker_is_added_to_objects() {
        let body = mark_hit(r#"{"success":true,"data":[1,2]}"#).unwrap();
        assert_eq!(body["cache"], Value::Bool(true));
        assert_eq!(body["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn unreadable_entries_are_misses() {
        assert!(mark_hit("not json").is_none());
        assert!(mark_hit("[1,2,3]").is_none());
    }

    #[test]
    fn only_json_objects_within_limit_are_cacheable() {
        let object = Bytes::from_static(br#"{"success":true}"#);
        assert_eq!(
            cacheable_body(&object, 1024).as_deref(),
            Some(r#"{"success":true}"#)
        );
        assert!(cacheable_body(&object, 4).is_none());
        assert!(cacheable_body(&Bytes::from_static(b"[1]"), 1024).is_none());
        assert!(cacheable_body(&Bytes::from_static(b"<html>"), 1024).is_none());
    }

    #[tokio::test]
    async fn route_ttl_bounds_entry_lifetime() {
        use axum::{Router, middleware, routing::get};
        use tower::ServiceExt;

        use crate::cache::MemoryStore;

        let store = Arc::new(MemoryStore::new());
        let cache = CacheState::new(CacheConfig::default(), store.clone());
        let app = Router::new().route(
            "/api/users",
            get(|| async { Json(serde_json::json!({ "success": true })) }).route_layer(
                middleware::from_fn_with_state(
                    cache.route(Category::Users).with_ttl(Duration::from_millis(40)),
                    response_cache_layer,
                ),
            ),
        );

        let request = Request::builder()
            .uri("/api/users")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut stored = false;
        for _ in 0..100 {
            if store.exists("cache:/api/users").await.unwrap() {
                stored = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(stored);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!store.exists("cache:/api/users").await.unwrap());
    }
}

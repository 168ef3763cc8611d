//! Invalidation trigger for mutating routes.
//!
//! Each mutating route declares the cache scopes it dirties. Scopes are
//! resolved from the request before the handler runs (a delete may remove
//! the row needed to find a parent) and purged once the handler returns a
//! 2xx status.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{FromRequestParts, RawPathParams, State},
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, info, warn};

use super::keys::Category;
use super::middleware::CacheState;

/// Looks up parent resources for routes that only expose a child id.
#[async_trait]
pub trait ParentResolver: Send + Sync {
    /// Id of the post a comment belongs to.
    async fn post_of_comment(&self, comment_id: &str) -> Option<String>;
}

/// Scope a mutating route invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationTarget {
    /// Every cached response of a category.
    Category(Category),
    /// Responses under `posts/{id}`, the id read from the named path
    /// parameter.
    Post { param: &'static str },
    /// Responses under the post owning the comment named by a path parameter.
    CommentParent { param: &'static str },
}

#[derive(Clone)]
pub struct CacheTrigger {
    cache: CacheState,
    resolver: Arc<dyn ParentResolver>,
}

impl CacheTrigger {
    pub fn new(cache: CacheState, resolver: Arc<dyn ParentResolver>) -> Self {
        Self { cache, resolver }
    }

    pub fn cache(&self) -> &CacheState {
        &self.cache
    }

    /// Invalidation declaration for one route.
    pub fn on_success(&self, targets: &[InvalidationTarget]) -> RouteInvalidation {
        RouteInvalidation {
            trigger: self.clone(),
            targets: Arc::from(targets),
        }
    }

    /// Turn declared targets into purge scopes.
    ///
    /// A parent that cannot be determined widens the scope to the whole
    /// `posts` category.
    pub async fn resolve(
        &self,
        targets: &[InvalidationTarget],
        params: &HashMap<String, String>,
    ) -> Vec<String> {
        let mut scopes = Vec::with_capacity(targets.len());
        for target in targets {
            let scope = match *target {
                InvalidationTarget::Category(category) => category.as_str().to_string(),
                InvalidationTarget::Post { param } => match params.get(param) {
                    Some(id) => post_scope(id),
                    None => Category::Posts.as_str().to_string(),
                },
                InvalidationTarget::CommentParent { param } => {
                    let parent = match params.get(param) {
                        Some(comment_id) => self.resolver.post_of_comment(comment_id).await,
                        None => None,
                    };
                    match parent {
                        Some(post_id) => post_scope(&post_id),
                        None => {
                            warn!(
                                cache = "trigger",
                                "parent post unresolved, purging all posts"
                            );
                            Category::Posts.as_str().to_string()
                        }
                    }
                }
            };
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        scopes
    }

    /// Purge every scope, returning the total number of removed entries.
    pub async fn invalidate(&self, scopes: &[String]) -> usize {
        if !self.cache.config.enabled {
            debug!(cache = "trigger", "cache disabled, invalidation skipped");
            return 0;
        }

        let mut removed = 0;
        for scope in scopes {
            removed += self.cache.registry.purge(scope).await;
        }
        info!(cache = "trigger", scopes = ?scopes, removed, "invalidated cached responses");
        removed
    }
}

fn post_scope(post_id: &str) -> String {
    format!("{}/{post_id}*", Category::Posts.as_str())
}

/// Middleware state produced by [`CacheTrigger::on_success`].
#[derive(Clone)]
pub struct RouteInvalidation {
    trigger: CacheTrigger,
    targets: Arc<[InvalidationTarget]>,
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Purge the route's declared scopes after a successful mutation.
pub async fn invalidate_on_success(
    State(route): State<RouteInvalidation>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !route.trigger.cache.config.enabled || !is_mutating(request.method()) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let params: HashMap<String, String> = match RawPathParams::from_request_parts(&mut parts, &()).await
    {
        Ok(raw) => raw
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        Err(_) => HashMap::new(),
    };
    let scopes = route.trigger.resolve(&route.targets, &params).await;

    let response = next.run(Request::from_parts(parts, body)).await;

    if response.status().is_success() {
        route.trigger.invalidate(&scopes).await;
    } else {
        debug!(
            cache = "trigger",
            status = response.status().as_u16(),
            "mutation failed, cache left intact"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        Router,
        http::StatusCode,
        middleware,
        routing::{get, post},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::cache::{CacheConfig, KvStore, MemoryStore};

    struct FixedParent(Option<&'static str>);

    #[async_trait]
    impl ParentResolver for FixedParent {
        async fn post_of_comment(&self, _comment_id: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn trigger(parent: Option<&'static str>) -> (Arc<MemoryStore>, CacheTrigger) {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheState::new(CacheConfig::default(), store.clone());
        (store, CacheTrigger::new(cache, Arc::new(FixedParent(parent))))
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn post_target_scopes_to_single_post() {
        let (_, trigger) = trigger(None);
        let scopes = trigger
            .resolve(
                &[
                    InvalidationTarget::Post { param: "id" },
                    InvalidationTarget::Category(Category::Notifications),
                ],
                &params(&[("id", "abc")]),
            )
            .await;
        assert_eq!(scopes, vec!["posts/abc*", "notifications"]);
    }

    #[tokio::test]
    async fn comment_parent_uses_resolver() {
        let (_, trigger) = trigger(Some("p1"));
        let scopes = trigger
            .resolve(
                &[InvalidationTarget::CommentParent { param: "id" }],
                &params(&[("id", "c1")]),
            )
            .await;
        assert_eq!(scopes, vec!["posts/p1*"]);
    }

    #[tokio::test]
    async fn unresolved_parent_falls_back_to_category() {
        let (_, trigger) = trigger(None);
        let scopes = trigger
            .resolve(
                &[
                    InvalidationTarget::CommentParent { param: "id" },
                    InvalidationTarget::Category(Category::Posts),
                ],
                &params(&[("id", "c1")]),
            )
            .await;
        assert_eq!(scopes, vec!["posts"]);
    }

    async fn seed(store: &MemoryStore, key: &str) {
        store
            .set_ex(key, "{}", Duration::from_secs(60))
            .await
            .unwrap();
    }

    fn router(trigger: &CacheTrigger, status: StatusCode) -> Router {
        Router::new()
            .route(
                "/api/posts/{id}/likes",
                post(move || async move { status }).route_layer(middleware::from_fn_with_state(
                    trigger.on_success(&[InvalidationTarget::Post { param: "id" }]),
                    invalidate_on_success,
                )),
            )
            .route("/api/posts", get(|| async { "ok" }))
    }

    fn like(id: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(format!("/api/posts/{id}/likes"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn successful_mutation_purges_declared_scope() {
        let (store, trigger) = trigger(None);
        seed(&store, "cache:/api/posts/7").await;
        seed(&store, "cache:/api/posts/7/likes").await;
        seed(&store, "cache:/api/posts/8").await;

        let response = router(&trigger, StatusCode::CREATED)
            .oneshot(like("7"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(!store.exists("cache:/api/posts/7").await.unwrap());
        assert!(!store.exists("cache:/api/posts/7/likes").await.unwrap());
        assert!(store.exists("cache:/api/posts/8").await.unwrap());
    }

    #[tokio::test]
    async fn failed_mutation_keeps_cache() {
        let (store, trigger) = trigger(None);
        seed(&store, "cache:/api/posts/7").await;

        let response = router(&trigger, StatusCode::BAD_REQUEST)
            .oneshot(like("7"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.exists("cache:/api/posts/7").await.unwrap());
    }
}

//! End-to-end cache behaviour through the full router, backed by the
//! in-process store and repositories.

use std::sync::Arc;

use agora::application::posts::PostService;
use agora::application::social::SocialService;
use agora::application::users::UserService;
use agora::cache::{CacheConfig, CacheState, CacheTrigger, KvStore, MemoryStore, StoreBackend};
use agora::infra::http::{ApiState, build_router};
use agora::infra::memory::MemoryRepositories;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(CacheConfig {
            backend: StoreBackend::Memory,
            ..Default::default()
        })
    }

    fn with_config(config: CacheConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let repos = Arc::new(MemoryRepositories::new());
        let cache = CacheState::new(config, store.clone());

        let state = ApiState {
            users: Arc::new(UserService::new(repos.clone(), repos.clone(), repos.clone())),
            posts: Arc::new(PostService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                repos.clone(),
                repos.clone(),
            )),
            social: Arc::new(SocialService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                repos.clone(),
            )),
            cache: cache.clone(),
        };
        let router = build_router(state, CacheTrigger::new(cache, repos));

        Self { router, store }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            builder = builder.header("x-user-id", caller);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request should build"))
            .await
            .expect("router should respond");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    async fn get_as(&self, caller: &str, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(caller), None).await
    }

    async fn create_user(&self, username: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/users",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user: {body}");
        body["data"]["id"].as_str().expect("user id").to_string()
    }

    async fn create_post(&self, author: &str, content: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/posts",
                Some(author),
                Some(json!({ "content": content })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create post: {body}");
        body["data"]["id"].as_str().expect("post id").to_string()
    }

    async fn comment(&self, author: &str, post: &str, content: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                &format!("/api/posts/{post}/comments"),
                Some(author),
                Some(json!({ "content": content })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create comment: {body}");
        body["data"]["id"].as_str().expect("comment id").to_string()
    }

    async fn cached(&self, key: &str) -> bool {
        self.store.exists(key).await.expect("memory store answers")
    }

    /// Wait for background population of `key`.
    async fn wait_cached(&self, key: &str) -> bool {
        for _ in 0..100 {
            if self.cached(key).await {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

fn is_hit(body: &Value) -> bool {
    body.get("cache") == Some(&Value::Bool(true))
}

#[tokio::test]
async fn miss_then_hit_then_purge_on_write() {
    let app = TestApp::new();
    let ada = app.create_user("ada").await;
    app.create_post(&ada, "hello").await;

    let (status, first) = app.get("/api/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!is_hit(&first));
    assert!(app.wait_cached("cache:/api/posts").await);

    let (status, second) = app.get("/api/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_hit(&second));
    assert_eq!(second["data"], first["data"]);

    app.create_post(&ada, "again").await;
    assert!(!app.cached("cache:/api/posts").await);

    let (_, third) = app.get("/api/posts").await;
    assert!(!is_hit(&third));
    assert_eq!(third["data"]["total"], 2);
}

#[tokio::test]
async fn disconnected_store_passes_through() {
    let app = TestApp::new();
    app.create_user("ada").await;
    app.store.set_ready(false);

    for _ in 0..2 {
        let (status, body) = app.get("/api/users").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!is_hit(&body));
        assert_eq!(body["data"]["total"], 1);
    }

    app.store.set_ready(true);
    settle().await;
    assert!(!app.cached("cache:/api/users").await);
}

#[tokio::test]
async fn errors_are_not_cached() {
    let app = TestApp::new();
    let missing = "00000000-0000-0000-0000-000000000000";
    let uri = format!("/api/posts/{missing}");

    let (status, body) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "not_found");

    settle().await;
    assert!(!app.cached(&format!("cache:{uri}")).await);
}

#[tokio::test]
async fn mutations_are_never_served_from_cache() {
    let app = TestApp::new();
    let ada = app.create_user("ada").await;

    app.get("/api/posts").await;
    assert!(app.wait_cached("cache:/api/posts").await);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/posts",
            Some(&ada),
            Some(json!({ "content": "fresh" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!is_hit(&body));
    assert_eq!(body["data"]["content"], "fresh");
}

#[tokio::test]
async fn failed_mutation_keeps_cache() {
    let app = TestApp::new();
    app.create_user("ada").await;

    app.get("/api/posts").await;
    assert!(app.wait_cached("cache:/api/posts").await);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/posts",
            None,
            Some(json!({ "content": "anonymous" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.cached("cache:/api/posts").await);
}

#[tokio::test]
async fn like_purges_only_that_post() {
    let app = TestApp::new();
    let ada = app.create_user("ada").await;
    let bob = app.create_user("bob").await;
    let liked = app.create_post(&ada, "like me").await;
    let other = app.create_post(&ada, "leave me").await;

    let liked_uri = format!("/api/posts/{liked}");
    let other_uri = format!("/api/posts/{other}");
    app.get(&liked_uri).await;
    app.get(&other_uri).await;
    assert!(app.wait_cached(&format!("cache:{liked_uri}")).await);
    assert!(app.wait_cached(&format!("cache:{other_uri}")).await);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/posts/{liked}/likes"),
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    assert!(!app.cached(&format!("cache:{liked_uri}")).await);
    assert!(app.cached(&format!("cache:{other_uri}")).await);
}

#[tokio::test]
async fn comment_edit_purges_parent_post_comments() {
    let app = TestApp::new();
    let ada = app.create_user("ada").await;
    let post = app.create_post(&ada, "discuss").await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/posts/{post}/comments"),
            Some(&ada),
            Some(json!({ "content": "first" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment = body["data"]["id"].as_str().expect("comment id").to_string();

    let comments_uri = format!("/api/posts/{post}/comments");
    app.get(&comments_uri).await;
    assert!(app.wait_cached(&format!("cache:{comments_uri}")).await);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/comments/{comment}"),
            Some(&ada),
            Some(json!({ "content": "edited" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!app.cached(&format!("cache:{comments_uri}")).await);

    let (_, fresh) = app.get(&comments_uri).await;
    assert!(!is_hit(&fresh));
    assert_eq!(fresh["data"]["items"][0]["content"], "edited");
}

#[tokio::test]
async fn comment_delete_resolves_parent_before_removal() {
    let app = TestApp::new();
    let ada = app.create_user("ada").await;
    let post = app.create_post(&ada, "discuss").await;
    let other = app.create_post(&ada, "quiet").await;

    let (_, body) = app
        .send(
            Method::POST,
            &format!("/api/posts/{post}/comments"),
            Some(&ada),
            Some(json!({ "content": "bye" })),
        )
        .await;
    let comment = body["data"]["id"].as_str().expect("comment id").to_string();

    let comments_uri = format!("/api/posts/{post}/comments");
    let other_uri = format!("/api/posts/{other}");
    app.get(&comments_uri).await;
    app.get(&other_uri).await;
    assert!(app.wait_cached(&format!("cache:{comments_uri}")).await);
    assert!(app.wait_cached(&format!("cache:{other_uri}")).await);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/comments/{comment}"),
            Some(&ada),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert!(!app.cached(&format!("cache:{comments_uri}")).await);
    assert!(app.cached(&format!("cache:{other_uri}")).await);
}

#[tokio::test]
async fn query_strings_are_cached_separately() {
    let app = TestApp::new();
    app.create_user("ada").await;
    app.create_user("bob").await;

    let (_, page_one) = app.get("/api/users?limit=1").await;
    assert!(app.wait_cached("cache:/api/users?limit=1").await);
    let (_, page_two) = app.get("/api/users?limit=1&page=2").await;

    assert!(!is_hit(&page_two));
    assert_ne!(page_one["data"]["items"], page_two["data"]["items"]);
}

#[tokio::test]
async fn notifications_follow_likes() {
    let app = TestApp::new();
    let ada = app.create_user("ada").await;
    let bob = app.create_user("bob").await;
    let post = app.create_post(&ada, "like me").await;

    let inbox = format!("/api/notifications/{ada}");
    let (_, empty) = app.get_as(&ada, &inbox).await;
    assert_eq!(empty["data"]["total"], 0);
    assert!(app.wait_cached(&format!("cache:{inbox}")).await);

    app.send(
        Method::POST,
        &format!("/api/posts/{post}/likes"),
        Some(&bob),
        None,
    )
    .await;

    let (_, after) = app.get_as(&ada, &inbox).await;
    assert!(!is_hit(&after));
    assert_eq!(after["data"]["total"], 1);
    assert_eq!(after["data"]["items"][0]["kind"], "like");
}

#[tokio::test]
async fn disabled_cache_never_stores() {
    let app = TestApp::with_config(CacheConfig {
        enabled: false,
        backend: StoreBackend::Memory,
        ..Default::default()
    });
    app.create_user("ada").await;

    app.get("/api/users").await;
    let (_, body) = app.get("/api/users").await;
    settle().await;

    assert!(!is_hit(&body));
    assert!(!app.cached("cache:/api/users").await);
}

#[tokio::test]
async fn health_reports_store_readiness() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cache"]["ready"], true);
    assert_eq!(body["data"]["cache"]["backend"], "memory");
    assert_eq!(body["data"]["cache"]["registered_keys"], 0);

    app.get("/api/users").await;
    assert!(app.wait_cached("cache:/api/users").await);
    let (_, body) = app.get("/health").await;
    assert_eq!(body["data"]["cache"]["registered_keys"], 1);

    app.store.set_ready(false);
    let (_, body) = app.get("/health").await;
    assert_eq!(body["data"]["cache"]["ready"], false);
    assert!(!is_hit(&body));
}

#[tokio::test]
async fn post_delete_purges_its_comments() {
    let app = TestApp::new();
    let ada = app.create_user("ada").await;
    let bob = app.create_user("bob").await;
    let post = app.create_post(&ada, "short lived").await;
    let comment = app.comment(&bob, &post, "nice").await;

    let comment_uri = format!("/api/comments/{comment}");
    let (status, _) = app.get(&comment_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.wait_cached(&format!("cache:{comment_uri}")).await);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/posts/{post}"), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&comment_uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!is_hit(&body));
}

#[tokio::test]
async fn user_delete_purges_cascaded_rows() {
    let app = TestApp::new();
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let post = app.create_post(&bob, "hello").await;
    let comment = app.comment(&alice, &post, "hi bob").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/messages",
            Some(&alice),
            Some(json!({ "recipient_id": bob, "content": "secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/posts/{post}/likes"),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let comment_uri = format!("/api/comments/{comment}");
    let conversation_uri = format!("/api/messages/{alice}/{bob}");
    let inbox_uri = format!("/api/notifications/{bob}");
    app.get(&comment_uri).await;
    app.get_as(&bob, &conversation_uri).await;
    let (_, inbox) = app.get_as(&bob, &inbox_uri).await;
    assert_eq!(inbox["data"]["total"], 2);
    for uri in [&comment_uri, &conversation_uri, &inbox_uri] {
        assert!(app.wait_cached(&format!("cache:{uri}")).await, "{uri}");
    }

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/users/{alice}"), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&comment_uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app.get_as(&bob, &conversation_uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!is_hit(&body));
    let (status, inbox) = app.get_as(&bob, &inbox_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!is_hit(&inbox));
    assert_eq!(inbox["data"]["total"], 0);
}

#[tokio::test]
async fn private_reads_require_a_named_caller() {
    let app = TestApp::new();
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let eve = app.create_user("eve").await;
    app.send(
        Method::POST,
        "/api/messages",
        Some(&alice),
        Some(json!({ "recipient_id": bob, "content": "secret" })),
    )
    .await;

    let conversation_uri = format!("/api/messages/{alice}/{bob}");
    let inbox_uri = format!("/api/notifications/{alice}");
    let (status, body) = app.get_as(&bob, &conversation_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["content"], "secret");
    app.get_as(&alice, &inbox_uri).await;
    assert!(app.wait_cached(&format!("cache:{conversation_uri}")).await);
    assert!(app.wait_cached(&format!("cache:{inbox_uri}")).await);

    for uri in [&conversation_uri, &inbox_uri] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "unauthorized");

        let (status, body) = app.get_as(&eve, uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!is_hit(&body));
    }
    let (status, _) = app.get_as(&bob, &inbox_uri).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get_as(&alice, &conversation_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_hit(&body));
}

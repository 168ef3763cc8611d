//! Resource routes under `/api`.
//!
//! GET routes are wrapped in the response cache for their category; mutating
//! routes declare the scopes they invalidate once they succeed. Deletes also
//! purge every category their cascade reaches.

pub mod access;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    handler::Handler,
    middleware as axum_middleware,
    routing::{MethodRouter, delete, get, patch, post, put},
};

use crate::cache::{
    CacheTrigger, Category, InvalidationTarget, invalidate_on_success, response_cache_layer,
};

use crate::cache::InvalidationTarget::{Category as Purge, CommentParent, Post};

/// Attaches cache and invalidation middleware to individual routes.
struct RouteBuilder {
    trigger: CacheTrigger,
}

impl RouteBuilder {
    fn cached<H, T>(&self, category: Category, handler: H) -> MethodRouter<ApiState>
    where
        H: Handler<T, ApiState>,
        T: 'static,
    {
        get(handler).route_layer(axum_middleware::from_fn_with_state(
            self.trigger.cache().route(category),
            response_cache_layer,
        ))
    }

    /// Cached read limited to the users named in the path. The guard sits
    /// outside the cache layer so hits are checked too.
    fn private<H, T>(&self, category: Category, handler: H) -> MethodRouter<ApiState>
    where
        H: Handler<T, ApiState>,
        T: 'static,
    {
        self.cached(category, handler)
            .route_layer(axum_middleware::from_fn(access::require_path_user))
    }

    fn invalidating(
        &self,
        route: MethodRouter<ApiState>,
        targets: &[InvalidationTarget],
    ) -> MethodRouter<ApiState> {
        route.route_layer(axum_middleware::from_fn_with_state(
            self.trigger.on_success(targets),
            invalidate_on_success,
        ))
    }
}

pub fn build_api_router(state: ApiState, trigger: CacheTrigger) -> Router {
    let r = RouteBuilder { trigger };
    let user_write = [Purge(Category::Users), Purge(Category::Posts)];
    let user_delete = [
        Purge(Category::Users),
        Purge(Category::Posts),
        Purge(Category::Comments),
        Purge(Category::Messages),
        Purge(Category::Notifications),
    ];
    let post_write = [Purge(Category::Posts), Purge(Category::Users)];
    let post_delete = [
        Purge(Category::Posts),
        Purge(Category::Users),
        Purge(Category::Comments),
    ];
    let post_activity = [Post { param: "id" }, Purge(Category::Notifications)];
    let comment_write = [CommentParent { param: "id" }, Purge(Category::Comments)];
    let social_write = [Purge(Category::Users), Purge(Category::Notifications)];

    Router::new()
        .route(
            "/api/users",
            r.cached(Category::Users, handlers::list_users).merge(r.invalidating(
                post(handlers::create_user),
                &[Purge(Category::Users)],
            )),
        )
        .route(
            "/api/users/{id}",
            r.cached(Category::Users, handlers::get_user)
                .merge(r.invalidating(put(handlers::update_user), &user_write))
                .merge(r.invalidating(delete(handlers::delete_user), &user_delete)),
        )
        .route(
            "/api/users/{id}/posts",
            r.cached(Category::Users, handlers::list_user_posts),
        )
        .route(
            "/api/users/{id}/friends",
            r.cached(Category::Users, handlers::list_user_friends),
        )
        .route(
            "/api/posts",
            r.cached(Category::Posts, handlers::list_posts)
                .merge(r.invalidating(post(handlers::create_post), &post_write)),
        )
        .route(
            "/api/posts/{id}",
            r.cached(Category::Posts, handlers::get_post)
                .merge(r.invalidating(put(handlers::update_post), &post_write))
                .merge(r.invalidating(delete(handlers::delete_post), &post_delete)),
        )
        .route(
            "/api/posts/{id}/comments",
            r.cached(Category::Posts, handlers::list_comments)
                .merge(r.invalidating(post(handlers::create_comment), &post_activity)),
        )
        .route(
            "/api/posts/{id}/likes",
            r.cached(Category::Posts, handlers::list_likes).merge(r.invalidating(
                post(handlers::like_post).delete(handlers::unlike_post),
                &post_activity,
            )),
        )
        .route(
            "/api/comments/{id}",
            r.cached(Category::Comments, handlers::get_comment).merge(r.invalidating(
                put(handlers::update_comment).delete(handlers::delete_comment),
                &comment_write,
            )),
        )
        .route(
            "/api/friendships",
            r.invalidating(post(handlers::create_friendship), &social_write),
        )
        .route(
            "/api/friendships/{id}",
            r.invalidating(delete(handlers::delete_friendship), &social_write),
        )
        .route(
            "/api/messages",
            r.invalidating(
                post(handlers::send_message),
                &[Purge(Category::Messages)],
            ),
        )
        .route(
            "/api/messages/{a}/{b}",
            r.private(Category::Messages, handlers::get_conversation),
        )
        .route(
            "/api/notifications/{id}",
            r.private(Category::Notifications, handlers::list_notifications),
        )
        .route(
            "/api/notifications/{id}/read",
            r.invalidating(
                patch(handlers::mark_notification_read),
                &[Purge(Category::Notifications)],
            ),
        )
        .with_state(state)
}

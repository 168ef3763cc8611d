use std::{process, sync::Arc};

use agora::{
    application::{
        error::AppError,
        posts::PostService,
        repos::{
            CommentsRepo, FriendshipsRepo, LikesRepo, MessagesRepo, NotificationsRepo, PostsRepo,
            UsersRepo,
        },
        social::SocialService,
        users::UserService,
    },
    cache::{
        CacheConfig, CacheState, CacheTrigger, KvStore, MemoryStore, ParentResolver, RedisStore,
        StoreBackend,
    },
    config,
    infra::{
        error::InfraError,
        http::{self, ApiState},
        memory::MemoryRepositories,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Purge(args) => run_purge(settings, args).await,
    }
}

/// Open the configured store. Redis stores get a background health check
/// when `watch` is set.
async fn open_store(cache: &CacheConfig, watch: bool) -> Result<Arc<dyn KvStore>, AppError> {
    match cache.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Redis => {
            let store = RedisStore::connect(cache).await.map_err(|err| {
                InfraError::configuration(format!("invalid cache.redis_url: {err}"))
            })?;
            let store = Arc::new(store);
            if watch {
                store.clone().spawn_health_check(cache.health_check_interval);
            }
            Ok(store as Arc<dyn KvStore>)
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let store = open_store(&cache_config, cache_config.enabled).await?;
    let cache = CacheState::new(cache_config, store);

    let repositories = Arc::new(MemoryRepositories::new());
    let users: Arc<dyn UsersRepo> = repositories.clone();
    let posts: Arc<dyn PostsRepo> = repositories.clone();
    let comments: Arc<dyn CommentsRepo> = repositories.clone();
    let likes: Arc<dyn LikesRepo> = repositories.clone();
    let friendships: Arc<dyn FriendshipsRepo> = repositories.clone();
    let messages: Arc<dyn MessagesRepo> = repositories.clone();
    let notifications: Arc<dyn NotificationsRepo> = repositories.clone();
    let resolver: Arc<dyn ParentResolver> = repositories;

    let state = ApiState {
        users: Arc::new(UserService::new(
            users.clone(),
            posts.clone(),
            friendships.clone(),
        )),
        posts: Arc::new(PostService::new(
            users.clone(),
            posts,
            comments,
            likes,
            notifications.clone(),
        )),
        social: Arc::new(SocialService::new(
            users,
            friendships,
            messages,
            notifications,
        )),
        cache: cache.clone(),
    };
    let router = http::build_router(state, CacheTrigger::new(cache.clone(), resolver));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        addr = %settings.server.addr,
        cache_enabled = cache.config.enabled,
        cache_backend = cache.config.backend.as_str(),
        "agora listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_purge(settings: config::Settings, args: config::PurgeArgs) -> Result<(), AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let store = open_store(&cache_config, false).await?;
    if !store.is_ready() {
        return Err(AppError::unexpected(format!(
            "{} store is not reachable",
            cache_config.backend.as_str()
        )));
    }

    let cache = CacheState::new(cache_config, store);
    let removed = cache.registry.purge(&args.scope).await;
    info!(scope = %args.scope, removed, "purge finished");
    println!("removed {removed} cached responses for `{}`", args.scope);
    Ok(())
}

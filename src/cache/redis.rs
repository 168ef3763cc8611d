//! Redis-backed key-value store.
//!
//! Uses a tokio `ConnectionManager` shared by every request. Readiness is a
//! flag maintained from command outcomes and a periodic PING, so the hot path
//! never waits on a dead server before falling back to pass-through.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError, aio::ConnectionManager};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::CacheConfig;
use super::store::{KvStore, StoreError};

pub struct RedisStore {
    client: Client,
    conn: RwLock<Option<ConnectionManager>>,
    ready: AtomicBool,
    connect_timeout: Duration,
    operation_timeout: Duration,
}

impl RedisStore {
    /// Open a client and attempt the first connection.
    ///
    /// A failed first connection is not fatal: the store starts disconnected
    /// and [`RedisStore::spawn_health_check`] keeps retrying.
    pub async fn connect(config: &CacheConfig) -> Result<Self, StoreError> {
        let client =
            Client::open(config.redis_url.as_str()).map_err(|e| StoreError::backend("open", e))?;

        let store = Self {
            client,
            conn: RwLock::new(None),
            ready: AtomicBool::new(false),
            connect_timeout: config.connect_timeout,
            operation_timeout: config.operation_timeout,
        };

        if let Err(err) = store.reconnect().await {
            warn!(
                target = "agora::cache::redis",
                error = %err,
                "redis unavailable at startup, response cache will pass through"
            );
        }

        Ok(store)
    }

    async fn reconnect(&self) -> Result<(), StoreError> {
        let manager = tokio::time::timeout(
            self.connect_timeout,
            ConnectionManager::new(self.client.clone()),
        )
        .await
        .map_err(|_| StoreError::Timeout { op: "connect" })?
        .map_err(|e| StoreError::backend("connect", e))?;

        *self.conn.write().await = Some(manager);
        self.mark(true);
        info!(target = "agora::cache::redis", "redis connection established");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.run("ping", |mut conn| async move {
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, RedisError>(())
        })
        .await
    }

    /// Periodically PING the server, reconnecting while it is unreachable.
    pub fn spawn_health_check(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let has_conn = self.conn.read().await.is_some();
                let outcome = if has_conn {
                    self.ping().await
                } else {
                    self.reconnect().await
                };
                if let Err(err) = outcome {
                    warn!(
                        target = "agora::cache::redis",
                        error = %err,
                        "redis health check failed"
                    );
                }
            }
        })
    }

    fn mark(&self, ready: bool) {
        let previous = self.ready.swap(ready, Ordering::SeqCst);
        if previous && !ready {
            warn!(target = "agora::cache::redis", "redis marked disconnected");
        }
    }

    async fn run<T, F, Fut>(&self, op: &'static str, command: F) -> Result<T, StoreError>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = Result<T, RedisError>>,
    {
        let conn = self
            .conn
            .read()
            .await
            .clone()
            .ok_or(StoreError::Disconnected)?;

        match tokio::time::timeout(self.operation_timeout, command(conn)).await {
            Err(_) => {
                self.mark(false);
                Err(StoreError::Timeout { op })
            }
            Ok(Err(err)) => {
                if err.is_io_error()
                    || err.is_connection_dropped()
                    || err.is_connection_refusal()
                    || err.is_timeout()
                {
                    self.mark(false);
                }
                Err(StoreError::backend(op, err))
            }
            Ok(Ok(value)) => {
                self.mark(true);
                Ok(value)
            }
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.run("get", |mut conn| async move {
            let value: Option<String> = conn.get(key).await?;
            Ok::<_, RedisError>(value)
        })
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let seconds = ttl.as_secs().max(1);
        self.run("set_ex", |mut conn| async move {
            let _: () = conn.set_ex(key, value, seconds).await?;
            Ok::<_, RedisError>(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.run("del", |mut conn| async move {
            let removed: i64 = conn.del(key).await?;
            Ok::<_, RedisError>(removed > 0)
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.run("exists", |mut conn| async move {
            let exists: bool = conn.exists(key).await?;
            Ok::<_, RedisError>(exists)
        })
        .await
    }

    async fn set_add(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.run("sadd", |mut conn| async move {
            let _added: i64 = conn.sadd(set, member).await?;
            Ok::<_, RedisError>(())
        })
        .await
    }

    async fn set_remove(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.run("srem", |mut conn| async move {
            let _removed: i64 = conn.srem(set, member).await?;
            Ok::<_, RedisError>(())
        })
        .await
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        self.run("smembers", |mut conn| async move {
            let members: Vec<String> = conn.smembers(set).await?;
            Ok::<_, RedisError>(members)
        })
        .await
    }

    async fn set_len(&self, set: &str) -> Result<usize, StoreError> {
        self.run("scard", |mut conn| async move {
            let len: usize = conn.scard(set).await?;
            Ok::<_, RedisError>(len)
        })
        .await
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.run("keys", |mut conn| async move {
            let keys: Vec<String> = conn.keys(pattern).await?;
            Ok::<_, RedisError>(keys)
        })
        .await
    }
}

use async_trait::async_trait;
use redis::{Cmd, FromRedisValue};
use std::time::Duration;

use crate::services::cache::client::{CacheError, CacheResult, ReadThroughCache};

/// Valkey/Redis-backed shared key cache.
///
/// Only `GET` and `SET .. EX` are needed; `PING` is used once at startup.
#[derive(Clone)]
pub struct ValkeyClient {
    manager: redis::aio::ConnectionManager,
}

impl std::fmt::Debug for ValkeyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValkeyClient").finish_non_exhaustive()
    }
}

impl ValkeyClient {
    // Create a Valkey client from a URL like `redis://localhost:6379`
    pub async fn new(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        Ok(Self { manager })
    }

    /// Round trip to the server; fails when it is unreachable.
    pub async fn ping(&self) -> CacheResult<()> {
        let pong: String = self.query(&redis::cmd("PING")).await?;
        if pong != "PONG" {
            return Err(CacheError::InvalidValue(format!("unexpected PING reply: {pong}")));
        }
        Ok(())
    }

    async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> CacheResult<T> {
        // ConnectionManager is a cheap handle over one multiplexed connection
        let mut conn = self.manager.clone();
        cmd.query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))
    }
}

#[async_trait]
impl ReadThroughCache for ValkeyClient {
    fn backend_name(&self) -> &'static str {
        "valkey"
    }

    async fn get_string(&self, key: &str) -> CacheResult<Option<String>> {
        self.query(redis::cmd("GET").arg(key)).await
    }

    async fn put_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        // EX takes whole seconds
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl.as_secs().max(1));

        let _: Option<String> = self.query(&cmd).await?;
        Ok(())
    }
}

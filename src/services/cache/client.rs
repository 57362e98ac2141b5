//! Shared cache interface used to spread resolved signing keys across instances.
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-layer errors (transport/command/serialization).
///
/// Kept apart from `AuthError`: the key set cache treats every one of these
/// as a miss and carries on with a direct fetch.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    BackendConnection(String),
    #[error("cache command error: {0}")]
    BackendCommand(String),
    #[error("cache value error: {0}")]
    InvalidValue(String),
}

/// A read-through cache shared by every process that verifies tokens.
///
/// String-based on purpose: entries are serialized public keys keyed by
/// `<namespace>:<lookup key>`.
#[async_trait]
pub trait ReadThroughCache: Send + Sync + 'static {
    // Returns the cache backend name (for logging).
    fn backend_name(&self) -> &'static str;

    // Get UTF-8 string value.
    async fn get_string(&self, key: &str) -> CacheResult<Option<String>>;

    // Store a value, overwriting any previous one, with TTL.
    async fn put_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;
}

//! Bounded, time-limited cache of resolved public keys.
//!
//! Lookup order for a key reference:
//! 1. issuer allow-list (rejects before any I/O)
//! 2. process-local cache
//! 3. shared external cache, if configured (hits are not copied locally)
//! 4. fetch from the issuer, coalesced so concurrent misses share one fetch
//!
//! Failed resolutions are never cached.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use moka::future::Cache;
use moka::policy::EvictionPolicy;

use crate::services::cache::ReadThroughCache;
use crate::services::jwks::fetcher::{HttpKeySetFetcher, KeySetFetcher};
use crate::services::jwks::types::{
    KeyReference, KeyResolver, KeySetError, PublicKey, algorithm_name, normalize_issuer,
};

#[derive(Debug, Clone)]
pub struct KeySetOptions {
    pub max_entries: u64,
    pub ttl: Duration,
    pub timeout: Duration,
    /// Empty means every issuer is accepted.
    pub issuers_allow_list: Vec<String>,
    pub provider_discovery: bool,
    pub jwks_path: Option<String>,
}

impl Default for KeySetOptions {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(60),
            timeout: Duration::from_secs(5),
            issuers_allow_list: Vec::new(),
            provider_discovery: false,
            jwks_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExternalCacheOptions {
    pub namespace: String,
    pub entry_ttl: Duration,
}

impl Default for ExternalCacheOptions {
    fn default() -> Self {
        Self {
            namespace: "jwks".to_string(),
            entry_ttl: Duration::from_secs(60),
        }
    }
}

struct ExternalCache {
    client: Arc<dyn ReadThroughCache>,
    options: ExternalCacheOptions,
}

pub struct KeySetCache {
    local: Cache<String, Arc<PublicKey>>,
    fetcher: Arc<dyn KeySetFetcher>,
    external: Option<ExternalCache>,
    issuers: Vec<String>,
    timeout: Duration,
}

impl std::fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetCache")
            .field("entries", &self.local.entry_count())
            .field("issuers", &self.issuers)
            .field(
                "external",
                &self.external.as_ref().map(|e| e.client.backend_name()),
            )
            .finish()
    }
}

impl KeySetCache {
    pub fn new(options: &KeySetOptions, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        let local = Cache::builder()
            .max_capacity(options.max_entries)
            .time_to_live(options.ttl)
            // every fetched key is admitted; the oldest entry makes room
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            local,
            fetcher,
            external: None,
            issuers: options
                .issuers_allow_list
                .iter()
                .map(|i| normalize_issuer(i).to_string())
                .collect(),
            timeout: options.timeout,
        }
    }

    /// Cache backed by the HTTP fetcher configured from `options`.
    pub fn over_http(options: &KeySetOptions) -> Result<Self, KeySetError> {
        let fetcher = HttpKeySetFetcher::with_timeout(options.timeout)?
            .provider_discovery(options.provider_discovery)
            .jwks_path(options.jwks_path.clone());
        Ok(Self::new(options, Arc::new(fetcher)))
    }

    pub fn with_external_cache(
        mut self,
        client: Arc<dyn ReadThroughCache>,
        options: ExternalCacheOptions,
    ) -> Self {
        self.external = Some(ExternalCache { client, options });
        self
    }

    pub fn allow_issuer(mut self, issuer: &str) -> Self {
        let issuer = normalize_issuer(issuer).to_string();
        if !self.issuers.contains(&issuer) {
            self.issuers.push(issuer);
        }
        self
    }

    pub fn is_issuer_allowed(&self, issuer: &str) -> bool {
        let issuer = normalize_issuer(issuer);
        self.issuers.is_empty() || self.issuers.iter().any(|i| i == issuer)
    }

    pub fn contains(&self, key_ref: &KeyReference) -> bool {
        self.local.contains_key(&key_ref.lookup_key())
    }

    pub async fn resolve(&self, key_ref: &KeyReference) -> Result<Arc<PublicKey>, KeySetError> {
        if !self.is_issuer_allowed(&key_ref.issuer) {
            tracing::warn!(issuer = %key_ref.issuer, "issuer not in allow-list");
            return Err(KeySetError::IssuerNotAllowed(key_ref.issuer.clone()));
        }

        let lookup = key_ref.lookup_key();

        if let Some(key) = self.local.get(&lookup).await {
            tracing::debug!(%lookup, "key cache hit");
            return Ok(key);
        }

        if let Some(key) = self.read_external(&lookup).await {
            tracing::debug!(%lookup, "shared key cache hit");
            return Ok(key);
        }

        self.local
            .try_get_with(lookup.clone(), self.fetch_key(key_ref, &lookup))
            .await
            .map_err(|e| (*e).clone())
    }

    async fn fetch_key(
        &self,
        key_ref: &KeyReference,
        lookup: &str,
    ) -> Result<Arc<PublicKey>, KeySetError> {
        let set = tokio::time::timeout(self.timeout, self.fetcher.fetch(&key_ref.issuer))
            .await
            .map_err(|_| KeySetError::Timeout(self.timeout))??;

        let jwk = select_key(&set, key_ref)?;
        let key = Arc::new(PublicKey::from_jwk(jwk.clone())?);
        tracing::debug!(%lookup, "resolved signing key");

        self.write_external(lookup, &key).await;
        Ok(key)
    }

    async fn read_external(&self, lookup: &str) -> Option<Arc<PublicKey>> {
        let external = self.external.as_ref()?;
        let key = format!("{}:{}", external.options.namespace, lookup);

        match external.client.get_string(&key).await {
            Ok(Some(raw)) => match PublicKey::from_json(&raw) {
                Ok(public_key) => Some(Arc::new(public_key)),
                Err(err) => {
                    tracing::warn!(error = ?err, %key, "discarding unreadable shared key entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(
                    error = ?err,
                    backend = external.client.backend_name(),
                    "shared key cache read failed"
                );
                None
            }
        }
    }

    async fn write_external(&self, lookup: &str, public_key: &PublicKey) {
        let Some(external) = self.external.as_ref() else {
            return;
        };
        let key = format!("{}:{}", external.options.namespace, lookup);

        let value = match public_key.to_json() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = ?err, "could not serialize key for shared cache");
                return;
            }
        };

        if let Err(err) = external
            .client
            .put_with_ttl(&key, &value, external.options.entry_ttl)
            .await
        {
            tracing::warn!(
                error = ?err,
                backend = external.client.backend_name(),
                "shared key cache write failed"
            );
        }
    }
}

#[async_trait]
impl KeyResolver for KeySetCache {
    async fn resolve_key(&self, key_ref: &KeyReference) -> Result<Arc<PublicKey>, KeySetError> {
        self.resolve(key_ref).await
    }
}

/// Match on `kid`; `alg` must agree only when both sides carry one.
/// Without a `kid` the first compatible key wins.
fn select_key<'a>(set: &'a JwkSet, key_ref: &KeyReference) -> Result<&'a Jwk, KeySetError> {
    set.keys
        .iter()
        .find(|jwk| {
            let kid_matches = match key_ref.key_id.as_deref() {
                Some(kid) => jwk.common.key_id.as_deref() == Some(kid),
                None => true,
            };
            let declared = jwk.common.key_algorithm.as_ref().and_then(algorithm_name);
            let alg_matches = match (key_ref.algorithm.as_deref(), declared.as_deref()) {
                (Some(wanted), Some(declared)) => wanted == declared,
                _ => true,
            };
            kid_matches && alg_matches
        })
        .ok_or_else(|| KeySetError::KeyNotFound {
            kid: key_ref.key_id.clone(),
            alg: key_ref.algorithm.clone(),
        })
}

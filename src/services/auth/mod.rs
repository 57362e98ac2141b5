//! Request authentication: credentials → verified claims.
pub mod access_jwt;
pub mod credentials;
pub mod factory;

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::context::ClaimSet;
use crate::error::AuthError;
use crate::services::cache::ReadThroughCache;
use crate::services::jwks::{
    ExternalCacheOptions, KeySetCache, KeySetError, KeySetFetcher, KeySetOptions,
};

pub use access_jwt::TokenVerifier;
pub use credentials::{CookiePrefix, CookieSource, CredentialResolver};

#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// Issuer URL; keys come from its key set and it is always allow-listed.
    pub domain: String,
    pub key_set: KeySetOptions,
    pub cookie: Option<CookieSource>,
    /// Claim copied into the `sub` request variable. `None` disables it.
    pub subject_claim: Option<String>,
}

impl AuthOptions {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            key_set: KeySetOptions::default(),
            cookie: None,
            subject_claim: Some("sub".to_string()),
        }
    }

    pub fn key_set(mut self, key_set: KeySetOptions) -> Self {
        self.key_set = key_set;
        self
    }

    pub fn cookie(mut self, cookie: CookieSource) -> Self {
        self.cookie = Some(cookie);
        self
    }

    pub fn subject_claim(mut self, claim: Option<String>) -> Self {
        self.subject_claim = claim;
        self
    }
}

#[derive(Debug)]
pub struct Authenticator {
    resolver: CredentialResolver,
    verifier: TokenVerifier,
    keys: KeySetCache,
    subject_claim: Option<String>,
}

impl Authenticator {
    /// Keys fetched over HTTP from the issuer.
    pub fn new(options: AuthOptions) -> Result<Self, KeySetError> {
        let keys = KeySetCache::over_http(&options.key_set)?;
        Ok(Self::assemble(options, keys))
    }

    pub fn with_fetcher(options: AuthOptions, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        let keys = KeySetCache::new(&options.key_set, fetcher);
        Self::assemble(options, keys)
    }

    fn assemble(options: AuthOptions, keys: KeySetCache) -> Self {
        Self {
            resolver: CredentialResolver::new(options.cookie),
            verifier: TokenVerifier::new(options.domain.clone()),
            keys: keys.allow_issuer(&options.domain),
            subject_claim: options.subject_claim,
        }
    }

    pub fn with_external_cache(
        mut self,
        client: Arc<dyn ReadThroughCache>,
        options: ExternalCacheOptions,
    ) -> Self {
        self.keys = self.keys.with_external_cache(client, options);
        self
    }

    pub fn subject_claim(&self) -> Option<&str> {
        self.subject_claim.as_deref()
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<ClaimSet, AuthError> {
        let token = self.resolver.resolve(headers)?;
        self.verifier.verify(&token, &self.keys).await
    }
}

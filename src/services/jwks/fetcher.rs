//! Retrieval of an issuer's published key set over HTTP.
//!
//! Location, in order of precedence:
//! - `<issuer><jwks_path>` when a path is configured
//! - the `jwks_uri` of `<issuer>/.well-known/openid-configuration` when discovery is on
//! - `<issuer>/.well-known/jwks.json`
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::services::jwks::types::{KeySetError, normalize_issuer};

#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    async fn fetch(&self, issuer: &str) -> Result<JwkSet, KeySetError>;
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    http: reqwest::Client,
    provider_discovery: bool,
    jwks_path: Option<String>,
}

impl HttpKeySetFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            provider_discovery: false,
            jwks_path: None,
        }
    }

    /// Client with a per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, KeySetError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeySetError::Request(e.to_string()))?;
        Ok(Self::new(http))
    }

    pub fn provider_discovery(mut self, enabled: bool) -> Self {
        self.provider_discovery = enabled;
        self
    }

    pub fn jwks_path(mut self, path: Option<String>) -> Self {
        self.jwks_path = path.filter(|p| !p.is_empty());
        self
    }

    pub async fn jwks_uri(&self, issuer: &str) -> Result<String, KeySetError> {
        let base = normalize_issuer(issuer);

        if let Some(path) = &self.jwks_path {
            return Ok(format!("{}/{}", base, path.trim_start_matches('/')));
        }

        if self.provider_discovery {
            let url = format!("{base}/.well-known/openid-configuration");
            let doc: DiscoveryDocument = self.get_json(&url).await?;
            return Ok(doc.jwks_uri);
        }

        Ok(format!("{base}/.well-known/jwks.json"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, KeySetError> {
        let res = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                KeySetError::Request(format!("timed out requesting {url}"))
            } else {
                KeySetError::Request(e.to_string())
            }
        })?;

        let status = res.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "key set endpoint rejected request");
            return Err(KeySetError::Status(status.as_u16()));
        }

        res.json::<T>()
            .await
            .map_err(|e| KeySetError::InvalidDocument(e.to_string()))
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch(&self, issuer: &str) -> Result<JwkSet, KeySetError> {
        let uri = self.jwks_uri(issuer).await?;
        tracing::info!(%issuer, %uri, "fetching key set");
        self.get_json(&uri).await
    }
}

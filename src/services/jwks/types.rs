use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk};
use serde::Serialize;
use thiserror::Error;

/// Failures while locating a public key. Clone because single-flight
/// resolution hands the same error to every waiting caller.
#[derive(Debug, Clone, Error)]
pub enum KeySetError {
    #[error("issuer '{0}' is not allowed")]
    IssuerNotAllowed(String),
    #[error("key set request failed: {0}")]
    Request(String),
    #[error("key set endpoint returned status {0}")]
    Status(u16),
    #[error("invalid key set document: {0}")]
    InvalidDocument(String),
    #[error("key set fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("no matching key (kid: {kid:?}, alg: {alg:?})")]
    KeyNotFound {
        kid: Option<String>,
        alg: Option<String>,
    },
    #[error("unusable key: {0}")]
    UnusableKey(String),
}

/// Identifies one public key: issuer plus the token header's `kid` / `alg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyReference {
    pub issuer: String,
    pub key_id: Option<String>,
    pub algorithm: Option<String>,
}

impl KeyReference {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            key_id: None,
            algorithm: None,
        }
    }

    pub fn with_key_id(mut self, key_id: Option<String>) -> Self {
        self.key_id = key_id.filter(|k| !k.is_empty());
        self
    }

    pub fn with_algorithm(mut self, algorithm: Option<String>) -> Self {
        self.algorithm = algorithm.filter(|a| !a.is_empty());
        self
    }

    /// Canonical cache key. Field order is fixed and absent fields are skipped,
    /// so equal references always map to the same entry.
    pub fn lookup_key(&self) -> String {
        let mut parts = vec![format!("iss={}", normalize_issuer(&self.issuer))];
        if let Some(alg) = &self.algorithm {
            parts.push(format!("alg={alg}"));
        }
        if let Some(kid) = &self.key_id {
            parts.push(format!("kid={kid}"));
        }
        parts.join("|")
    }
}

pub(crate) fn normalize_issuer(issuer: &str) -> &str {
    issuer.trim_end_matches('/')
}

/// JOSE name of an algorithm enum (`RS256`, `ES384`, ...).
///
/// Both `Algorithm` and `KeyAlgorithm` serialize to their registered names.
pub(crate) fn algorithm_name<T: Serialize>(alg: &T) -> Option<String> {
    match serde_json::to_value(alg) {
        Ok(serde_json::Value::String(name)) => Some(name),
        _ => None,
    }
}

/// A verified-usable public key from an issuer's key set.
#[derive(Clone)]
pub struct PublicKey {
    jwk: Jwk,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("PublicKey")
            .field("kid", &self.key_id())
            .field("alg", &self.algorithm())
            .finish()
    }
}

impl PublicKey {
    pub fn from_jwk(jwk: Jwk) -> Result<Self, KeySetError> {
        if matches!(jwk.algorithm, AlgorithmParameters::OctetKey(_)) {
            return Err(KeySetError::UnusableKey(
                "symmetric key in a public key set".into(),
            ));
        }

        let decoding_key =
            DecodingKey::from_jwk(&jwk).map_err(|e| KeySetError::UnusableKey(e.to_string()))?;

        Ok(Self { jwk, decoding_key })
    }

    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    pub fn key_id(&self) -> Option<&str> {
        self.jwk.common.key_id.as_deref()
    }

    /// Algorithm the key declares, if any.
    pub fn algorithm(&self) -> Option<String> {
        self.jwk.common.key_algorithm.as_ref().and_then(algorithm_name)
    }

    pub fn to_json(&self) -> Result<String, KeySetError> {
        serde_json::to_string(&self.jwk).map_err(|e| KeySetError::InvalidDocument(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, KeySetError> {
        let jwk: Jwk =
            serde_json::from_str(raw).map_err(|e| KeySetError::InvalidDocument(e.to_string()))?;
        Self::from_jwk(jwk)
    }
}

/// Anything that can turn a key reference into a public key.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve_key(&self, key_ref: &KeyReference) -> Result<Arc<PublicKey>, KeySetError>;
}

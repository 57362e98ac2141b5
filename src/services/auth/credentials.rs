//! Locating the bearer token in a request.
//!
//! The `Authorization` header wins; a configured cookie is the fallback.
//! The header must be exactly two whitespace-separated parts. The scheme
//! itself is not checked.
use axum::http::{HeaderMap, header};
use base64::{Engine, engine::general_purpose::STANDARD};
use ring::hmac;

use crate::error::AuthError;

/// Length of a base64 (padded) HMAC-SHA256 tag.
const SIGNED_TAG_LEN: usize = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookiePrefix {
    Secure,
    Host,
}

impl CookiePrefix {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "secure" => Some(Self::Secure),
            "host" => Some(Self::Host),
            _ => None,
        }
    }

    pub fn apply(&self, name: &str) -> String {
        match self {
            Self::Secure => format!("__Secure-{name}"),
            Self::Host => format!("__Host-{name}"),
        }
    }
}

#[derive(Clone)]
pub struct CookieSource {
    name: String,
    secret: Option<Vec<u8>>,
    prefix: Option<CookiePrefix>,
}

impl std::fmt::Debug for CookieSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSource")
            .field("name", &self.name)
            .field("signed", &self.secret.is_some())
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl CookieSource {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: None,
            prefix: None,
        }
    }

    pub fn signed(name: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            secret: Some(secret.into()),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: Option<CookiePrefix>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Name of the cookie as it appears on the wire.
    pub fn cookie_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => prefix.apply(&self.name),
            None => self.name.clone(),
        }
    }

    fn read(&self, headers: &HeaderMap) -> Result<Option<String>, AuthError> {
        let Some(value) = find_cookie(headers, &self.cookie_name()) else {
            return Ok(None);
        };

        match &self.secret {
            Some(secret) => verify_signed(&value, secret).map(Some),
            None => Ok(Some(value)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    cookie: Option<CookieSource>,
}

impl CredentialResolver {
    pub fn new(cookie: Option<CookieSource>) -> Self {
        Self { cookie }
    }

    pub fn resolve(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        if let Some(token) = from_authorization(headers)? {
            return Ok(token);
        }

        let from_cookie = match &self.cookie {
            Some(source) => source.read(headers)?,
            None => None,
        };

        from_cookie
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingCredentials)
    }
}

fn from_authorization(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidCredentialStructure)?;

    // present but empty is treated like absent
    if value.trim().is_empty() {
        return Ok(None);
    }

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_scheme), Some(token), None) => Ok(Some(token.to_string())),
        _ => Err(AuthError::InvalidCredentialStructure),
    }
}

fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key.trim() != name {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some(
                urlencoding::decode(value)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| value.to_string()),
            )
        })
}

/// `<value>.<base64 HMAC-SHA256(secret, value)>`; returns `<value>`.
fn verify_signed(cookie: &str, secret: &[u8]) -> Result<String, AuthError> {
    let (value, tag) = cookie
        .rsplit_once('.')
        .ok_or(AuthError::SignatureInvalid)?;

    if value.is_empty() || tag.len() != SIGNED_TAG_LEN || !tag.ends_with('=') {
        return Err(AuthError::SignatureInvalid);
    }

    let tag = STANDARD
        .decode(tag)
        .map_err(|_| AuthError::SignatureInvalid)?;

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hmac::verify(&key, value.as_bytes(), &tag).map_err(|_| AuthError::SignatureInvalid)?;

    Ok(value.to_string())
}

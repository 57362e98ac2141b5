/*
 * Responsibility
 * - 環境変数の読み込み (issuer, key set cache, cookie, Permify 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - lookup 関数経由で読むので env を汚さずにテストできる
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::auth::{AuthOptions, CookiePrefix, CookieSource};
use crate::services::jwks::{ExternalCacheOptions, KeySetOptions};
use crate::services::policy::{
    CheckMetadata, MethodPermissionMap, PermissionOptions, SubjectOptions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,

    pub auth_domain: String,
    pub key_set: KeySetOptions,
    pub cookie: Option<CookieSource>,
    pub subject_claim: Option<String>,

    pub valkey_url: Option<String>,
    pub shared_key_cache: ExternalCacheOptions,

    pub permify_endpoint: String,
    pub permify_api_key: Option<String>,
    pub permify_timeout: Duration,
    pub permissions: PermissionOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // blank values count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port: u16 = parse_or(get("PORT"), "PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV"));
        let request_timeout =
            Duration::from_secs(parse_or(get("REQUEST_TIMEOUT_SECONDS"), "REQUEST_TIMEOUT_SECONDS", 30)?);
        let body_limit_bytes = parse_or(get("BODY_LIMIT_BYTES"), "BODY_LIMIT_BYTES", 1024 * 1024)?;

        let auth_domain = get("AUTH_DOMAIN").ok_or(ConfigError::Missing("AUTH_DOMAIN"))?;
        url::Url::parse(&auth_domain).map_err(|_| ConfigError::Invalid("AUTH_DOMAIN"))?;

        let defaults = KeySetOptions::default();
        let key_set = KeySetOptions {
            max_entries: parse_or(get("JWKS_MAX_ENTRIES"), "JWKS_MAX_ENTRIES", defaults.max_entries)?,
            ttl: Duration::from_secs(parse_or(
                get("JWKS_TTL_SECONDS"),
                "JWKS_TTL_SECONDS",
                defaults.ttl.as_secs(),
            )?),
            timeout: Duration::from_millis(parse_or(
                get("JWKS_TIMEOUT_MS"),
                "JWKS_TIMEOUT_MS",
                defaults.timeout.as_millis() as u64,
            )?),
            issuers_allow_list: get("JWKS_ISSUERS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            provider_discovery: parse_bool(
                get("JWKS_PROVIDER_DISCOVERY"),
                "JWKS_PROVIDER_DISCOVERY",
                false,
            )?,
            jwks_path: get("JWKS_PATH"),
        };

        let cookie = match get("AUTH_COOKIE_NAME") {
            None => None,
            Some(name) => {
                let prefix = match get("AUTH_COOKIE_PREFIX") {
                    None => None,
                    Some(raw) => Some(
                        CookiePrefix::from_name(&raw)
                            .ok_or(ConfigError::Invalid("AUTH_COOKIE_PREFIX"))?,
                    ),
                };
                let source = match get("AUTH_COOKIE_SECRET") {
                    Some(secret) => CookieSource::signed(name, secret.into_bytes()),
                    None => CookieSource::plain(name),
                };
                Some(source.with_prefix(prefix))
            }
        };

        // SUBJECT_CLAIM=- turns publishing off
        let subject_claim = match get("SUBJECT_CLAIM").as_deref() {
            Some("-") => None,
            Some(claim) => Some(claim.to_string()),
            None => Some("sub".to_string()),
        };

        let cache_defaults = ExternalCacheOptions::default();
        let shared_key_cache = ExternalCacheOptions {
            namespace: get("JWKS_CACHE_NAMESPACE").unwrap_or(cache_defaults.namespace),
            entry_ttl: Duration::from_secs(parse_or(
                get("JWKS_CACHE_TTL_SECONDS"),
                "JWKS_CACHE_TTL_SECONDS",
                cache_defaults.entry_ttl.as_secs(),
            )?),
        };

        let permify_endpoint =
            get("PERMIFY_ENDPOINT").ok_or(ConfigError::Missing("PERMIFY_ENDPOINT"))?;
        url::Url::parse(&permify_endpoint).map_err(|_| ConfigError::Invalid("PERMIFY_ENDPOINT"))?;

        let permify_timeout = Duration::from_millis(parse_or(
            get("PERMIFY_TIMEOUT_MS"),
            "PERMIFY_TIMEOUT_MS",
            5000,
        )?);

        let subject_defaults = SubjectOptions::default();
        let permissions = PermissionOptions {
            method_permissions: MethodPermissionMap::default(),
            default_tenant_id: get("DEFAULT_TENANT_ID"),
            tenant_variable: get("TENANT_CONTEXT_VAR"),
            subject: SubjectOptions {
                subject_type: get("SUBJECT_TYPE").unwrap_or(subject_defaults.subject_type),
                id_variable: get("SUBJECT_CONTEXT_VAR").unwrap_or(subject_defaults.id_variable),
            },
            throw_on_permission_denied: parse_bool(
                get("THROW_ON_PERMISSION_DENIED"),
                "THROW_ON_PERMISSION_DENIED",
                true,
            )?,
            metadata: CheckMetadata {
                depth: parse_or(get("PERMIFY_DEPTH"), "PERMIFY_DEPTH", 3)?,
                schema_version: get("PERMIFY_SCHEMA_VERSION"),
                snap_token: get("PERMIFY_SNAP_TOKEN"),
            },
        };

        Ok(Self {
            addr,
            app_env,
            request_timeout,
            body_limit_bytes,
            auth_domain,
            key_set,
            cookie,
            subject_claim,
            valkey_url: get("VALKEY_URL"),
            shared_key_cache,
            permify_endpoint,
            permify_api_key: get("PERMIFY_API_KEY"),
            permify_timeout,
            permissions,
        })
    }

    pub fn auth_options(&self) -> AuthOptions {
        let options = AuthOptions::new(self.auth_domain.clone())
            .key_set(self.key_set.clone())
            .subject_claim(self.subject_claim.clone());
        match &self.cookie {
            Some(cookie) => options.cookie(cookie.clone()),
            None => options,
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v.parse::<T>().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn parse_bool(raw: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match raw.map(|v| v.to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid(key)),
    }
}

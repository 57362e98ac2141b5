//! Factory: build the `Authenticator` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::Authenticator;
use crate::services::cache::{CacheError, ValkeyClient};
use crate::services::jwks::KeySetError;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    KeySet(#[from] KeySetError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub async fn build_authenticator(config: &Config) -> Result<Arc<Authenticator>, BuildError> {
    let mut auth = Authenticator::new(config.auth_options())?;

    // Shared key cache is optional; without it every instance fetches on its own.
    if let Some(url) = &config.valkey_url {
        let valkey = ValkeyClient::new(url).await?;
        valkey.ping().await?;
        tracing::info!(
            namespace = %config.shared_key_cache.namespace,
            "using valkey as shared key cache"
        );
        auth = auth.with_external_cache(Arc::new(valkey), config.shared_key_cache.clone());
    }

    Ok(Arc::new(auth))
}

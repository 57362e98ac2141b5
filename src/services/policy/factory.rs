//! Factory: build the `PermissionChecker` (Permify-backed) from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::policy::{PermifyClient, PermissionChecker, PolicyError};

pub fn build_permission_checker(config: &Config) -> Result<Arc<PermissionChecker>, PolicyError> {
    let client = PermifyClient::new(config.permify_endpoint.clone(), config.permify_timeout)?
        .with_api_key(config.permify_api_key.clone());

    Ok(Arc::new(PermissionChecker::new(
        Arc::new(client),
        config.permissions.clone(),
    )))
}

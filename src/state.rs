/*
 * Responsibility
 * - Router 組み立て時に渡す共有サービス (AppState)
 *   - authenticator: token 検証 + key set cache
 *   - permissions: Permify による permission check
 * - Clone 前提で持つ (内部は Arc)
 */
use std::sync::Arc;

use crate::services::auth::Authenticator;
use crate::services::policy::PermissionChecker;

#[derive(Clone, Debug)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub permissions: Arc<PermissionChecker>,
}

impl AppState {
    pub fn new(authenticator: Arc<Authenticator>, permissions: Arc<PermissionChecker>) -> Self {
        Self {
            authenticator,
            permissions,
        }
    }
}

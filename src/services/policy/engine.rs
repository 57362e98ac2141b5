use async_trait::async_trait;
use thiserror::Error;

use crate::services::policy::types::{PermissionCheckRequest, PermissionCheckResponse};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy engine request failed: {0}")]
    Transport(String),
    #[error("policy engine timed out")]
    Timeout,
    #[error("policy engine returned status {0}")]
    Status(u16),
    #[error("invalid policy engine response: {0}")]
    InvalidResponse(String),
}

/// Answers permission checks. Implemented by the Permify client; tests plug in fakes.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn check(
        &self,
        request: &PermissionCheckRequest,
    ) -> Result<PermissionCheckResponse, PolicyError>;
}

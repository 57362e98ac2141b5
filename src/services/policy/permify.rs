//! Permify permission checks over its REST API.
//!
//! `POST {endpoint}/v1/tenants/{tenant}/permissions/check`
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::services::policy::engine::{PolicyEngine, PolicyError};
use crate::services::policy::types::{
    EntityRef, PermissionCheckRequest, PermissionCheckResponse, SubjectRef,
};

/// Tenant used when a request carries none (Permify's built-in tenant).
pub const FALLBACK_TENANT: &str = "t1";

const CHECK_RESULT_ALLOWED: &str = "CHECK_RESULT_ALLOWED";

#[derive(Serialize)]
struct CheckBody<'a> {
    metadata: CheckBodyMetadata<'a>,
    entity: &'a EntityRef,
    permission: &'a str,
    subject: &'a SubjectRef,
}

#[derive(Serialize)]
struct CheckBodyMetadata<'a> {
    snap_token: &'a str,
    schema_version: &'a str,
    depth: u32,
}

#[derive(Deserialize)]
struct CheckReply {
    #[serde(default)]
    can: String,
}

#[derive(Clone)]
pub struct PermifyClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for PermifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermifyClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl PermifyClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PolicyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PolicyError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    fn check_url(&self, tenant: &str) -> String {
        format!(
            "{}/v1/tenants/{}/permissions/check",
            self.endpoint,
            urlencoding::encode(tenant)
        )
    }
}

#[async_trait]
impl PolicyEngine for PermifyClient {
    async fn check(
        &self,
        request: &PermissionCheckRequest,
    ) -> Result<PermissionCheckResponse, PolicyError> {
        let tenant = request.tenant_id.as_deref().unwrap_or(FALLBACK_TENANT);
        let body = CheckBody {
            metadata: CheckBodyMetadata {
                snap_token: request.metadata.snap_token.as_deref().unwrap_or_default(),
                schema_version: request.metadata.schema_version.as_deref().unwrap_or_default(),
                depth: request.metadata.depth,
            },
            entity: &request.entity,
            permission: &request.permission,
            subject: &request.subject,
        };

        let mut req = self.http.post(self.check_url(tenant)).json(&body);
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }

        let res = req.send().await.map_err(|e| {
            if e.is_timeout() {
                PolicyError::Timeout
            } else {
                PolicyError::Transport(e.to_string())
            }
        })?;

        let status = res.status();
        if !status.is_success() {
            return Err(PolicyError::Status(status.as_u16()));
        }

        let reply: CheckReply = res
            .json()
            .await
            .map_err(|e| PolicyError::InvalidResponse(e.to_string()))?;

        Ok(PermissionCheckResponse {
            can: reply.can == CHECK_RESULT_ALLOWED,
        })
    }
}

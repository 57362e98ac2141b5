use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRef {
    #[serde(rename = "type")]
    pub subject_type: String,
    pub id: String,
}

impl SubjectRef {
    pub fn new(subject_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckMetadata {
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_token: Option<String>,
}

impl Default for CheckMetadata {
    fn default() -> Self {
        Self {
            depth: 3,
            schema_version: None,
            snap_token: None,
        }
    }
}

/// "May `subject` perform `permission` on `entity`?"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheckRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub entity: EntityRef,
    pub permission: String,
    pub subject: SubjectRef,
    pub metadata: CheckMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheckResponse {
    pub can: bool,
}

/// Stored in the request context once the policy engine has answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub result: PermissionCheckResponse,
    pub request: PermissionCheckRequest,
}

impl PermissionDecision {
    pub fn is_allowed(&self) -> bool {
        self.result.can
    }
}

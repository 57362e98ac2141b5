use serde::Serialize;

use crate::services::policy::PermissionDecision;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamResponse {
    pub team_id: String,
    pub permission: String,
    pub decision: PermissionDecision,
}

/*
 * Responsibility
 * - GET | PUT | DELETE /teams/{teamId}
 * - 認可済みの request だけが来る (permission middleware が前段)
 * - 保存された decision をそのまま返す (policy 側の確認用)
 */
use axum::{Json, extract::Path};

use crate::api::v1::dto::teams::TeamResponse;
use crate::context::Decision;

pub async fn team(Path(team_id): Path<String>, Decision(decision): Decision) -> Json<TeamResponse> {
    Json(TeamResponse {
        team_id,
        permission: decision.request.permission.clone(),
        decision,
    })
}

/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /me は認証のみ、/teams/{teamId} は認証 + team entity の permission check
 * - health は認証の外 (app 側で mount)
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{me::me, teams::team};
use crate::middleware::auth::{access, permission};
use crate::services::policy::EntityTarget;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router {
    let teams = Router::new().route("/teams/{teamId}", get(team).put(team).delete(team));
    let teams = permission::apply(
        teams,
        state.permissions.rule(EntityTarget::new("team", "teamId")),
    );

    let v1 = Router::new().route("/me", get(me)).merge(teams);

    access::apply(v1, state.authenticator.clone())
}

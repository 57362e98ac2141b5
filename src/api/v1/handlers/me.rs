use axum::Json;

use crate::context::{ClaimSet, Claims};

/// GET /me: the verified claims of the caller.
pub async fn me(Claims(claims): Claims) -> Json<ClaimSet> {
    Json(claims)
}

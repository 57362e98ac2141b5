//! Route-level permission check against the policy engine.
//!
//! Must be applied with `route_layer` so the matched route's parameters are
//! available. Runs after authentication: the subject id is read from the
//! request variables the access middleware published.
//!
//! The decision is stored in the request extensions before allow/deny is
//! decided; on a 403 it is also attached to the response.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{FromRequestParts, RawPathParams, State},
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::context::RequestVars;
use crate::error::AuthError;
use crate::services::policy::PermissionRule;

pub fn apply<S>(router: Router<S>, rule: PermissionRule) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(
        Arc::new(rule),
        permission_middleware,
    ))
}

async fn permission_middleware(
    State(rule): State<Arc<PermissionRule>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = req.into_parts();

    let params: HashMap<String, String> =
        match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(raw) => raw
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            Err(_) => HashMap::new(),
        };

    let decision = rule
        .evaluate(&parts.method, &params, parts.extensions.get::<RequestVars>())
        .await?;

    let enforced = rule.checker().enforce(&decision);
    parts.extensions.insert(decision.clone());

    if let Err(err) = enforced {
        tracing::info!(
            entity = ?decision.request.entity,
            permission = %decision.request.permission,
            subject = %decision.request.subject.id,
            "permission denied"
        );
        let mut res = err.into_response();
        res.extensions_mut().insert(decision);
        return Ok(res);
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}

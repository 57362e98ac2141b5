//! Bearer token 検証 → ClaimSet を extensions に入れる
//!
//! - token は Authorization header、なければ設定された cookie から取る
//! - 失敗時は 401 + `WWW-Authenticate: Bearer realm=..,error=..,error_description=..`
//!   (body は常に "Unauthorized"、原因は AuthFailure extension とログにだけ残す)
//! - 成功時は subject claim を request variable `sub` にも公開する

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::{HeaderMap, Request, Uri, header},
    middleware::{self, Next},
    response::Response,
};

use crate::context::{self, SUBJECT_VAR};
use crate::services::auth::Authenticator;

/// Router 配下のすべての route に認証を掛ける。
///
/// 例：
/// ```ignore
/// let v1 = api::v1::routes::router();
/// let v1 = middleware::auth::access::apply(v1, state.authenticator.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply<S>(router: Router<S>, authenticator: Arc<Authenticator>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(authenticator, access_middleware))
}

async fn access_middleware(
    State(auth): State<Arc<Authenticator>>,
    OriginalUri(original_uri): OriginalUri,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = match auth.authenticate(req.headers()).await {
        Ok(claims) => claims,
        Err(err) => {
            let realm = request_url(req.headers(), &original_uri);
            tracing::warn!(
                error = ?err,
                kind = err.kind(),
                %realm,
                "request authentication failed"
            );
            return err.into_challenge_response(&realm);
        }
    };

    // numeric subjects are published in their decimal form
    if let Some(claim) = auth.subject_claim()
        && let Some(subject) = claims.get_scalar_string(claim)
    {
        context::set_var(req.extensions_mut(), SUBJECT_VAR, subject);
    }

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(claims);

    next.run(req).await
}

/// Absolute URL of the request, used as the challenge realm.
///
/// Behind a proxy the forwarded headers win over `Host`.
pub(crate) fn request_url(headers: &HeaderMap, uri: &Uri) -> String {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return uri.to_string();
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let raw = format!("{}://{}{}", scheme, host, path);

    // Normalise when it parses; otherwise keep what we were given.
    url::Url::parse(&raw)
        .map(|url| url.to_string())
        .unwrap_or(raw)
}

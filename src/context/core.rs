//! Extractors and helpers over the request context.
//!
//! Middleware writes, handlers read:
//! ```ignore
//! async fn me(Claims(claims): Claims) -> Json<ClaimSet> { Json(claims) }
//! ```
use axum::{
    extract::FromRequestParts,
    http::{Extensions, StatusCode, request::Parts},
};
use serde_json::Value;

use crate::context::types::{ClaimSet, RequestVars};
use crate::services::policy::PermissionDecision;

/// Set a request variable, creating the variable bag on first use.
pub fn set_var(extensions: &mut Extensions, name: impl Into<String>, value: impl Into<Value>) {
    match extensions.get_mut::<RequestVars>() {
        Some(vars) => vars.set(name, value),
        None => {
            let mut vars = RequestVars::default();
            vars.set(name, value);
            extensions.insert(vars);
        }
    }
}

pub fn var_str<'a>(extensions: &'a Extensions, name: &str) -> Option<&'a str> {
    extensions.get::<RequestVars>()?.get_str(name)
}

/// Verified claims. Rejects with 401 when the authentication middleware did not run.
#[derive(Debug, Clone)]
pub struct Claims(pub ClaimSet);

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ClaimSet>()
            .cloned()
            .map(Claims)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Outcome of the permission check guarding this route.
#[derive(Debug, Clone)]
pub struct Decision(pub PermissionDecision);

impl<S> FromRequestParts<S> for Decision
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // No decision means the route is not wired behind the permission middleware.
        parts
            .extensions
            .get::<PermissionDecision>()
            .cloned()
            .map(Decision)
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// All request variables (empty when none were set).
#[derive(Debug, Clone, Default)]
pub struct Vars(pub RequestVars);

impl<S> FromRequestParts<S> for Vars
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Vars(
            parts
                .extensions
                .get::<RequestVars>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

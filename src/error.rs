/*
 * Responsibility
 * - 認証/認可で共通に使う AuthError の定義
 * - IntoResponse 実装 (status + plain text body, 401 には WWW-Authenticate challenge)
 * - 401 は原因を隠す (challenge は invalid_request / invalid_token の 2 種のみ)
 */
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::jwks::KeySetError;
use crate::services::policy::PolicyError;

/// Body of every 401 response, whatever the underlying cause.
pub const UNAUTHORIZED_BODY: &str = "Unauthorized";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credentials in request")]
    MissingCredentials,
    #[error("invalid credentials structure")]
    InvalidCredentialStructure,
    #[error("invalid token: {0}")]
    TokenInvalid(String),
    #[error("token expired")]
    TokenExpired,
    #[error("token not yet valid")]
    TokenNotYetValid,
    #[error("signature invalid")]
    SignatureInvalid,
    #[error("key resolution failed: {0}")]
    KeyResolution(#[from] KeySetError),

    #[error("no permission mapping found for method '{method}'")]
    PermissionMappingMissing { method: String },
    #[error("entity id '{param}' not found in the request parameters")]
    EntityIdMissing { param: String },
    #[error("subject id '{variable}' not found in request context")]
    SubjectIdMissing { variable: String },
    #[error("policy engine error: {0}")]
    PolicyEngine(#[from] PolicyError),
    #[error("permission denied for {entity_type} {entity_id}")]
    PermissionDenied {
        entity_type: String,
        entity_id: String,
    },
}

/// Error code carried by the `WWW-Authenticate: Bearer` challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeError {
    InvalidRequest,
    InvalidToken,
}

impl ChallengeError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidToken => "invalid_token",
        }
    }
}

impl AuthError {
    /// Stable name of the failure kind (logs, `AuthFailure`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "MissingCredentials",
            Self::InvalidCredentialStructure => "InvalidCredentialStructure",
            Self::TokenInvalid(_) => "TokenInvalid",
            Self::TokenExpired => "TokenExpired",
            Self::TokenNotYetValid => "TokenNotYetValid",
            Self::SignatureInvalid => "SignatureInvalid",
            Self::KeyResolution(_) => "KeyResolutionError",
            Self::PermissionMappingMissing { .. } => "PermissionMappingMissing",
            Self::EntityIdMissing { .. } => "EntityIdMissing",
            Self::SubjectIdMissing { .. } => "SubjectIdMissing",
            Self::PolicyEngine(_) => "PolicyEngineError",
            Self::PermissionDenied { .. } => "PermissionDenied",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredentials
            | Self::InvalidCredentialStructure
            | Self::TokenInvalid(_)
            | Self::TokenExpired
            | Self::TokenNotYetValid
            | Self::SignatureInvalid
            | Self::KeyResolution(_) => StatusCode::UNAUTHORIZED,
            Self::EntityIdMissing { .. } | Self::SubjectIdMissing { .. } => StatusCode::BAD_REQUEST,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::PermissionMappingMissing { .. } | Self::PolicyEngine(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Challenge code for authentication failures, `None` for authorization failures.
    pub fn challenge(&self) -> Option<ChallengeError> {
        match self {
            Self::MissingCredentials | Self::InvalidCredentialStructure => {
                Some(ChallengeError::InvalidRequest)
            }
            Self::TokenInvalid(_)
            | Self::TokenExpired
            | Self::TokenNotYetValid
            | Self::SignatureInvalid
            | Self::KeyResolution(_) => Some(ChallengeError::InvalidToken),
            _ => None,
        }
    }

    fn challenge_description(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "no authorization included in request",
            Self::InvalidCredentialStructure => "invalid credentials structure",
            _ => "token verification failure",
        }
    }

    /// `WWW-Authenticate` value for this error. `realm` is omitted when `None`.
    pub fn challenge_header(&self, realm: Option<&str>) -> String {
        let code = self
            .challenge()
            .unwrap_or(ChallengeError::InvalidToken)
            .as_str();
        let description = self.challenge_description();

        match realm {
            Some(realm) => format!(
                "Bearer realm=\"{}\",error=\"{}\",error_description=\"{}\"",
                realm.replace('"', "%22"),
                code,
                description
            ),
            None => format!("Bearer error=\"{code}\",error_description=\"{description}\""),
        }
    }

    /// 401 response with the challenge header and an `AuthFailure` extension.
    pub fn into_challenge_response(self, realm: &str) -> Response {
        let challenge = self.challenge_header(Some(realm));
        unauthorized(challenge, AuthFailure::from(&self))
    }
}

/// Cause of a rejected authentication, attached to the 401 response for outer layers.
///
/// The client only ever sees the opaque challenge; this is for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub kind: &'static str,
    pub message: String,
}

impl From<&AuthError> for AuthFailure {
    fn from(err: &AuthError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

fn unauthorized(challenge: String, failure: AuthFailure) -> Response {
    let mut res = (StatusCode::UNAUTHORIZED, UNAUTHORIZED_BODY).into_response();
    match HeaderValue::from_str(&challenge) {
        Ok(value) => {
            res.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        Err(err) => tracing::error!(error = ?err, "unencodable WWW-Authenticate challenge"),
    }
    res.extensions_mut().insert(failure);
    res
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.challenge().is_some() {
            let challenge = self.challenge_header(None);
            return unauthorized(challenge, AuthFailure::from(&self));
        }

        let status = self.status();
        let body = match &self {
            // operator-facing detail stays in the logs
            AuthError::PolicyEngine(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };

        (status, body).into_response()
    }
}

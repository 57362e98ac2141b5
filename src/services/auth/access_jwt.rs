use chrono::Utc;
use jsonwebtoken::{Algorithm, Validation, errors::ErrorKind};
use serde_json::{Map, Value};

use crate::context::ClaimSet;
use crate::error::AuthError;
use crate::services::jwks::types::algorithm_name;
use crate::services::jwks::{KeyReference, KeyResolver};

/// Asymmetric JWS verifier for tokens issued by one authority.
///
/// - Symmetric (`HS*`) algorithms are refused outright.
/// - Temporal claims are optional; when present they must be numeric.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    issuer: String,
}

impl TokenVerifier {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    pub async fn verify(&self, token: &str, keys: &dyn KeyResolver) -> Result<ClaimSet, AuthError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| AuthError::TokenInvalid(format!("malformed header: {e}")))?;

        if matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::TokenInvalid(
                "symmetric algorithms are not accepted".into(),
            ));
        }

        let alg = algorithm_name(&header.alg)
            .ok_or_else(|| AuthError::TokenInvalid("unnamed algorithm".into()))?;

        let key_ref = KeyReference::new(self.issuer.clone())
            .with_key_id(header.kid.clone())
            .with_algorithm(Some(alg.clone()));
        let key = keys.resolve_key(&key_ref).await?;

        if let Some(declared) = key.algorithm()
            && declared != alg
        {
            return Err(AuthError::TokenInvalid(format!(
                "key is for {declared}, token uses {alg}"
            )));
        }

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<Map<String, Value>>(token, key.decoding_key(), &validation)
            .map_err(map_jwt_error)?;

        check_temporal(&data.claims, Utc::now().timestamp_millis() as f64 / 1000.0)?;

        Ok(ClaimSet::from(data.claims))
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        _ => AuthError::TokenInvalid(err.to_string()),
    }
}

/// Temporal claims are NumericDate: seconds, possibly fractional.
fn numeric_claim(claims: &Map<String, Value>, name: &str) -> Result<Option<f64>, AuthError> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(Some)
            .ok_or_else(|| AuthError::TokenInvalid(format!("'{name}' is out of range"))),
        Some(_) => Err(AuthError::TokenInvalid(format!("'{name}' is not a number"))),
    }
}

// exp > now, nbf <= now, iat <= now
fn check_temporal(claims: &Map<String, Value>, now: f64) -> Result<(), AuthError> {
    if let Some(nbf) = numeric_claim(claims, "nbf")?
        && nbf > now
    {
        return Err(AuthError::TokenNotYetValid);
    }
    if let Some(exp) = numeric_claim(claims, "exp")?
        && exp <= now
    {
        return Err(AuthError::TokenExpired);
    }
    if let Some(iat) = numeric_claim(claims, "iat")?
        && iat > now
    {
        return Err(AuthError::TokenNotYetValid);
    }
    Ok(())
}

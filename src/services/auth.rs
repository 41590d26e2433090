//! Bearer-token authentication with HS256 JWTs.

use crate::errors::{IngestError, IngestResult};
use axum::http::{HeaderMap, header};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Validates access tokens and resolves them to a user id.
#[derive(Clone)]
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str, issuer: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Check signature, issuer and expiry; return the subject as a user id.
    pub fn validate(&self, token: &str) -> IngestResult<Uuid> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|err| IngestError::Auth(err.to_string()))?;
        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| IngestError::Auth(format!("subject `{}` is not a user id", data.claims.sub)))
    }

    /// Resolve the caller from an `Authorization: Bearer` header.
    pub fn authenticate(&self, headers: &HeaderMap) -> IngestResult<Uuid> {
        self.validate(bearer_token(headers)?)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> IngestResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| IngestError::Auth("missing authorization header".into()))?
        .to_str()
        .map_err(|_| IngestError::Auth("authorization header is not ASCII".into()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(IngestError::Auth("malformed authorization header".into())),
    }
}

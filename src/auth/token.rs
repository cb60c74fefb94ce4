//! Bearer credential issuance and verification.
//!
//! Credentials are HS256 JWTs carrying the user id (`sub`) and role. The role
//! claim is trusted as-is on verification; storage is only consulted by the
//! request extractors to confirm the subject still exists and is active.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a decimal string
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Could not issue credential: {0}")]
    Issue(#[source] jsonwebtoken::errors::Error),
}

/// Subject and role recovered from a verified credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedClaims {
    pub subject_id: i64,
    pub role: Role,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, subject_id: i64, role: Role) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject_id.to_string(),
            role: role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(TokenError::Issue)
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| TokenError::InvalidCredential(e.to_string()))?;

        let subject_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| TokenError::InvalidCredential("subject is not a user id".to_string()))?;
        let role = data
            .claims
            .role
            .parse::<Role>()
            .map_err(|e| TokenError::InvalidCredential(format!("unknown role '{}'", e.0)))?;

        Ok(VerifiedClaims { subject_id, role })
    }
}

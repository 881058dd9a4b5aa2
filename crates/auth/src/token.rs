//! Session token codec.
//!
//! Tokens are compact JWTs signed with HS256. The algorithm is pinned on
//! decode, and time validation is done by [`validate_claims`] against the
//! caller's clock instead of the library's.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{validate_claims, ClaimSet, SessionClaims, TokenValidationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token secret must not be empty")]
    EmptySecret,

    #[error("token ttl must not be negative")]
    NegativeTtl,

    #[error("failed to encode token: {0}")]
    Encode(String),
}

/// Process-wide signing secret. Immutable once constructed.
#[derive(Clone)]
pub struct TokenSecret(Vec<u8>);

impl TokenSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, TokenError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("TokenSecret(**redacted**)")
    }
}

pub trait TokenCodec: Send + Sync {
    fn issue(&self, claims: ClaimSet, ttl: Duration, now: DateTime<Utc>) -> Result<String, TokenError>;

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError>;
}

#[derive(Clone)]
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256TokenCodec {
    pub fn new(secret: &TokenSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenCodec for Hs256TokenCodec {
    fn issue(&self, claims: ClaimSet, ttl: Duration, now: DateTime<Utc>) -> Result<String, TokenError> {
        if ttl < Duration::zero() {
            return Err(TokenError::NegativeTtl);
        }
        let payload = SessionClaims::stamp(claims, now, now + ttl);
        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenValidationError::Invalid)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

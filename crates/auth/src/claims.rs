use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use autohub_core::{PrincipalId, SectorId, User};

/// The identity snapshot a session token asserts, before it is stamped with
/// its time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    pub sub: PrincipalId,
    pub email: String,
    pub is_admin: bool,
    pub sector_id: SectorId,
}

impl ClaimSet {
    pub fn for_user(user: &User) -> Self {
        Self {
            sub: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            sector_id: user.sector_id,
        }
    }
}

/// Session token payload as it travels on the wire.
///
/// `iat` and `exp` are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,
    pub email: String,
    pub is_admin: bool,
    pub sector_id: SectorId,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn stamp(claims: ClaimSet, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: claims.sub,
            email: claims.email,
            is_admin: claims.is_admin,
            sector_id: claims.sector_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    pub fn claim_set(&self) -> ClaimSet {
        ClaimSet {
            sub: self.sub,
            email: self.email.clone(),
            is_admin: self.is_admin,
            sector_id: self.sector_id,
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token signature or encoding is invalid")]
    Invalid,
}

/// Deterministically validate the time window of decoded claims.
///
/// Expiry is the only time-based rejection, with zero leeway: a token is
/// still valid at exactly `exp` and rejected one second later. `iat` is not
/// checked, so replicas whose clocks trail the issuer still accept fresh
/// tokens.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if now.timestamp() > claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

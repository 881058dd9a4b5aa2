//! `autohub-auth`: authentication and authorization core.
//!
//! No HTTP and no storage engine in here: persistence is reached only through
//! the [`AccessRepository`] capability trait.

pub mod access;
pub mod authenticator;
pub mod claims;
pub mod password;
pub mod principal;
pub mod store;
pub mod token;

#[cfg(test)]
mod testing;

pub use access::{
    authorize_resource, can_access, can_manage, has_global_visibility, require_manage,
    visible_resources, AccessError,
};
pub use authenticator::{AuthError, Authenticator, IssuedToken};
pub use claims::{validate_claims, ClaimSet, SessionClaims, TokenValidationError};
pub use password::{
    hash_password, hash_password_blocking, verify_password, verify_password_blocking, PasswordError,
};
pub use principal::Principal;
pub use store::{AccessRepository, StoreError};
pub use token::{Hs256TokenCodec, TokenCodec, TokenError, TokenSecret};

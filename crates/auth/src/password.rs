//! Password hashing and verification (Argon2id, PHC string format).

use std::sync::LazyLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a password against a stored PHC hash.
///
/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::Hash(e.to_string()))?
}

/// [`verify_password`] on the blocking pool. A failed join counts as a mismatch.
pub async fn verify_password_blocking(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}

/// Stand-in digest for logins against unknown accounts, hashed with the same
/// parameters as real ones.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("autohub-dummy-password").unwrap_or_default());

/// Spend one full verification against [`DUMMY_HASH`] and report a mismatch.
///
/// Keeps a login for an unknown email as slow as one with a wrong password.
pub async fn verify_dummy_blocking(password: String) -> bool {
    tokio::task::spawn_blocking(move || {
        verify_password(&password, &DUMMY_HASH);
        false
    })
    .await
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct-horse-battery-staple", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn salts_differ() {
        let h1 = hash_password("same-password").unwrap();
        let h2 = hash_password("same-password").unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password("same-password", &h1));
        assert!(verify_password("same-password", &h2));
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("password", "not-a-valid-hash"));
        assert!(!verify_password("password", ""));
    }

    #[test]
    fn dummy_hash_is_a_real_digest() {
        assert!(DUMMY_HASH.starts_with("$argon2id$"));
        assert!(verify_password("autohub-dummy-password", &DUMMY_HASH));
    }

    #[tokio::test]
    async fn dummy_verification_never_matches() {
        assert!(!verify_dummy_blocking("autohub-dummy-password".to_string()).await);
        assert!(!verify_dummy_blocking(String::new()).await);
    }

    #[tokio::test]
    async fn blocking_helpers_agree() {
        let hash = hash_password_blocking("s3nha".to_string()).await.unwrap();
        assert!(verify_password_blocking("s3nha".to_string(), hash.clone()).await);
        assert!(!verify_password_blocking("senha".to_string(), hash).await);
    }
}

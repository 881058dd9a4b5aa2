use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use autohub_core::PrincipalId;

use crate::claims::ClaimSet;
use crate::password::{verify_dummy_blocking, verify_password_blocking};
use crate::principal::Principal;
use crate::store::{AccessRepository, StoreError};
use crate::token::{TokenCodec, TokenError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password; deliberately indistinguishable.
    #[error("incorrect email or password")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("could not validate credentials")]
    Unauthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub principal_id: PrincipalId,
    pub expires_at: DateTime<Utc>,
}

/// Verifies credentials at login and resolves bearer tokens into principals.
pub struct Authenticator<R: ?Sized> {
    repo: Arc<R>,
    codec: Arc<dyn TokenCodec>,
    ttl: Duration,
}

impl<R: ?Sized> Clone for Authenticator<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            codec: Arc::clone(&self.codec),
            ttl: self.ttl,
        }
    }
}

impl<R: AccessRepository + ?Sized> Authenticator<R> {
    pub fn new(repo: Arc<R>, codec: Arc<dyn TokenCodec>, ttl: Duration) -> Self {
        Self { repo, codec, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Exchange email and password for a session token.
    ///
    /// The password is checked before the active flag, so an inactive account
    /// is only revealed to someone who knows its password.
    pub async fn login(&self, email: &str, password: &str, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let Some(user) = self.repo.find_principal_by_email(email).await? else {
            verify_dummy_blocking(password.to_string()).await;
            tracing::warn!(%email, "login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await {
            tracing::warn!(principal_id = %user.id, "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            tracing::warn!(principal_id = %user.id, "login rejected: account inactive");
            return Err(AuthError::AccountInactive);
        }

        let access_token = self.codec.issue(ClaimSet::for_user(&user), self.ttl, now)?;
        tracing::info!(principal_id = %user.id, "login succeeded");

        Ok(IssuedToken {
            access_token,
            principal_id: user.id,
            expires_at: now + self.ttl,
        })
    }

    /// Resolve a bearer token into the caller's current principal row.
    ///
    /// Deleted or deactivated accounts are rejected even while their token is
    /// still within its window.
    pub async fn current_principal(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let session = self.codec.decode(token, now).map_err(|e| {
            tracing::debug!(reason = %e, "bearer token rejected");
            AuthError::Unauthenticated
        })?;

        match self.repo.find_principal_by_id(session.sub).await? {
            Some(user) if user.is_active => Ok(Principal { user, session }),
            Some(_) => {
                tracing::warn!(principal_id = %session.sub, "token for deactivated account");
                Err(AuthError::Unauthenticated)
            }
            None => {
                tracing::warn!(principal_id = %session.sub, "token for unknown account");
                Err(AuthError::Unauthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::{hash_password, verify_password};
    use crate::testing::{user, FixtureRepo};
    use crate::token::{Hs256TokenCodec, TokenSecret};
    use autohub_core::{Role, SectorId};

    const PASSWORD: &str = "s3nha-forte";

    fn setup() -> (Arc<FixtureRepo>, Authenticator<FixtureRepo>, autohub_core::User) {
        let mut u = user(Role::User, false, SectorId::new());
        u.password_hash = hash_password(PASSWORD).unwrap();
        let repo = Arc::new(FixtureRepo::new(vec![u.clone()], vec![]));
        let codec = Arc::new(Hs256TokenCodec::new(&TokenSecret::new("auth-tests").unwrap()));
        let auth = Authenticator::new(Arc::clone(&repo), codec, Duration::minutes(60));
        (repo, auth, u)
    }

    #[tokio::test]
    async fn login_then_resolve() {
        let (_repo, auth, u) = setup();
        let now = Utc::now();

        let issued = auth.login(&u.email, PASSWORD, now).await.unwrap();
        assert_eq!(issued.principal_id, u.id);
        assert_eq!(issued.expires_at, now + Duration::minutes(60));

        let principal = auth.current_principal(&issued.access_token, now).await.unwrap();
        assert_eq!(principal.user, u);
        assert_eq!(principal.session.sub, u.id);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let (_repo, auth, u) = setup();
        let now = Utc::now();

        let unknown = auth.login("nobody@example.com", PASSWORD, now).await.unwrap_err();
        let wrong = auth.login(&u.email, "wrong", now).await.unwrap_err();

        assert_eq!(unknown, AuthError::InvalidCredentials);
        assert_eq!(wrong, AuthError::InvalidCredentials);
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn unknown_email_pays_for_a_full_verification() {
        let (_repo, auth, u) = setup();
        // Warm the stand-in digest so only the verification itself is timed.
        auth.login("warmup@example.com", PASSWORD, Utc::now()).await.unwrap_err();

        let baseline = (0..3)
            .map(|_| {
                let started = std::time::Instant::now();
                verify_password("wrong", &u.password_hash);
                started.elapsed()
            })
            .min()
            .unwrap();

        let started = std::time::Instant::now();
        let err = auth.login("nobody@example.com", PASSWORD, Utc::now()).await.unwrap_err();
        let unknown = started.elapsed();

        assert_eq!(err, AuthError::InvalidCredentials);
        assert!(
            unknown >= baseline / 4,
            "unknown email took {unknown:?}, a verification takes {baseline:?}"
        );
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let (_repo, auth, u) = setup();
        let shouted = u.email.to_uppercase();
        assert_eq!(
            auth.login(&shouted, PASSWORD, Utc::now()).await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn inactive_account_with_right_password() {
        let (repo, auth, u) = setup();
        repo.update_user(u.id, |u| u.is_active = false);

        assert_eq!(
            auth.login(&u.email, PASSWORD, Utc::now()).await.unwrap_err(),
            AuthError::AccountInactive
        );
        assert_eq!(
            auth.login(&u.email, "wrong", Utc::now()).await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn deactivation_after_issue_revokes_access() {
        let (repo, auth, u) = setup();
        let now = Utc::now();
        let issued = auth.login(&u.email, PASSWORD, now).await.unwrap();

        repo.update_user(u.id, |u| u.is_active = false);

        assert_eq!(
            auth.current_principal(&issued.access_token, now).await.unwrap_err(),
            AuthError::Unauthenticated
        );
    }

    #[tokio::test]
    async fn deletion_after_issue_revokes_access() {
        let (repo, auth, u) = setup();
        let now = Utc::now();
        let issued = auth.login(&u.email, PASSWORD, now).await.unwrap();

        repo.remove_user(u.id);

        assert_eq!(
            auth.current_principal(&issued.access_token, now).await.unwrap_err(),
            AuthError::Unauthenticated
        );
    }

    #[tokio::test]
    async fn resolved_principal_reflects_fresh_row() {
        let (repo, auth, u) = setup();
        let now = Utc::now();
        let issued = auth.login(&u.email, PASSWORD, now).await.unwrap();

        let moved_to = SectorId::new();
        repo.update_user(u.id, |u| {
            u.sector_id = moved_to;
            u.role = Role::Analyst;
        });

        let principal = auth.current_principal(&issued.access_token, now).await.unwrap();
        assert_eq!(principal.sector_id(), moved_to);
        assert_eq!(principal.role(), Role::Analyst);
        assert_eq!(principal.session.sector_id, u.sector_id);
    }

    #[tokio::test]
    async fn expired_token_is_unauthenticated() {
        let (_repo, auth, u) = setup();
        let now = Utc::now();
        let issued = auth.login(&u.email, PASSWORD, now).await.unwrap();

        let later = now + Duration::minutes(61);
        assert_eq!(
            auth.current_principal(&issued.access_token, later).await.unwrap_err(),
            AuthError::Unauthenticated
        );
    }

    #[tokio::test]
    async fn store_failure_is_not_unauthenticated() {
        let repo = Arc::new(FixtureRepo::failing());
        let codec = Arc::new(Hs256TokenCodec::new(&TokenSecret::new("auth-tests").unwrap()));
        let auth = Authenticator::new(repo, codec, Duration::minutes(60));

        assert!(matches!(
            auth.login("a@example.com", "x", Utc::now()).await,
            Err(AuthError::Store(StoreError::Backend(_)))
        ));
    }
}

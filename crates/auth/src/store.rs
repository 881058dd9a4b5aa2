use async_trait::async_trait;
use thiserror::Error;

use autohub_core::{Automation, AutomationId, DomainError, PrincipalId, SectorId, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("still referenced: {0}")]
    InUse(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<DomainError> for StoreError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => StoreError::NotFound,
            DomainError::Conflict(msg) => StoreError::Conflict(msg),
            other => StoreError::Validation(other.to_string()),
        }
    }
}

/// Read capability the authentication and authorization core needs.
///
/// Implementations are expected to return rows as of a single consistent read
/// per call; no caching happens above this trait.
#[async_trait]
pub trait AccessRepository: Send + Sync {
    /// Exact match; addresses are not case-folded.
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_principal_by_id(&self, id: PrincipalId) -> Result<Option<User>, StoreError>;

    async fn find_resource_by_id(&self, id: AutomationId) -> Result<Option<Automation>, StoreError>;

    /// Automations granted to `sector_id`, active or not.
    async fn list_sector_granted_resources(&self, sector_id: SectorId) -> Result<Vec<Automation>, StoreError>;

    /// Automations granted directly to `principal_id`, active or not.
    async fn list_direct_granted_resources(&self, principal_id: PrincipalId) -> Result<Vec<Automation>, StoreError>;

    async fn list_active_resources(&self) -> Result<Vec<Automation>, StoreError>;
}

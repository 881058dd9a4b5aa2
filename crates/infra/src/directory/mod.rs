//! The organizational directory: sectors, principals and automations.
//!
//! [`Directory`] extends the read capability the auth core needs
//! ([`AccessRepository`]) with the administrative write paths. Two
//! implementations share one contract:
//!
//! - [`InMemoryDirectory`] for tests and local runs,
//! - [`PostgresDirectory`] for deployments.
//!
//! Contract shared by both:
//! - `Conflict` on duplicate email, sector name or sector slug.
//! - `Validation` when a principal or grant references an unknown sector or
//!   principal.
//! - `NotFound` when the target of an update or delete does not exist.
//! - `InUse` when deleting a sector some principal still belongs to.
//! - Deleting a principal removes its direct grants; deleting a sector or an
//!   automation removes the grants that mention it.

mod in_memory;
mod postgres;

use async_trait::async_trait;
use serde::Serialize;

use autohub_auth::{AccessRepository, StoreError};
use autohub_core::{
    Automation, AutomationId, AutomationPatch, NewAutomation, NewSector, NewUser, PrincipalId,
    Sector, SectorId, SectorPatch, User, UserPatch,
};

pub use in_memory::InMemoryDirectory;
pub use postgres::PostgresDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirectoryCounts {
    pub total_automations: u64,
    pub total_users: u64,
    pub total_sectors: u64,
}

#[async_trait]
pub trait Directory: AccessRepository {
    /// Ordered by name.
    async fn list_sectors(&self) -> Result<Vec<Sector>, StoreError>;
    async fn get_sector(&self, id: SectorId) -> Result<Option<Sector>, StoreError>;
    async fn create_sector(&self, input: NewSector) -> Result<Sector, StoreError>;
    async fn update_sector(&self, id: SectorId, patch: SectorPatch) -> Result<Sector, StoreError>;
    async fn delete_sector(&self, id: SectorId) -> Result<(), StoreError>;

    /// Ordered by id (creation order).
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn create_user(&self, input: NewUser) -> Result<User, StoreError>;
    async fn update_user(&self, id: PrincipalId, patch: UserPatch) -> Result<User, StoreError>;
    async fn delete_user(&self, id: PrincipalId) -> Result<(), StoreError>;

    /// Every automation, inactive ones included. Ordered by id.
    async fn list_automations(&self) -> Result<Vec<Automation>, StoreError>;
    async fn create_automation(&self, input: NewAutomation) -> Result<Automation, StoreError>;
    async fn update_automation(&self, id: AutomationId, patch: AutomationPatch) -> Result<Automation, StoreError>;
    async fn delete_automation(&self, id: AutomationId) -> Result<(), StoreError>;

    async fn counts(&self) -> Result<DirectoryCounts, StoreError>;
}

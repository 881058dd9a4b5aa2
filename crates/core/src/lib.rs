//! `autohub-core`: domain foundation for the automation catalog.
//!
//! This crate contains **pure domain** types (no storage, no transport).

pub mod automation;
pub mod entity;
pub mod error;
pub mod id;
pub mod sector;
pub mod user;

pub use automation::{Automation, AutomationPatch, NewAutomation};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AutomationId, PrincipalId, SectorId};
pub use sector::{NewSector, Sector, SectorPatch};
pub use user::{NewUser, Role, User, UserPatch};

//! In-crate fixture repository for unit tests.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use autohub_core::{Automation, AutomationId, PrincipalId, Role, SectorId, User};

use crate::store::{AccessRepository, StoreError};

#[derive(Default)]
pub(crate) struct FixtureRepo {
    pub users: RwLock<Vec<User>>,
    pub automations: RwLock<Vec<Automation>>,
    pub fail: bool,
}

impl FixtureRepo {
    pub fn new(users: Vec<User>, automations: Vec<Automation>) -> Self {
        Self {
            users: RwLock::new(users),
            automations: RwLock::new(automations),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn update_user(&self, id: PrincipalId, f: impl FnOnce(&mut User)) {
        let mut users = self.users.write().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.id == id) {
            f(u);
        }
    }

    pub fn remove_user(&self, id: PrincipalId) {
        self.users.write().unwrap().retain(|u| u.id != id);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail {
            Err(StoreError::Backend("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn automations_where(&self, pred: impl Fn(&Automation) -> bool) -> Result<Vec<Automation>, StoreError> {
        self.check()?;
        Ok(self.automations.read().unwrap().iter().filter(|a| pred(a)).cloned().collect())
    }
}

#[async_trait]
impl AccessRepository for FixtureRepo {
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.users.read().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_principal_by_id(&self, id: PrincipalId) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.users.read().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_resource_by_id(&self, id: AutomationId) -> Result<Option<Automation>, StoreError> {
        Ok(self.automations_where(|a| a.id == id)?.into_iter().next())
    }

    async fn list_sector_granted_resources(&self, sector_id: SectorId) -> Result<Vec<Automation>, StoreError> {
        self.automations_where(|a| a.is_granted_to_sector(sector_id))
    }

    async fn list_direct_granted_resources(&self, principal_id: PrincipalId) -> Result<Vec<Automation>, StoreError> {
        self.automations_where(|a| a.is_granted_to_principal(principal_id))
    }

    async fn list_active_resources(&self) -> Result<Vec<Automation>, StoreError> {
        self.automations_where(|a| a.is_active)
    }
}

pub(crate) fn user(role: Role, is_admin: bool, sector_id: SectorId) -> User {
    let id = PrincipalId::new();
    let now = Utc::now();
    User {
        id,
        email: format!("{id}@example.com"),
        password_hash: "$argon2id$unused".to_string(),
        full_name: "Fixture User".to_string(),
        role,
        is_admin,
        is_active: true,
        sector_id,
        preferences: json!({}),
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn automation(is_active: bool, sector_ids: Vec<SectorId>, user_ids: Vec<PrincipalId>) -> Automation {
    let now = Utc::now();
    let mut sector_ids = sector_ids;
    sector_ids.sort();
    sector_ids.dedup();
    let mut user_ids = user_ids;
    user_ids.sort();
    user_ids.dedup();
    Automation {
        id: AutomationId::new(),
        title: "Fixture automation".to_string(),
        description: None,
        target_url: "https://n8n.internal/webhook/fixture".to_string(),
        icon: "robot".to_string(),
        is_active,
        config: json!({}),
        created_at: now,
        updated_at: now,
        sector_ids,
        user_ids,
    }
}

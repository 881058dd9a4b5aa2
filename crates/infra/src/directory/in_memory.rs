use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use autohub_auth::{AccessRepository, StoreError};
use autohub_core::{
    Automation, AutomationId, AutomationPatch, NewAutomation, NewSector, NewUser, PrincipalId,
    Sector, SectorId, SectorPatch, User, UserPatch,
};

use super::{Directory, DirectoryCounts};

#[derive(Debug, Default)]
struct State {
    sectors: BTreeMap<SectorId, Sector>,
    users: BTreeMap<PrincipalId, User>,
    automations: BTreeMap<AutomationId, Automation>,
}

impl State {
    fn check_sector_unique(&self, candidate: &Sector) -> Result<(), StoreError> {
        for s in self.sectors.values().filter(|s| s.id != candidate.id) {
            if s.slug == candidate.slug {
                return Err(StoreError::Conflict(format!("sector slug '{}' already exists", s.slug)));
            }
            if s.name == candidate.name {
                return Err(StoreError::Conflict(format!("sector name '{}' already exists", s.name)));
            }
        }
        Ok(())
    }

    fn check_user(&self, candidate: &User) -> Result<(), StoreError> {
        if !self.sectors.contains_key(&candidate.sector_id) {
            return Err(StoreError::Validation(format!("sector {} does not exist", candidate.sector_id)));
        }
        if self
            .users
            .values()
            .any(|u| u.id != candidate.id && u.email == candidate.email)
        {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        Ok(())
    }

    fn check_grants(&self, automation: &Automation) -> Result<(), StoreError> {
        if let Some(missing) = automation.sector_ids.iter().find(|id| !self.sectors.contains_key(id)) {
            return Err(StoreError::Validation(format!("sector {missing} does not exist")));
        }
        if let Some(missing) = automation.user_ids.iter().find(|id| !self.users.contains_key(id)) {
            return Err(StoreError::Validation(format!("user {missing} does not exist")));
        }
        Ok(())
    }

    fn automations_where(&self, pred: impl Fn(&Automation) -> bool) -> Vec<Automation> {
        self.automations.values().filter(|a| pred(a)).cloned().collect()
    }
}

/// In-memory directory for tests and local runs.
///
/// A single lock guards all three collections, so every operation observes
/// and produces a consistent snapshot.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("directory lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("directory lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccessRepository for InMemoryDirectory {
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_principal_by_id(&self, id: PrincipalId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_resource_by_id(&self, id: AutomationId) -> Result<Option<Automation>, StoreError> {
        Ok(self.read()?.automations.get(&id).cloned())
    }

    async fn list_sector_granted_resources(&self, sector_id: SectorId) -> Result<Vec<Automation>, StoreError> {
        Ok(self.read()?.automations_where(|a| a.is_granted_to_sector(sector_id)))
    }

    async fn list_direct_granted_resources(&self, principal_id: PrincipalId) -> Result<Vec<Automation>, StoreError> {
        Ok(self.read()?.automations_where(|a| a.is_granted_to_principal(principal_id)))
    }

    async fn list_active_resources(&self) -> Result<Vec<Automation>, StoreError> {
        Ok(self.read()?.automations_where(|a| a.is_active))
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn list_sectors(&self) -> Result<Vec<Sector>, StoreError> {
        let mut sectors: Vec<Sector> = self.read()?.sectors.values().cloned().collect();
        sectors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sectors)
    }

    async fn get_sector(&self, id: SectorId) -> Result<Option<Sector>, StoreError> {
        Ok(self.read()?.sectors.get(&id).cloned())
    }

    async fn create_sector(&self, input: NewSector) -> Result<Sector, StoreError> {
        let sector = input.into_sector(SectorId::new(), Utc::now())?;
        let mut state = self.write()?;
        state.check_sector_unique(&sector)?;
        state.sectors.insert(sector.id, sector.clone());
        Ok(sector)
    }

    async fn update_sector(&self, id: SectorId, patch: SectorPatch) -> Result<Sector, StoreError> {
        let mut state = self.write()?;
        let mut sector = state.sectors.get(&id).cloned().ok_or(StoreError::NotFound)?;
        patch.apply(&mut sector)?;
        state.check_sector_unique(&sector)?;
        state.sectors.insert(id, sector.clone());
        Ok(sector)
    }

    async fn delete_sector(&self, id: SectorId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.sectors.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        let members = state.users.values().filter(|u| u.sector_id == id).count();
        if members > 0 {
            return Err(StoreError::InUse(format!("{members} user(s) still belong to this sector")));
        }
        state.sectors.remove(&id);
        for automation in state.automations.values_mut() {
            automation.sector_ids.retain(|s| *s != id);
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn create_user(&self, input: NewUser) -> Result<User, StoreError> {
        let user = input.into_user(PrincipalId::new(), Utc::now())?;
        let mut state = self.write()?;
        state.check_user(&user)?;
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: PrincipalId, patch: UserPatch) -> Result<User, StoreError> {
        let mut state = self.write()?;
        let mut user = state.users.get(&id).cloned().ok_or(StoreError::NotFound)?;
        patch.apply(&mut user, Utc::now())?;
        state.check_user(&user)?;
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: PrincipalId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.users.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        for automation in state.automations.values_mut() {
            automation.user_ids.retain(|u| *u != id);
        }
        Ok(())
    }

    async fn list_automations(&self) -> Result<Vec<Automation>, StoreError> {
        Ok(self.read()?.automations.values().cloned().collect())
    }

    async fn create_automation(&self, input: NewAutomation) -> Result<Automation, StoreError> {
        let automation = input.into_automation(AutomationId::new(), Utc::now())?;
        let mut state = self.write()?;
        state.check_grants(&automation)?;
        state.automations.insert(automation.id, automation.clone());
        Ok(automation)
    }

    async fn update_automation(&self, id: AutomationId, patch: AutomationPatch) -> Result<Automation, StoreError> {
        let mut state = self.write()?;
        let mut automation = state.automations.get(&id).cloned().ok_or(StoreError::NotFound)?;
        patch.apply(&mut automation, Utc::now())?;
        state.check_grants(&automation)?;
        state.automations.insert(id, automation.clone());
        Ok(automation)
    }

    async fn delete_automation(&self, id: AutomationId) -> Result<(), StoreError> {
        self.write()?
            .automations
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn counts(&self) -> Result<DirectoryCounts, StoreError> {
        let state = self.read()?;
        Ok(DirectoryCounts {
            total_automations: state.automations.len() as u64,
            total_users: state.users.len() as u64,
            total_sectors: state.sectors.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::contract;

    #[tokio::test]
    async fn uniqueness() {
        contract::uniqueness(&InMemoryDirectory::new()).await;
    }

    #[tokio::test]
    async fn references_are_checked() {
        contract::references_are_checked(&InMemoryDirectory::new()).await;
    }

    #[tokio::test]
    async fn sector_in_use() {
        contract::sector_in_use(&InMemoryDirectory::new()).await;
    }

    #[tokio::test]
    async fn grants_cascade() {
        contract::grants_cascade(&InMemoryDirectory::new()).await;
    }

    #[tokio::test]
    async fn patches_are_whitelisted_and_atomic() {
        contract::patches_are_whitelisted_and_atomic(&InMemoryDirectory::new()).await;
    }

    #[tokio::test]
    async fn automation_updates_replace_grants() {
        contract::automation_updates_replace_grants(&InMemoryDirectory::new()).await;
    }

    #[tokio::test]
    async fn counts() {
        contract::counts(&InMemoryDirectory::new()).await;
    }

    #[tokio::test]
    async fn sectors_listed_by_name() {
        let dir = InMemoryDirectory::new();
        for slug in ["rh", "financeiro", "ti"] {
            dir.create_sector(contract::new_sector(slug)).await.unwrap();
        }
        let names: Vec<String> = dir.list_sectors().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Setor financeiro", "Setor rh", "Setor ti"]);
    }
}

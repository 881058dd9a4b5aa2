//! Access resolution over the two grant relations.
//!
//! - Writes are gated by the admin flag alone ([`can_manage`]).
//! - Admins, managers and analysts see every active automation.
//! - Everyone else sees the union of what their sector is granted and what
//!   they are granted directly, active automations only.
//!
//! [`can_access`] and [`visible_resources`] are the pointwise and bulk forms
//! of the same rule and must always agree.

use std::collections::BTreeMap;

use thiserror::Error;

use autohub_core::{Automation, AutomationId, Entity, Role, User};

use crate::store::{AccessRepository, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn can_manage(principal: &User) -> bool {
    principal.is_admin
}

pub fn require_manage(principal: &User) -> Result<(), AccessError> {
    if can_manage(principal) {
        Ok(())
    } else {
        Err(AccessError::Forbidden)
    }
}

/// The global read override.
pub fn has_global_visibility(principal: &User) -> bool {
    principal.is_admin || matches!(principal.role, Role::Manager | Role::Analyst)
}

pub fn can_access(principal: &User, automation: &Automation) -> bool {
    if !automation.is_active {
        return false;
    }
    has_global_visibility(principal)
        || automation.is_granted_to_sector(principal.sector_id)
        || automation.is_granted_to_principal(principal.id)
}

/// Every automation `principal` may see right now, ordered by id.
///
/// Grant state is read live on every call.
pub async fn visible_resources<R>(repo: &R, principal: &User) -> Result<Vec<Automation>, StoreError>
where
    R: AccessRepository + ?Sized,
{
    if has_global_visibility(principal) {
        let all = repo.list_active_resources().await?;
        return Ok(union_by_id([all]));
    }

    let by_sector = repo.list_sector_granted_resources(principal.sector_id).await?;
    let direct = repo.list_direct_granted_resources(principal.id).await?;
    Ok(union_by_id([by_sector, direct]))
}

/// Fetch one automation on behalf of `principal`.
///
/// Existence is checked first: an unknown id is `NotFound` for everyone,
/// a known but inaccessible one is `Forbidden`.
pub async fn authorize_resource<R>(repo: &R, principal: &User, id: AutomationId) -> Result<Automation, AccessError>
where
    R: AccessRepository + ?Sized,
{
    let automation = repo.find_resource_by_id(id).await?.ok_or(AccessError::NotFound)?;
    if can_access(principal, &automation) {
        Ok(automation)
    } else {
        tracing::debug!(principal_id = %principal.id, automation_id = %id, "access denied");
        Err(AccessError::Forbidden)
    }
}

/// Set union keyed by id, keeping active rows only.
fn union_by_id<const N: usize>(sources: [Vec<Automation>; N]) -> Vec<Automation> {
    let mut merged = BTreeMap::new();
    for automation in sources.into_iter().flatten() {
        if automation.is_active {
            merged.entry(automation.id()).or_insert(automation);
        }
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::testing::{automation, user, FixtureRepo};
    use autohub_core::{PrincipalId, SectorId};
    use proptest::prelude::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    fn ids(list: &[Automation]) -> BTreeSet<AutomationId> {
        list.iter().map(|a| a.id).collect()
    }

    #[test]
    fn only_admin_flag_grants_management() {
        let sector = SectorId::new();
        assert!(can_manage(&user(Role::User, true, sector)));
        for role in [Role::User, Role::Manager, Role::Analyst, Role::Admin] {
            assert!(!can_manage(&user(role, false, sector)), "{role} without flag");
        }
        assert_eq!(require_manage(&user(Role::Admin, false, sector)), Err(AccessError::Forbidden));
    }

    #[test]
    fn admin_role_without_flag_has_no_override() {
        let sector = SectorId::new();
        let u = user(Role::Admin, false, sector);
        let a = automation(true, vec![], vec![]);
        assert!(!can_access(&u, &a));
    }

    #[test]
    fn sector_grant_revocation_takes_effect_without_new_login() {
        let ti = SectorId::new();
        let u = user(Role::User, false, ti);
        let r1 = automation(true, vec![ti], vec![]);
        let repo = FixtureRepo::new(vec![u.clone()], vec![r1.clone()]);

        let before = block_on(visible_resources(&repo, &u)).unwrap();
        assert_eq!(ids(&before), BTreeSet::from([r1.id]));

        repo.automations.write().unwrap()[0].sector_ids.clear();
        let after = block_on(visible_resources(&repo, &u)).unwrap();
        assert!(after.is_empty());
    }

    #[test]
    fn direct_grant_survives_sector_revocation() {
        let ti = SectorId::new();
        let u = user(Role::User, false, ti);
        let r1 = automation(true, vec![ti], vec![u.id]);
        let repo = FixtureRepo::new(vec![u.clone()], vec![r1.clone()]);

        repo.automations.write().unwrap()[0].sector_ids.clear();
        let after = block_on(visible_resources(&repo, &u)).unwrap();
        assert_eq!(ids(&after), BTreeSet::from([r1.id]));
    }

    #[test]
    fn resource_granted_both_ways_appears_once() {
        let ti = SectorId::new();
        let u = user(Role::User, false, ti);
        let r = automation(true, vec![ti], vec![u.id]);
        let repo = FixtureRepo::new(vec![u.clone()], vec![r]);

        assert_eq!(block_on(visible_resources(&repo, &u)).unwrap().len(), 1);
    }

    #[test]
    fn not_found_precedes_forbidden() {
        let u = user(Role::User, false, SectorId::new());
        let hidden = automation(true, vec![], vec![]);
        let repo = FixtureRepo::new(vec![u.clone()], vec![hidden.clone()]);

        assert_eq!(
            block_on(authorize_resource(&repo, &u, AutomationId::new())),
            Err(AccessError::NotFound)
        );
        assert_eq!(
            block_on(authorize_resource(&repo, &u, hidden.id)),
            Err(AccessError::Forbidden)
        );
    }

    #[test]
    fn inactive_resource_is_forbidden_even_for_admin() {
        let admin = user(Role::Admin, true, SectorId::new());
        let off = automation(false, vec![admin.sector_id], vec![admin.id]);
        let repo = FixtureRepo::new(vec![admin.clone()], vec![off.clone()]);

        assert_eq!(
            block_on(authorize_resource(&repo, &admin, off.id)),
            Err(AccessError::Forbidden)
        );
    }

    #[test]
    fn store_failure_is_never_allow() {
        let u = user(Role::Manager, false, SectorId::new());
        let repo = FixtureRepo::failing();

        assert!(block_on(visible_resources(&repo, &u)).is_err());
        assert!(matches!(
            block_on(authorize_resource(&repo, &u, AutomationId::new())),
            Err(AccessError::Store(_))
        ));
    }

    // Small pools so generated grants actually overlap with the principal.
    fn world() -> impl Strategy<Value = (Role, bool, usize, usize, Vec<(bool, Vec<usize>, Vec<usize>)>)> {
        let role = prop_oneof![
            Just(Role::User),
            Just(Role::Manager),
            Just(Role::Analyst),
            Just(Role::Admin),
        ];
        let resource = (
            any::<bool>(),
            prop::collection::vec(0usize..3, 0..3),
            prop::collection::vec(0usize..3, 0..3),
        );
        (
            role,
            any::<bool>(),
            0usize..3,
            0usize..3,
            prop::collection::vec(resource, 0..8),
        )
    }

    struct World {
        principal: User,
        repo: FixtureRepo,
        automations: Vec<Automation>,
    }

    fn build(
        (role, is_admin, sector_ix, principal_ix, resources): (
            Role,
            bool,
            usize,
            usize,
            Vec<(bool, Vec<usize>, Vec<usize>)>,
        ),
    ) -> World {
        let sectors: Vec<SectorId> = (0..3).map(|_| SectorId::new()).collect();
        let principals: Vec<PrincipalId> = (0..3).map(|_| PrincipalId::new()).collect();

        let mut principal = user(role, is_admin, sectors[sector_ix]);
        principal.id = principals[principal_ix];

        let automations: Vec<Automation> = resources
            .into_iter()
            .map(|(active, s, u)| {
                automation(
                    active,
                    s.into_iter().map(|i| sectors[i]).collect(),
                    u.into_iter().map(|i| principals[i]).collect(),
                )
            })
            .collect();

        World {
            repo: FixtureRepo::new(vec![principal.clone()], automations.clone()),
            principal,
            automations,
        }
    }

    proptest! {
        #[test]
        fn global_override_sees_exactly_active(w in world()) {
            let w = build(w);
            prop_assume!(has_global_visibility(&w.principal));

            let visible = block_on(visible_resources(&w.repo, &w.principal)).unwrap();
            let expected: BTreeSet<_> = w.automations.iter().filter(|a| a.is_active).map(|a| a.id).collect();
            prop_assert_eq!(ids(&visible), expected);
        }

        #[test]
        fn others_see_union_of_grants(w in world()) {
            let w = build(w);
            prop_assume!(!has_global_visibility(&w.principal));
            let p = &w.principal;

            let visible = block_on(visible_resources(&w.repo, p)).unwrap();
            let expected: BTreeSet<_> = w
                .automations
                .iter()
                .filter(|a| a.is_active)
                .filter(|a| a.sector_ids.contains(&p.sector_id) || a.user_ids.contains(&p.id))
                .map(|a| a.id)
                .collect();

            prop_assert_eq!(visible.len(), expected.len());
            prop_assert_eq!(ids(&visible), expected);
        }

        #[test]
        fn pointwise_agrees_with_bulk(w in world()) {
            let w = build(w);
            let visible = ids(&block_on(visible_resources(&w.repo, &w.principal)).unwrap());

            for a in &w.automations {
                prop_assert_eq!(can_access(&w.principal, a), visible.contains(&a.id));
            }
        }
    }
}

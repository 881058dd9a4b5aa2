//! Automations: the catalogued, access-controlled resources.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::entity::Entity;
use crate::error::{require_text, DomainResult};
use crate::id::{AutomationId, PrincipalId, SectorId};

const TITLE_MAX: usize = 255;
const DESCRIPTION_MAX: usize = 500;
const TARGET_URL_MAX: usize = 500;
const ICON_MAX: usize = 100;

pub const DEFAULT_ICON: &str = "robot";

/// An automation together with its two independent grant relations.
///
/// `sector_ids` (sector grants) and `user_ids` (direct grants) are kept sorted
/// and free of duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    pub id: AutomationId,
    pub title: String,
    pub description: Option<String>,
    pub target_url: String,
    pub icon: String,
    pub is_active: bool,
    pub config: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sector_ids: Vec<SectorId>,
    pub user_ids: Vec<PrincipalId>,
}

impl Automation {
    pub fn is_granted_to_sector(&self, sector_id: SectorId) -> bool {
        self.sector_ids.binary_search(&sector_id).is_ok()
    }

    pub fn is_granted_to_principal(&self, principal_id: PrincipalId) -> bool {
        self.user_ids.binary_search(&principal_id).is_ok()
    }
}

impl Entity for Automation {
    type Id = AutomationId;

    fn id(&self) -> AutomationId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct NewAutomation {
    pub title: String,
    pub description: Option<String>,
    pub target_url: String,
    pub icon: Option<String>,
    pub is_active: bool,
    pub config: Option<JsonValue>,
    pub sector_ids: Vec<SectorId>,
    pub user_ids: Vec<PrincipalId>,
}

impl NewAutomation {
    pub fn into_automation(self, id: AutomationId, now: DateTime<Utc>) -> DomainResult<Automation> {
        Ok(Automation {
            id,
            title: require_text("title", &self.title, TITLE_MAX)?,
            description: validate_description(self.description)?,
            target_url: require_text("target_url", &self.target_url, TARGET_URL_MAX)?,
            icon: match self.icon {
                Some(icon) => require_text("icon", &icon, ICON_MAX)?,
                None => DEFAULT_ICON.to_string(),
            },
            is_active: self.is_active,
            config: self.config.unwrap_or_else(|| JsonValue::Object(Default::default())),
            created_at: now,
            updated_at: now,
            sector_ids: normalize(self.sector_ids),
            user_ids: normalize(self.user_ids),
        })
    }
}

/// Whitelisted automation update. Grant sets, when present, replace the
/// existing relation wholesale.
#[derive(Debug, Clone, Default)]
pub struct AutomationPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub target_url: Option<String>,
    pub icon: Option<String>,
    pub is_active: Option<bool>,
    pub config: Option<JsonValue>,
    pub sector_ids: Option<Vec<SectorId>>,
    pub user_ids: Option<Vec<PrincipalId>>,
}

impl AutomationPatch {
    pub fn apply(self, automation: &mut Automation, now: DateTime<Utc>) -> DomainResult<()> {
        let title = self
            .title
            .as_deref()
            .map(|t| require_text("title", t, TITLE_MAX))
            .transpose()?;
        let description = self.description.map(validate_description).transpose()?;
        let target_url = self
            .target_url
            .as_deref()
            .map(|u| require_text("target_url", u, TARGET_URL_MAX))
            .transpose()?;
        let icon = self
            .icon
            .as_deref()
            .map(|i| require_text("icon", i, ICON_MAX))
            .transpose()?;

        if let Some(title) = title {
            automation.title = title;
        }
        if let Some(description) = description {
            automation.description = description;
        }
        if let Some(target_url) = target_url {
            automation.target_url = target_url;
        }
        if let Some(icon) = icon {
            automation.icon = icon;
        }
        if let Some(is_active) = self.is_active {
            automation.is_active = is_active;
        }
        if let Some(config) = self.config {
            automation.config = config;
        }
        if let Some(sector_ids) = self.sector_ids {
            automation.sector_ids = normalize(sector_ids);
        }
        if let Some(user_ids) = self.user_ids {
            automation.user_ids = normalize(user_ids);
        }
        automation.updated_at = now;
        Ok(())
    }
}

/// Sort and deduplicate a grant list.
pub fn normalize<T: Ord>(ids: Vec<T>) -> Vec<T> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

fn validate_description(description: Option<String>) -> DomainResult<Option<String>> {
    match description {
        None => Ok(None),
        Some(d) if d.trim().is_empty() => Ok(None),
        Some(d) => require_text("description", &d, DESCRIPTION_MAX).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewAutomation {
        NewAutomation {
            title: "Folha de ponto".to_string(),
            description: None,
            target_url: "https://n8n.internal/webhook/ponto".to_string(),
            icon: None,
            is_active: true,
            config: None,
            sector_ids: vec![],
            user_ids: vec![],
        }
    }

    #[test]
    fn defaults_icon_and_config() {
        let a = sample().into_automation(AutomationId::new(), Utc::now()).unwrap();
        assert_eq!(a.icon, DEFAULT_ICON);
        assert!(a.config.is_object());
    }

    #[test]
    fn grants_are_deduplicated_and_searchable() {
        let s1 = SectorId::new();
        let s2 = SectorId::new();
        let u = PrincipalId::new();
        let mut input = sample();
        input.sector_ids = vec![s2, s1, s2];
        input.user_ids = vec![u, u];

        let a = input.into_automation(AutomationId::new(), Utc::now()).unwrap();
        assert_eq!(a.sector_ids.len(), 2);
        assert_eq!(a.user_ids, vec![u]);
        assert!(a.is_granted_to_sector(s1));
        assert!(a.is_granted_to_sector(s2));
        assert!(a.is_granted_to_principal(u));
        assert!(!a.is_granted_to_principal(PrincipalId::new()));
    }

    #[test]
    fn patch_replaces_grant_sets_wholesale() {
        let keep = SectorId::new();
        let mut input = sample();
        input.sector_ids = vec![SectorId::new(), SectorId::new()];
        let mut a = input.into_automation(AutomationId::new(), Utc::now()).unwrap();

        AutomationPatch {
            sector_ids: Some(vec![keep]),
            ..Default::default()
        }
        .apply(&mut a, Utc::now())
        .unwrap();

        assert_eq!(a.sector_ids, vec![keep]);
        assert_eq!(a.title, "Folha de ponto");
    }

    #[test]
    fn empty_title_rejected() {
        let mut input = sample();
        input.title = "   ".to_string();
        assert!(input.into_automation(AutomationId::new(), Utc::now()).is_err());
    }
}

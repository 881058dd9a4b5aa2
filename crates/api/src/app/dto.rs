use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use autohub_core::{
    Automation, AutomationId, AutomationPatch, NewAutomation, NewSector, PrincipalId, Role, Sector,
    SectorId, SectorPatch, User,
};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// Auth
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

// -------------------------
// Sectors
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSectorRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<CreateSectorRequest> for NewSector {
    fn from(r: CreateSectorRequest) -> Self {
        NewSector {
            name: r.name,
            slug: r.slug,
            description: r.description,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSectorRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl From<UpdateSectorRequest> for SectorPatch {
    fn from(r: UpdateSectorRequest) -> Self {
        SectorPatch {
            name: r.name,
            slug: r.slug,
            description: r.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SectorResponse {
    pub id: SectorId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Sector> for SectorResponse {
    fn from(s: Sector) -> Self {
        Self {
            id: s.id,
            name: s.name,
            slug: s.slug,
            description: s.description,
            created_at: s.created_at,
        }
    }
}

// -------------------------
// Users
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_admin: bool,
    pub sector_id: SectorId,
    #[serde(default)]
    pub preferences: Option<JsonValue>,
}

/// Administrative user update. Only these fields can change; anything else
/// in the body is rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
    pub sector_id: Option<SectorId>,
    pub password: Option<String>,
    pub preferences: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePreferencesRequest {
    pub preferences: JsonValue,
}

/// Public view of a principal. The password hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: PrincipalId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_admin: bool,
    pub is_active: bool,
    pub sector_id: SectorId,
    pub preferences: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            role: u.role,
            is_admin: u.is_admin,
            is_active: u.is_active,
            sector_id: u.sector_id,
            preferences: u.preferences,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

// -------------------------
// Automations
// -------------------------

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAutomationRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub target_url: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub config: Option<JsonValue>,
    #[serde(default)]
    pub sector_ids: Vec<SectorId>,
    #[serde(default)]
    pub user_ids: Vec<PrincipalId>,
}

impl From<CreateAutomationRequest> for NewAutomation {
    fn from(r: CreateAutomationRequest) -> Self {
        NewAutomation {
            title: r.title,
            description: r.description,
            target_url: r.target_url,
            icon: r.icon,
            is_active: r.is_active,
            config: r.config,
            sector_ids: r.sector_ids,
            user_ids: r.user_ids,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAutomationRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub target_url: Option<String>,
    pub icon: Option<String>,
    pub is_active: Option<bool>,
    pub config: Option<JsonValue>,
    pub sector_ids: Option<Vec<SectorId>>,
    pub user_ids: Option<Vec<PrincipalId>>,
}

impl From<UpdateAutomationRequest> for AutomationPatch {
    fn from(r: UpdateAutomationRequest) -> Self {
        AutomationPatch {
            title: r.title,
            description: r.description,
            target_url: r.target_url,
            icon: r.icon,
            is_active: r.is_active,
            config: r.config,
            sector_ids: r.sector_ids,
            user_ids: r.user_ids,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListAutomationsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize)]
pub struct AutomationResponse {
    pub id: AutomationId,
    pub title: String,
    pub description: Option<String>,
    pub target_url: String,
    pub icon: String,
    pub is_active: bool,
    pub config: JsonValue,
    pub sector_ids: Vec<SectorId>,
    /// Direct grantees; only shown to administrators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<PrincipalId>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutomationResponse {
    pub fn new(a: Automation, show_direct_grants: bool) -> Self {
        Self {
            id: a.id,
            title: a.title,
            description: a.description,
            target_url: a.target_url,
            icon: a.icon,
            is_active: a.is_active,
            config: a.config,
            sector_ids: a.sector_ids,
            user_ids: show_direct_grants.then_some(a.user_ids),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_user_rejects_unknown_fields() {
        let err = serde_json::from_value::<UpdateUserRequest>(json!({ "password_hash": "x" }));
        assert!(err.is_err());
        let err = serde_json::from_value::<UpdateUserRequest>(json!({ "id": "x" }));
        assert!(err.is_err());
    }

    #[test]
    fn null_description_clears_but_absent_keeps() {
        let clear: UpdateSectorRequest = serde_json::from_value(json!({ "description": null })).unwrap();
        assert_eq!(clear.description, Some(None));

        let keep: UpdateSectorRequest = serde_json::from_value(json!({ "name": "RH" })).unwrap();
        assert_eq!(keep.description, None);
    }

    #[test]
    fn create_automation_defaults() {
        let r: CreateAutomationRequest = serde_json::from_value(json!({
            "title": "Relatório",
            "target_url": "https://n8n.internal/webhook/relatorio",
        }))
        .unwrap();
        assert!(r.is_active);
        assert!(r.sector_ids.is_empty());
        assert!(r.user_ids.is_empty());
    }

    #[test]
    fn user_response_has_no_hash() {
        let now = Utc::now();
        let user = User {
            id: PrincipalId::new(),
            email: "gil@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            full_name: "Gil".to_string(),
            role: Role::User,
            is_admin: false,
            is_active: true,
            sector_id: SectorId::new(),
            preferences: json!({}),
            created_at: now,
            updated_at: now,
        };
        let body = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(body.get("password_hash").is_none());
        assert!(!body.to_string().contains("argon2"));
    }
}

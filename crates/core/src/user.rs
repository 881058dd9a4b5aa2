//! Principal accounts (employees) and their whitelisted update path.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::entity::Entity;
use crate::error::{require_text, DomainError, DomainResult};
use crate::id::{PrincipalId, SectorId};

const EMAIL_MAX: usize = 255;
const FULL_NAME_MAX: usize = 255;

/// Advisory role metadata.
///
/// Only `manager` and `analyst` change anything (read visibility); write access
/// is decided by `User::is_admin` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Manager,
    Analyst,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Manager => "manager",
            Role::Analyst => "analyst",
            Role::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "manager" => Ok(Role::Manager),
            "analyst" => Ok(Role::Analyst),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!(
                "unknown role '{other}' (expected user, manager, analyst or admin)"
            ))),
        }
    }
}

/// A principal as stored in the credential store.
///
/// # Invariants
/// - `email` is unique across all principals (enforced by the store).
/// - `sector_id` always references an existing sector.
#[derive(Clone, PartialEq)]
pub struct User {
    pub id: PrincipalId,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_admin: bool,
    pub is_active: bool,
    pub sector_id: SectorId,
    pub preferences: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// The hash stays out of logs.
impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("is_admin", &self.is_admin)
            .field("is_active", &self.is_active)
            .field("sector_id", &self.sector_id)
            .finish_non_exhaustive()
    }
}

impl Entity for User {
    type Id = PrincipalId;

    fn id(&self) -> PrincipalId {
        self.id
    }
}

/// Input for creating a principal. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_admin: bool,
    pub sector_id: SectorId,
    pub preferences: Option<JsonValue>,
}

impl NewUser {
    /// Validate the input and build the stored row (active by default).
    pub fn into_user(self, id: PrincipalId, now: DateTime<Utc>) -> DomainResult<User> {
        let preferences = match self.preferences {
            Some(p) => validate_preferences(p)?,
            None => JsonValue::Object(Default::default()),
        };
        if self.password_hash.is_empty() {
            return Err(DomainError::invariant("password hash missing"));
        }

        Ok(User {
            id,
            email: validate_email(&self.email)?,
            password_hash: self.password_hash,
            full_name: require_text("full_name", &self.full_name, FULL_NAME_MAX)?,
            role: self.role,
            is_admin: self.is_admin,
            is_active: true,
            sector_id: self.sector_id,
            preferences,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Explicit whitelist of administratively updatable principal fields.
///
/// Absent fields are left untouched. Each present field is validated on its
/// own before anything is written, so a rejected patch never half-applies.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
    pub sector_id: Option<SectorId>,
    /// Already hashed by the caller.
    pub password_hash: Option<String>,
    pub preferences: Option<JsonValue>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.role.is_none()
            && self.is_admin.is_none()
            && self.is_active.is_none()
            && self.sector_id.is_none()
            && self.password_hash.is_none()
            && self.preferences.is_none()
    }

    pub fn apply(self, user: &mut User, now: DateTime<Utc>) -> DomainResult<()> {
        let email = self.email.as_deref().map(validate_email).transpose()?;
        let full_name = self
            .full_name
            .as_deref()
            .map(|n| require_text("full_name", n, FULL_NAME_MAX))
            .transpose()?;
        let preferences = self.preferences.map(validate_preferences).transpose()?;
        if matches!(self.password_hash.as_deref(), Some("")) {
            return Err(DomainError::invariant("password hash missing"));
        }

        if let Some(email) = email {
            user.email = email;
        }
        if let Some(full_name) = full_name {
            user.full_name = full_name;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(is_admin) = self.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        if let Some(sector_id) = self.sector_id {
            user.sector_id = sector_id;
        }
        if let Some(hash) = self.password_hash {
            user.password_hash = hash;
        }
        if let Some(preferences) = preferences {
            user.preferences = preferences;
        }
        user.updated_at = now;
        Ok(())
    }
}

/// Basic shape check; addresses are compared exactly as given (no case folding).
pub fn validate_email(email: &str) -> DomainResult<String> {
    if email.is_empty() || email.chars().count() > EMAIL_MAX {
        return Err(DomainError::validation("invalid email format"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("invalid email format"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email.to_string())
        }
        _ => Err(DomainError::validation("invalid email format")),
    }
}

fn validate_preferences(value: JsonValue) -> DomainResult<JsonValue> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(DomainError::validation("preferences must be a JSON object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_user() -> NewUser {
        NewUser {
            email: "ana@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            full_name: "  Ana Souza ".to_string(),
            role: Role::User,
            is_admin: false,
            sector_id: SectorId::new(),
            preferences: None,
        }
    }

    #[test]
    fn new_user_is_active_with_empty_preferences() {
        let user = new_user().into_user(PrincipalId::new(), Utc::now()).unwrap();
        assert!(user.is_active);
        assert_eq!(user.full_name, "Ana Souza");
        assert_eq!(user.preferences, json!({}));
    }

    #[test]
    fn email_is_not_case_folded() {
        let mut input = new_user();
        input.email = "Ana@Example.com".to_string();
        let user = input.into_user(PrincipalId::new(), Utc::now()).unwrap();
        assert_eq!(user.email, "Ana@Example.com");
    }

    #[test]
    fn invalid_email_rejected() {
        for bad in ["", "no-at-sign", "@example.com", "ana@", "a b@example.com", "a@b@c"] {
            assert!(validate_email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn rejected_patch_leaves_user_untouched() {
        let mut user = new_user().into_user(PrincipalId::new(), Utc::now()).unwrap();
        let before = user.clone();

        let patch = UserPatch {
            full_name: Some("Renamed".to_string()),
            preferences: Some(json!(["not", "an", "object"])),
            ..Default::default()
        };

        assert!(patch.apply(&mut user, Utc::now()).is_err());
        assert_eq!(user, before);
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut user = new_user().into_user(PrincipalId::new(), Utc::now()).unwrap();
        let sector = user.sector_id;

        UserPatch {
            role: Some(Role::Analyst),
            is_active: Some(false),
            ..Default::default()
        }
        .apply(&mut user, Utc::now())
        .unwrap();

        assert_eq!(user.role, Role::Analyst);
        assert!(!user.is_active);
        assert_eq!(user.sector_id, sector);
        assert_eq!(user.email, "ana@example.com");
    }

    #[test]
    fn debug_output_redacts_hash() {
        let user = new_user().into_user(PrincipalId::new(), Utc::now()).unwrap();
        assert!(!format!("{user:?}").contains("argon2"));
    }

    #[test]
    fn role_parses_lowercase_names_only() {
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert!("Manager".parse::<Role>().is_err());
    }
}

//! Organizational sectors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{require_text, DomainError, DomainResult};
use crate::id::SectorId;

const NAME_MAX: usize = 100;
const SLUG_MAX: usize = 50;
const DESCRIPTION_MAX: usize = 255;

/// A sector. `name` and `slug` are unique; a sector referenced by any
/// principal cannot be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Sector {
    type Id = SectorId;

    fn id(&self) -> SectorId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct NewSector {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl NewSector {
    pub fn into_sector(self, id: SectorId, now: DateTime<Utc>) -> DomainResult<Sector> {
        Ok(Sector {
            id,
            name: require_text("name", &self.name, NAME_MAX)?,
            slug: validate_slug(&self.slug)?,
            description: validate_description(self.description)?,
            created_at: now,
        })
    }
}

/// Whitelisted sector update. `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct SectorPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
}

impl SectorPatch {
    pub fn apply(self, sector: &mut Sector) -> DomainResult<()> {
        let name = self
            .name
            .as_deref()
            .map(|n| require_text("name", n, NAME_MAX))
            .transpose()?;
        let slug = self.slug.as_deref().map(validate_slug).transpose()?;
        let description = self.description.map(validate_description).transpose()?;

        if let Some(name) = name {
            sector.name = name;
        }
        if let Some(slug) = slug {
            sector.slug = slug;
        }
        if let Some(description) = description {
            sector.description = description;
        }
        Ok(())
    }
}

/// Slugs are lowercase ASCII letters, digits, `-` and `_`.
pub fn validate_slug(slug: &str) -> DomainResult<String> {
    let slug = require_text("slug", slug, SLUG_MAX)?;
    let valid = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
        return Err(DomainError::validation(
            "slug may only contain lowercase letters, digits, '-' and '_'",
        ));
    }
    Ok(slug)
}

fn validate_description(description: Option<String>) -> DomainResult<Option<String>> {
    match description {
        None => Ok(None),
        Some(d) if d.trim().is_empty() => Ok(None),
        Some(d) => require_text("description", &d, DESCRIPTION_MAX).map(Some),
    }
}

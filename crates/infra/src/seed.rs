//! First-start data: default sectors and an optional administrator.

use autohub_auth::{hash_password_blocking, StoreError};
use autohub_core::{NewSector, NewUser, Role};

use crate::config::BootstrapAdmin;
use crate::directory::Directory;

const DEFAULT_SECTORS: [(&str, &str, &str); 5] = [
    ("Recursos Humanos", "rh", "Setor de Recursos Humanos"),
    ("Tecnologia da Informação", "ti", "Setor de TI"),
    ("Financeiro", "financeiro", "Setor Financeiro"),
    ("Marketing", "marketing", "Setor de Marketing"),
    ("Operações", "operacoes", "Setor de Operações"),
];

/// Sector the bootstrap administrator is placed in.
const ADMIN_SECTOR_SLUG: &str = "ti";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub sectors_created: usize,
    pub admin_created: bool,
}

/// Seed an empty directory. Each step only runs when its collection is empty,
/// so calling this on every start is safe.
pub async fn bootstrap(directory: &dyn Directory, admin: Option<&BootstrapAdmin>) -> Result<BootstrapReport, StoreError> {
    let mut report = BootstrapReport::default();

    let mut sectors = directory.list_sectors().await?;
    if sectors.is_empty() {
        for (name, slug, description) in DEFAULT_SECTORS {
            let sector = directory
                .create_sector(NewSector {
                    name: name.to_string(),
                    slug: slug.to_string(),
                    description: Some(description.to_string()),
                })
                .await?;
            sectors.push(sector);
            report.sectors_created += 1;
        }
        tracing::info!(count = report.sectors_created, "seeded default sectors");
    }

    let Some(admin) = admin else {
        return Ok(report);
    };
    if directory.counts().await?.total_users > 0 {
        return Ok(report);
    }

    let Some(home) = sectors
        .iter()
        .find(|s| s.slug == ADMIN_SECTOR_SLUG)
        .or_else(|| sectors.first())
    else {
        return Err(StoreError::Validation("no sector available for the bootstrap admin".to_string()));
    };

    let password_hash = hash_password_blocking(admin.password.clone())
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

    let user = directory
        .create_user(NewUser {
            email: admin.email.clone(),
            password_hash,
            full_name: "Administrador".to_string(),
            role: Role::Admin,
            is_admin: true,
            sector_id: home.id,
            preferences: None,
        })
        .await?;
    tracing::warn!(principal_id = %user.id, email = %user.email, "bootstrap admin created; change its password");
    report.admin_created = true;

    Ok(report)
}

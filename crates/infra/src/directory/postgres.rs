//! Postgres-backed directory.
//!
//! Grant relations live in two join tables (`automation_sectors`,
//! `automation_users`) with `ON DELETE CASCADE` on both sides, so removing a
//! sector, a user or an automation drops its grants in the same statement.
//! `users.sector_id` is `ON DELETE RESTRICT`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate email, sector name or slug |
//! | Database (foreign key violation) | `23503` | `Validation` / `InUse` | Unknown referent; `InUse` when deleting a sector |
//! | Database (other) | Any other | `Backend` | |
//! | Other | N/A | `Backend` | Pool closed, network errors, etc. |
//!
//! Updates run read-modify-write inside a transaction with the row locked
//! (`FOR UPDATE`), so the whitelisted patch is applied to the current row.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use autohub_auth::{AccessRepository, StoreError};
use autohub_core::{
    Automation, AutomationId, AutomationPatch, NewAutomation, NewSector, NewUser, PrincipalId,
    Sector, SectorId, SectorPatch, User, UserPatch,
};

use super::{Directory, DirectoryCounts};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sectors (
    id          UUID PRIMARY KEY,
    name        VARCHAR(100) NOT NULL UNIQUE,
    slug        VARCHAR(50)  NOT NULL UNIQUE,
    description VARCHAR(255),
    created_at  TIMESTAMPTZ  NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    email         VARCHAR(255) NOT NULL UNIQUE,
    password_hash TEXT         NOT NULL,
    full_name     VARCHAR(255) NOT NULL,
    role          VARCHAR(20)  NOT NULL DEFAULT 'user',
    is_admin      BOOLEAN      NOT NULL DEFAULT FALSE,
    is_active     BOOLEAN      NOT NULL DEFAULT TRUE,
    sector_id     UUID         NOT NULL REFERENCES sectors(id) ON DELETE RESTRICT,
    preferences   JSONB        NOT NULL DEFAULT '{}'::jsonb,
    created_at    TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ  NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS users_sector_id_idx ON users (sector_id);

CREATE TABLE IF NOT EXISTS automations (
    id          UUID PRIMARY KEY,
    title       VARCHAR(255) NOT NULL,
    description VARCHAR(500),
    target_url  VARCHAR(500) NOT NULL,
    icon        VARCHAR(100) NOT NULL DEFAULT 'robot',
    is_active   BOOLEAN      NOT NULL DEFAULT TRUE,
    config      JSONB        NOT NULL DEFAULT '{}'::jsonb,
    created_at  TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ  NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS automation_sectors (
    automation_id UUID NOT NULL REFERENCES automations(id) ON DELETE CASCADE,
    sector_id     UUID NOT NULL REFERENCES sectors(id) ON DELETE CASCADE,
    PRIMARY KEY (automation_id, sector_id)
);

CREATE INDEX IF NOT EXISTS automation_sectors_sector_idx ON automation_sectors (sector_id);

CREATE TABLE IF NOT EXISTS automation_users (
    automation_id UUID NOT NULL REFERENCES automations(id) ON DELETE CASCADE,
    user_id       UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (automation_id, user_id)
);

CREATE INDEX IF NOT EXISTS automation_users_user_idx ON automation_users (user_id);
"#;

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, is_admin, is_active, sector_id, preferences, created_at, updated_at";
const AUTOMATION_COLUMNS: &str = "a.id, a.title, a.description, a.target_url, a.icon, a.is_active, a.config, a.created_at, a.updated_at";

/// Postgres-backed [`Directory`].
///
/// `Send + Sync`; all connection handling is delegated to the SQLx pool.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: Arc<PgPool>,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect and make sure the schema exists. Safe to run on every start.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let directory = Self::new(pool);
        directory.migrate().await?;
        Ok(directory)
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self, operation: &str) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool.begin().await.map_err(|e| map_sqlx_error(operation, e))
    }

    /// Attach both grant lists to a batch of automation rows.
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Automation>, StoreError> {
        let mut automations = rows
            .iter()
            .map(automation_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_automation", e))?;
        if automations.is_empty() {
            return Ok(automations);
        }

        let ids: Vec<Uuid> = automations.iter().map(|a| *a.id.as_uuid()).collect();

        let sector_rows = sqlx::query(
            "SELECT automation_id, sector_id FROM automation_sectors WHERE automation_id = ANY($1) ORDER BY sector_id",
        )
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_sector_grants", e))?;

        let user_rows = sqlx::query(
            "SELECT automation_id, user_id FROM automation_users WHERE automation_id = ANY($1) ORDER BY user_id",
        )
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_user_grants", e))?;

        let mut sectors: HashMap<Uuid, Vec<SectorId>> = HashMap::new();
        for row in sector_rows {
            let automation_id: Uuid = row.try_get("automation_id").map_err(|e| map_sqlx_error("decode_grant", e))?;
            let sector_id: Uuid = row.try_get("sector_id").map_err(|e| map_sqlx_error("decode_grant", e))?;
            sectors.entry(automation_id).or_default().push(SectorId::from_uuid(sector_id));
        }

        let mut users: HashMap<Uuid, Vec<PrincipalId>> = HashMap::new();
        for row in user_rows {
            let automation_id: Uuid = row.try_get("automation_id").map_err(|e| map_sqlx_error("decode_grant", e))?;
            let user_id: Uuid = row.try_get("user_id").map_err(|e| map_sqlx_error("decode_grant", e))?;
            users.entry(automation_id).or_default().push(PrincipalId::from_uuid(user_id));
        }

        for automation in &mut automations {
            let key = *automation.id.as_uuid();
            automation.sector_ids = sectors.remove(&key).unwrap_or_default();
            automation.user_ids = users.remove(&key).unwrap_or_default();
        }
        Ok(automations)
    }

    async fn automations_query(&self, operation: &str, sql: &str, bind: Option<Uuid>) -> Result<Vec<Automation>, StoreError> {
        let mut query = sqlx::query(sql);
        if let Some(id) = bind {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        self.hydrate(rows).await
    }
}

#[async_trait]
impl AccessRepository for PostgresDirectory {
    #[instrument(skip(self), err)]
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_principal_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(principal_id = %id), err)]
    async fn find_principal_by_id(&self, id: PrincipalId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_principal_by_id", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(automation_id = %id), err)]
    async fn find_resource_by_id(&self, id: AutomationId) -> Result<Option<Automation>, StoreError> {
        let found = self
            .automations_query(
                "find_resource_by_id",
                &format!("SELECT {AUTOMATION_COLUMNS} FROM automations a WHERE a.id = $1"),
                Some(*id.as_uuid()),
            )
            .await?;
        Ok(found.into_iter().next())
    }

    #[instrument(skip(self), fields(sector_id = %sector_id), err)]
    async fn list_sector_granted_resources(&self, sector_id: SectorId) -> Result<Vec<Automation>, StoreError> {
        self.automations_query(
            "list_sector_granted_resources",
            &format!(
                "SELECT {AUTOMATION_COLUMNS} FROM automations a \
                 JOIN automation_sectors g ON g.automation_id = a.id \
                 WHERE g.sector_id = $1 ORDER BY a.id"
            ),
            Some(*sector_id.as_uuid()),
        )
        .await
    }

    #[instrument(skip(self), fields(principal_id = %principal_id), err)]
    async fn list_direct_granted_resources(&self, principal_id: PrincipalId) -> Result<Vec<Automation>, StoreError> {
        self.automations_query(
            "list_direct_granted_resources",
            &format!(
                "SELECT {AUTOMATION_COLUMNS} FROM automations a \
                 JOIN automation_users g ON g.automation_id = a.id \
                 WHERE g.user_id = $1 ORDER BY a.id"
            ),
            Some(*principal_id.as_uuid()),
        )
        .await
    }

    #[instrument(skip(self), err)]
    async fn list_active_resources(&self) -> Result<Vec<Automation>, StoreError> {
        self.automations_query(
            "list_active_resources",
            &format!("SELECT {AUTOMATION_COLUMNS} FROM automations a WHERE a.is_active ORDER BY a.id"),
            None,
        )
        .await
    }
}

#[async_trait]
impl Directory for PostgresDirectory {
    #[instrument(skip(self), err)]
    async fn list_sectors(&self) -> Result<Vec<Sector>, StoreError> {
        let rows = sqlx::query("SELECT id, name, slug, description, created_at FROM sectors ORDER BY name")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_sectors", e))?;
        rows.iter().map(sector_from_row).collect()
    }

    #[instrument(skip(self), fields(sector_id = %id), err)]
    async fn get_sector(&self, id: SectorId) -> Result<Option<Sector>, StoreError> {
        let row = sqlx::query("SELECT id, name, slug, description, created_at FROM sectors WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_sector", e))?;
        row.as_ref().map(sector_from_row).transpose()
    }

    #[instrument(skip(self, input), err)]
    async fn create_sector(&self, input: NewSector) -> Result<Sector, StoreError> {
        let sector = input.into_sector(SectorId::new(), Utc::now())?;
        sqlx::query("INSERT INTO sectors (id, name, slug, description, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(sector.id.as_uuid())
            .bind(&sector.name)
            .bind(&sector.slug)
            .bind(&sector.description)
            .bind(sector.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_sector", e))?;
        Ok(sector)
    }

    #[instrument(skip(self, patch), fields(sector_id = %id), err)]
    async fn update_sector(&self, id: SectorId, patch: SectorPatch) -> Result<Sector, StoreError> {
        let mut tx = self.begin("update_sector").await?;

        let row = sqlx::query("SELECT id, name, slug, description, created_at FROM sectors WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_sector", e))?
            .ok_or(StoreError::NotFound)?;
        let mut sector = sector_from_row(&row)?;
        patch.apply(&mut sector)?;

        sqlx::query("UPDATE sectors SET name = $2, slug = $3, description = $4 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(&sector.name)
            .bind(&sector.slug)
            .bind(&sector.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_sector", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("update_sector", e))?;
        Ok(sector)
    }

    #[instrument(skip(self), fields(sector_id = %id), err)]
    async fn delete_sector(&self, id: SectorId) -> Result<(), StoreError> {
        let mut tx = self.begin("delete_sector").await?;

        let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE sector_id = $1")
            .bind(id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_sector", e))?;
        if members > 0 {
            return Err(StoreError::InUse(format!("{members} user(s) still belong to this sector")));
        }

        let deleted = sqlx::query("DELETE FROM sectors WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| match map_sqlx_error("delete_sector", e) {
                // A user joined the sector between the count and the delete.
                StoreError::Validation(msg) => StoreError::InUse(msg),
                other => other,
            })?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await.map_err(|e| map_sqlx_error("delete_sector", e))
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, input), err)]
    async fn create_user(&self, input: NewUser) -> Result<User, StoreError> {
        let user = input.into_user(PrincipalId::new(), Utc::now())?;
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.is_admin)
        .bind(user.is_active)
        .bind(user.sector_id.as_uuid())
        .bind(&user.preferences)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;
        Ok(user)
    }

    #[instrument(skip(self, patch), fields(principal_id = %id), err)]
    async fn update_user(&self, id: PrincipalId, patch: UserPatch) -> Result<User, StoreError> {
        let mut tx = self.begin("update_user").await?;

        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?
            .ok_or(StoreError::NotFound)?;
        let mut user = user_from_row(&row)?;
        patch.apply(&mut user, Utc::now())?;

        sqlx::query(
            "UPDATE users SET email = $2, password_hash = $3, full_name = $4, role = $5, is_admin = $6, \
             is_active = $7, sector_id = $8, preferences = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.is_admin)
        .bind(user.is_active)
        .bind(user.sector_id.as_uuid())
        .bind(&user.preferences)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("update_user", e))?;
        Ok(user)
    }

    #[instrument(skip(self), fields(principal_id = %id), err)]
    async fn delete_user(&self, id: PrincipalId) -> Result<(), StoreError> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_automations(&self) -> Result<Vec<Automation>, StoreError> {
        self.automations_query(
            "list_automations",
            &format!("SELECT {AUTOMATION_COLUMNS} FROM automations a ORDER BY a.id"),
            None,
        )
        .await
    }

    #[instrument(skip(self, input), err)]
    async fn create_automation(&self, input: NewAutomation) -> Result<Automation, StoreError> {
        let automation = input.into_automation(AutomationId::new(), Utc::now())?;
        let mut tx = self.begin("create_automation").await?;

        sqlx::query(
            "INSERT INTO automations (id, title, description, target_url, icon, is_active, config, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(automation.id.as_uuid())
        .bind(&automation.title)
        .bind(&automation.description)
        .bind(&automation.target_url)
        .bind(&automation.icon)
        .bind(automation.is_active)
        .bind(&automation.config)
        .bind(automation.created_at)
        .bind(automation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_automation", e))?;

        replace_grants(&mut tx, &automation).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("create_automation", e))?;
        Ok(automation)
    }

    #[instrument(skip(self, patch), fields(automation_id = %id), err)]
    async fn update_automation(&self, id: AutomationId, patch: AutomationPatch) -> Result<Automation, StoreError> {
        let mut tx = self.begin("update_automation").await?;

        let row = sqlx::query(&format!(
            "SELECT {AUTOMATION_COLUMNS} FROM automations a WHERE a.id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_automation", e))?
        .ok_or(StoreError::NotFound)?;

        let mut automation = automation_from_row(&row).map_err(|e| map_sqlx_error("update_automation", e))?;
        automation.sector_ids = load_ids(&mut tx, "SELECT sector_id FROM automation_sectors WHERE automation_id = $1", id)
            .await?
            .into_iter()
            .map(SectorId::from_uuid)
            .collect();
        automation.user_ids = load_ids(&mut tx, "SELECT user_id FROM automation_users WHERE automation_id = $1", id)
            .await?
            .into_iter()
            .map(PrincipalId::from_uuid)
            .collect();

        let grants_changed = patch.sector_ids.is_some() || patch.user_ids.is_some();
        patch.apply(&mut automation, Utc::now())?;

        sqlx::query(
            "UPDATE automations SET title = $2, description = $3, target_url = $4, icon = $5, \
             is_active = $6, config = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(&automation.title)
        .bind(&automation.description)
        .bind(&automation.target_url)
        .bind(&automation.icon)
        .bind(automation.is_active)
        .bind(&automation.config)
        .bind(automation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_automation", e))?;

        if grants_changed {
            replace_grants(&mut tx, &automation).await?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("update_automation", e))?;
        Ok(automation)
    }

    #[instrument(skip(self), fields(automation_id = %id), err)]
    async fn delete_automation(&self, id: AutomationId) -> Result<(), StoreError> {
        let deleted = sqlx::query("DELETE FROM automations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_automation", e))?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn counts(&self) -> Result<DirectoryCounts, StoreError> {
        let row = sqlx::query(
            "SELECT (SELECT COUNT(*) FROM automations) AS automations, \
                    (SELECT COUNT(*) FROM users) AS users, \
                    (SELECT COUNT(*) FROM sectors) AS sectors",
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("counts", e))?;

        let get = |column: &str| -> Result<u64, StoreError> {
            let n: i64 = row.try_get(column).map_err(|e| map_sqlx_error("counts", e))?;
            Ok(n.max(0) as u64)
        };
        Ok(DirectoryCounts {
            total_automations: get("automations")?,
            total_users: get("users")?,
            total_sectors: get("sectors")?,
        })
    }
}

/// Rewrite both grant relations of `automation` to match its id lists.
async fn replace_grants(tx: &mut Transaction<'static, Postgres>, automation: &Automation) -> Result<(), StoreError> {
    let id = automation.id.as_uuid();
    let sector_ids: Vec<Uuid> = automation.sector_ids.iter().map(|s| *s.as_uuid()).collect();
    let user_ids: Vec<Uuid> = automation.user_ids.iter().map(|u| *u.as_uuid()).collect();

    sqlx::query("DELETE FROM automation_sectors WHERE automation_id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("replace_grants", e))?;
    sqlx::query("DELETE FROM automation_users WHERE automation_id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("replace_grants", e))?;

    if !sector_ids.is_empty() {
        sqlx::query(
            "INSERT INTO automation_sectors (automation_id, sector_id) SELECT $1, UNNEST($2::uuid[])",
        )
        .bind(id)
        .bind(&sector_ids)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("replace_grants", e))?;
    }
    if !user_ids.is_empty() {
        sqlx::query("INSERT INTO automation_users (automation_id, user_id) SELECT $1, UNNEST($2::uuid[])")
            .bind(id)
            .bind(&user_ids)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("replace_grants", e))?;
    }
    Ok(())
}

async fn load_ids(tx: &mut Transaction<'static, Postgres>, sql: &str, id: AutomationId) -> Result<Vec<Uuid>, StoreError> {
    let mut ids: Vec<Uuid> = sqlx::query_scalar(sql)
        .bind(id.as_uuid())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("load_grants", e))?;
    ids.sort();
    Ok(ids)
}

fn sector_from_row(row: &PgRow) -> Result<Sector, StoreError> {
    let decode = |e| map_sqlx_error("decode_sector", e);
    Ok(Sector {
        id: SectorId::from_uuid(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        slug: row.try_get("slug").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let decode = |e| map_sqlx_error("decode_user", e);
    let role: String = row.try_get("role").map_err(decode)?;
    Ok(User {
        id: PrincipalId::from_uuid(row.try_get("id").map_err(decode)?),
        email: row.try_get("email").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        full_name: row.try_get("full_name").map_err(decode)?,
        role: role
            .parse()
            .map_err(|e| StoreError::Backend(format!("stored role is invalid: {e}")))?,
        is_admin: row.try_get("is_admin").map_err(decode)?,
        is_active: row.try_get("is_active").map_err(decode)?,
        sector_id: SectorId::from_uuid(row.try_get("sector_id").map_err(decode)?),
        preferences: row.try_get::<JsonValue, _>("preferences").map_err(decode)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(decode)?,
    })
}

/// Grant lists are left empty; see [`PostgresDirectory::hydrate`].
fn automation_from_row(row: &PgRow) -> Result<Automation, sqlx::Error> {
    Ok(Automation {
        id: AutomationId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        target_url: row.try_get("target_url")?,
        icon: row.try_get("icon")?,
        is_active: row.try_get("is_active")?,
        config: row.try_get("config")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        sector_ids: Vec::new(),
        user_ids: Vec::new(),
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(conflict_message(db_err.constraint())),
                Some("23503") => StoreError::Validation(msg),
                _ => {
                    tracing::error!(operation, error = %msg, "database error");
                    StoreError::Backend(msg)
                }
            }
        }
        other => {
            tracing::error!(operation, error = %other, "storage error");
            StoreError::Backend(format!("{operation}: {other}"))
        }
    }
}

fn conflict_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("users_email_key") => "email already registered".to_string(),
        Some("sectors_slug_key") => "sector slug already exists".to_string(),
        Some("sectors_name_key") => "sector name already exists".to_string(),
        Some(other) => format!("unique constraint '{other}' violated"),
        None => "unique constraint violated".to_string(),
    }
}

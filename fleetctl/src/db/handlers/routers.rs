//! Database repository for routers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::routers::{RouterCreateDBRequest, RouterDBResponse, RouterUpdateDBRequest},
    },
    types::{abbrev_uuid, BackupProfileId, RouterGroupId, RouterId, SshKeyId},
};

/// Filter for listing routers
#[derive(Debug, Clone, Default)]
pub struct RouterFilter {
    /// Only routers that are members of this group
    pub group_id: Option<RouterGroupId>,
}

impl RouterFilter {
    pub fn in_group(group_id: RouterGroupId) -> Self {
        Self { group_id: Some(group_id) }
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Router {
    pub id: RouterId,
    pub name: String,
    pub address: String,
    pub username: String,
    pub password: Option<String>,
    pub ssh_key_id: Option<SshKeyId>,
    pub router_type: String,
    pub monitoring: bool,
    pub enabled: bool,
    pub backup_profile_id: Option<BackupProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Router> for RouterDBResponse {
    type Error = DbError;

    fn try_from(router: Router) -> Result<Self> {
        let router_type = router
            .router_type
            .parse()
            .map_err(|e: String| DbError::Other(anyhow::anyhow!("router {}: {e}", router.id)))?;

        Ok(Self {
            id: router.id,
            name: router.name,
            address: router.address,
            username: router.username,
            password: router.password,
            ssh_key_id: router.ssh_key_id,
            router_type,
            monitoring: router.monitoring,
            enabled: router.enabled,
            backup_profile_id: router.backup_profile_id,
            created_at: router.created_at,
            updated_at: router.updated_at,
        })
    }
}

pub struct Routers<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Routers<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Routers<'c> {
    type CreateRequest = RouterCreateDBRequest;
    type UpdateRequest = RouterUpdateDBRequest;
    type Response = RouterDBResponse;
    type Id = RouterId;
    type Filter = RouterFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let router = sqlx::query_as::<_, Router>(
            r#"
            INSERT INTO routers (
                id, name, address, username, password, ssh_key_id,
                router_type, monitoring, enabled, backup_profile_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.address)
        .bind(&request.username)
        .bind(&request.password)
        .bind(request.ssh_key_id)
        .bind(request.router_type.as_str())
        .bind(request.monitoring)
        .bind(request.enabled)
        .bind(request.backup_profile_id)
        .fetch_one(&mut *self.db)
        .await?;

        router.try_into()
    }

    #[instrument(skip(self), fields(router_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let router = sqlx::query_as::<_, Router>("SELECT * FROM routers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        router.map(RouterDBResponse::try_from).transpose()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        let routers = sqlx::query_as::<_, Router>("SELECT * FROM routers WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        routers
            .into_iter()
            .map(|router| Ok::<_, DbError>((router.id, RouterDBResponse::try_from(router)?)))
            .collect()
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let routers = match filter.group_id {
            Some(group_id) => {
                sqlx::query_as::<_, Router>(
                    r#"
                    SELECT r.* FROM routers r
                    JOIN router_group_members m ON m.router_id = r.id
                    WHERE m.group_id = $1
                    ORDER BY r.name
                    "#,
                )
                .bind(group_id)
                .fetch_all(&mut *self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Router>("SELECT * FROM routers ORDER BY name")
                    .fetch_all(&mut *self.db)
                    .await?
            }
        };

        routers.into_iter().map(RouterDBResponse::try_from).collect()
    }

    #[instrument(skip(self), fields(router_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM routers WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(router_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let router = sqlx::query_as::<_, Router>(
            r#"
            UPDATE routers SET
                name = $2,
                address = $3,
                username = $4,
                password = COALESCE($5, password),
                ssh_key_id = $6,
                router_type = $7,
                monitoring = $8,
                enabled = $9,
                backup_profile_id = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.address)
        .bind(&request.username)
        .bind(&request.password)
        .bind(request.ssh_key_id)
        .bind(request.router_type.as_str())
        .bind(request.monitoring)
        .bind(request.enabled)
        .bind(request.backup_profile_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        router.try_into()
    }
}

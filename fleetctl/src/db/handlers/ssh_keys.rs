//! Database repository for SSH keys.

use std::collections::HashMap;

use sqlx::{FromRow, PgConnection};
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::ssh_keys::{SshKeyCreateDBRequest, SshKeyDBResponse, SshKeyUpdateDBRequest},
    },
    types::{abbrev_uuid, SshKeyId},
};

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct SshKey {
    pub id: SshKeyId,
    pub name: String,
    pub public_key: Option<String>,
    pub private_key: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<SshKey> for SshKeyDBResponse {
    fn from(key: SshKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            public_key: key.public_key,
            private_key: key.private_key,
            created_at: key.created_at,
            updated_at: key.updated_at,
        }
    }
}

pub struct SshKeys<'c> {
    db: &'c mut PgConnection,
}

impl<'c> SshKeys<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for SshKeys<'c> {
    type CreateRequest = SshKeyCreateDBRequest;
    type UpdateRequest = SshKeyUpdateDBRequest;
    type Response = SshKeyDBResponse;
    type Id = SshKeyId;
    type Filter = ();

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let key = sqlx::query_as::<_, SshKey>(
            r#"
            INSERT INTO ssh_keys (id, name, public_key, private_key)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.public_key)
        .bind(&request.private_key)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(key.into())
    }

    #[instrument(skip(self), fields(ssh_key_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let key = sqlx::query_as::<_, SshKey>("SELECT * FROM ssh_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(key.map(Into::into))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        let keys = sqlx::query_as::<_, SshKey>("SELECT * FROM ssh_keys WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(keys.into_iter().map(|key| (key.id, key.into())).collect())
    }

    #[instrument(skip(self, _filter), err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let keys = sqlx::query_as::<_, SshKey>("SELECT * FROM ssh_keys ORDER BY name")
            .fetch_all(&mut *self.db)
            .await?;

        Ok(keys.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(ssh_key_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ssh_keys WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(ssh_key_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let key = sqlx::query_as::<_, SshKey>(
            r#"
            UPDATE ssh_keys SET
                name = $2,
                public_key = $3,
                private_key = COALESCE($4, private_key),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.public_key)
        .bind(&request.private_key)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(key.into())
    }
}

//! Database repository for backup profiles.

use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::backup_profiles::{
            BackupProfileCreateDBRequest, BackupProfileDBResponse, BackupProfileUpdateDBRequest, DEFAULT_PROFILE_NAME,
        },
    },
    types::{abbrev_uuid, BackupProfileId, Operation},
};

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct BackupProfile {
    pub id: BackupProfileId,
    pub name: String,
    pub daily_backup: bool,
    pub weekly_backup: bool,
    pub monthly_backup: bool,
    pub daily_retention: i32,
    pub weekly_retention: i32,
    pub monthly_retention: i32,
    pub instant_retention: i32,
    pub weekly_day: String,
    pub monthly_day: i32,
    pub backup_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BackupProfile> for BackupProfileDBResponse {
    type Error = DbError;

    fn try_from(profile: BackupProfile) -> Result<Self> {
        let weekly_day = profile
            .weekly_day
            .parse()
            .map_err(|e: String| DbError::Other(anyhow::anyhow!("backup profile {}: {e}", profile.id)))?;

        Ok(Self {
            id: profile.id,
            name: profile.name,
            daily_backup: profile.daily_backup,
            weekly_backup: profile.weekly_backup,
            monthly_backup: profile.monthly_backup,
            daily_retention: profile.daily_retention,
            weekly_retention: profile.weekly_retention,
            monthly_retention: profile.monthly_retention,
            instant_retention: profile.instant_retention,
            weekly_day,
            monthly_day: profile.monthly_day,
            backup_time: profile.backup_time,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        })
    }
}

pub struct BackupProfiles<'c> {
    db: &'c mut PgConnection,
}

impl<'c> BackupProfiles<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Return the `default` profile, creating it with stock values if it is missing
    #[instrument(skip(self), err)]
    pub async fn get_or_create_default(&mut self) -> Result<BackupProfileDBResponse> {
        sqlx::query("INSERT INTO backup_profiles (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(uuid::Uuid::new_v4())
            .bind(DEFAULT_PROFILE_NAME)
            .execute(&mut *self.db)
            .await?;

        let profile = sqlx::query_as::<_, BackupProfile>("SELECT * FROM backup_profiles WHERE name = $1")
            .bind(DEFAULT_PROFILE_NAME)
            .fetch_one(&mut *self.db)
            .await?;

        profile.try_into()
    }
}

#[async_trait::async_trait]
impl<'c> Repository for BackupProfiles<'c> {
    type CreateRequest = BackupProfileCreateDBRequest;
    type UpdateRequest = BackupProfileUpdateDBRequest;
    type Response = BackupProfileDBResponse;
    type Id = BackupProfileId;
    type Filter = ();

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let profile = sqlx::query_as::<_, BackupProfile>(
            r#"
            INSERT INTO backup_profiles (
                id, name, daily_backup, weekly_backup, monthly_backup,
                daily_retention, weekly_retention, monthly_retention, instant_retention,
                weekly_day, monthly_day, backup_time
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(&request.name)
        .bind(request.daily_backup)
        .bind(request.weekly_backup)
        .bind(request.monthly_backup)
        .bind(request.daily_retention)
        .bind(request.weekly_retention)
        .bind(request.monthly_retention)
        .bind(request.instant_retention)
        .bind(request.weekly_day.as_str())
        .bind(request.monthly_day)
        .bind(request.backup_time)
        .fetch_one(&mut *self.db)
        .await?;

        profile.try_into()
    }

    #[instrument(skip(self), fields(profile_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let profile = sqlx::query_as::<_, BackupProfile>("SELECT * FROM backup_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        profile.map(BackupProfileDBResponse::try_from).transpose()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        let profiles = sqlx::query_as::<_, BackupProfile>("SELECT * FROM backup_profiles WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        profiles
            .into_iter()
            .map(|profile| Ok::<_, DbError>((profile.id, BackupProfileDBResponse::try_from(profile)?)))
            .collect()
    }

    #[instrument(skip(self, _filter), err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let profiles = sqlx::query_as::<_, BackupProfile>("SELECT * FROM backup_profiles ORDER BY name")
            .fetch_all(&mut *self.db)
            .await?;

        profiles.into_iter().map(BackupProfileDBResponse::try_from).collect()
    }

    #[instrument(skip(self), fields(profile_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM backup_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        if name.as_deref() == Some(DEFAULT_PROFILE_NAME) {
            return Err(DbError::ProtectedEntity {
                operation: Operation::Manage,
                reason: "the default profile cannot be deleted".to_string(),
                entity_type: "backup profile".to_string(),
                entity_id: Some(id.to_string()),
            });
        }

        let result = sqlx::query("DELETE FROM backup_profiles WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(profile_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let profile = sqlx::query_as::<_, BackupProfile>(
            r#"
            UPDATE backup_profiles SET
                name = CASE WHEN name = $13 THEN name ELSE $2 END,
                daily_backup = $3,
                weekly_backup = $4,
                monthly_backup = $5,
                daily_retention = $6,
                weekly_retention = $7,
                monthly_retention = $8,
                instant_retention = $9,
                weekly_day = $10,
                monthly_day = $11,
                backup_time = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(request.daily_backup)
        .bind(request.weekly_backup)
        .bind(request.monthly_backup)
        .bind(request.daily_retention)
        .bind(request.weekly_retention)
        .bind(request.monthly_retention)
        .bind(request.instant_retention)
        .bind(request.weekly_day.as_str())
        .bind(request.monthly_day)
        .bind(request.backup_time)
        .bind(DEFAULT_PROFILE_NAME)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        profile.try_into()
    }
}

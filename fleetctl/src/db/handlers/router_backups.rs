//! Database repository for backup tasks.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        models::router_status::{RouterBackupCreateDBRequest, RouterBackupDBResponse},
    },
    types::{abbrev_uuid, RouterBackupId, RouterId},
};

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct RouterBackup {
    pub id: RouterBackupId,
    pub router_id: RouterId,
    pub schedule_time: DateTime<Utc>,
    pub schedule_type: String,
    pub success: bool,
    pub error: bool,
    pub error_message: Option<String>,
    pub finish_time: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<RouterBackup> for RouterBackupDBResponse {
    type Error = DbError;

    fn try_from(backup: RouterBackup) -> Result<Self> {
        let schedule_type = backup
            .schedule_type
            .parse()
            .map_err(|e: String| DbError::Other(anyhow::anyhow!("router backup {}: {e}", backup.id)))?;

        Ok(Self {
            id: backup.id,
            router_id: backup.router_id,
            schedule_time: backup.schedule_time,
            schedule_type,
            success: backup.success,
            error: backup.error,
            error_message: backup.error_message,
            finish_time: backup.finish_time,
            retry_count: backup.retry_count,
            created_at: backup.created_at,
        })
    }
}

pub struct RouterBackups<'c> {
    db: &'c mut PgConnection,
}

impl<'c> RouterBackups<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Queue a new backup task
    #[instrument(skip(self, request), fields(router_id = %abbrev_uuid(&request.router_id), schedule_type = %request.schedule_type), err)]
    pub async fn create(&mut self, request: &RouterBackupCreateDBRequest) -> Result<RouterBackupDBResponse> {
        let backup = sqlx::query_as::<_, RouterBackup>(
            r#"
            INSERT INTO router_backups (id, router_id, schedule_time, schedule_type)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(request.router_id)
        .bind(request.schedule_time)
        .bind(request.schedule_type.as_str())
        .fetch_one(&mut *self.db)
        .await?;

        backup.try_into()
    }

    /// Whether the router has a task that has neither succeeded nor failed
    #[instrument(skip(self), fields(router_id = %abbrev_uuid(&router_id)), err)]
    pub async fn has_pending(&mut self, router_id: RouterId) -> Result<bool> {
        let pending: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM router_backups WHERE router_id = $1 AND NOT success AND NOT error)",
        )
        .bind(router_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(pending)
    }

    /// Backup tasks for a router, newest first
    #[instrument(skip(self), fields(router_id = %abbrev_uuid(&router_id)), err)]
    pub async fn list_for_router(&mut self, router_id: RouterId) -> Result<Vec<RouterBackupDBResponse>> {
        let backups = sqlx::query_as::<_, RouterBackup>(
            "SELECT * FROM router_backups WHERE router_id = $1 ORDER BY created_at DESC",
        )
        .bind(router_id)
        .fetch_all(&mut *self.db)
        .await?;

        backups.into_iter().map(RouterBackupDBResponse::try_from).collect()
    }
}

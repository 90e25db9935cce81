//! Database repository for computed backup schedules.

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::errors::Result,
    types::{abbrev_uuid, RouterId},
};

pub struct BackupSchedules<'c> {
    db: &'c mut PgConnection,
}

impl<'c> BackupSchedules<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Drop the router's schedule so the scheduler recomputes it from the current profile
    #[instrument(skip(self), fields(router_id = %abbrev_uuid(&router_id)), err)]
    pub async fn delete_for_router(&mut self, router_id: RouterId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM backup_schedules WHERE router_id = $1")
            .bind(router_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

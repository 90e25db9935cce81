//! Database repository for per-router monitoring status and the backup lock.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{errors::Result, models::router_status::RouterStatusDBResponse},
    types::{abbrev_uuid, RouterId},
};

pub struct RouterStatuses<'c> {
    db: &'c mut PgConnection,
}

impl<'c> RouterStatuses<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    async fn ensure_row(&mut self, router_id: RouterId) -> Result<()> {
        sqlx::query("INSERT INTO router_status (router_id) VALUES ($1) ON CONFLICT (router_id) DO NOTHING")
            .bind(router_id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// Fetch the status row, creating an offline one if the router has none yet
    #[instrument(skip(self), fields(router_id = %abbrev_uuid(&router_id)), err)]
    pub async fn get_or_create(&mut self, router_id: RouterId) -> Result<RouterStatusDBResponse> {
        self.ensure_row(router_id).await?;

        let status = sqlx::query_as::<_, RouterStatusDBResponse>("SELECT * FROM router_status WHERE router_id = $1")
            .bind(router_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(status)
    }

    /// Like [`Self::get_or_create`], but holds a row lock until the surrounding transaction ends.
    ///
    /// Must be called on a transaction; on a bare connection the lock is released immediately.
    #[instrument(skip(self), fields(router_id = %abbrev_uuid(&router_id)), err)]
    pub async fn lock_for_update(&mut self, router_id: RouterId) -> Result<RouterStatusDBResponse> {
        self.ensure_row(router_id).await?;

        let status =
            sqlx::query_as::<_, RouterStatusDBResponse>("SELECT * FROM router_status WHERE router_id = $1 FOR UPDATE")
                .bind(router_id)
                .fetch_one(&mut *self.db)
                .await?;
        Ok(status)
    }

    /// Set or clear `backup_lock`
    #[instrument(skip(self), fields(router_id = %abbrev_uuid(&router_id)), err)]
    pub async fn set_backup_lock(&mut self, router_id: RouterId, lock: Option<DateTime<Utc>>) -> Result<()> {
        sqlx::query("UPDATE router_status SET backup_lock = $2 WHERE router_id = $1")
            .bind(router_id)
            .bind(lock)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// All status rows, keyed by router
    #[instrument(skip(self), err)]
    pub async fn list_all(&mut self) -> Result<HashMap<RouterId, RouterStatusDBResponse>> {
        let rows = sqlx::query_as::<_, RouterStatusDBResponse>("SELECT * FROM router_status")
            .fetch_all(&mut *self.db)
            .await?;
        Ok(rows.into_iter().map(|s| (s.router_id, s)).collect())
    }

    /// Most recent `last_status_change` across the fleet
    #[instrument(skip(self), err)]
    pub async fn latest_status_change(&mut self) -> Result<Option<DateTime<Utc>>> {
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar("SELECT MAX(last_status_change) FROM router_status")
            .fetch_one(&mut *self.db)
            .await?;
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::create_test_router;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_get_or_create_is_idempotent(pool: PgPool) {
        let router = create_test_router(&pool, "edge-1", None).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = RouterStatuses::new(&mut conn);

        let status = repo.get_or_create(router.id).await.unwrap();
        assert!(!status.status_online);
        assert!(status.backup_lock.is_none());

        repo.get_or_create(router.id).await.unwrap();
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[sqlx::test]
    async fn test_set_and_clear_backup_lock(pool: PgPool) {
        let router = create_test_router(&pool, "edge-1", None).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = RouterStatuses::new(&mut conn);
        repo.get_or_create(router.id).await.unwrap();

        let now = Utc::now();
        repo.set_backup_lock(router.id, Some(now)).await.unwrap();
        let locked = repo.get_or_create(router.id).await.unwrap();
        assert!(locked.backup_lock.is_some());

        repo.set_backup_lock(router.id, None).await.unwrap();
        let unlocked = repo.get_or_create(router.id).await.unwrap();
        assert!(unlocked.backup_lock.is_none());
    }

    #[sqlx::test]
    async fn test_latest_status_change(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        assert!(RouterStatuses::new(&mut conn).latest_status_change().await.unwrap().is_none());
        drop(conn);

        let router = create_test_router(&pool, "edge-1", None).await;
        sqlx::query("INSERT INTO router_status (router_id, last_status_change) VALUES ($1, NOW())")
            .bind(router.id)
            .execute(&pool)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(RouterStatuses::new(&mut conn).latest_status_change().await.unwrap().is_some());
    }
}

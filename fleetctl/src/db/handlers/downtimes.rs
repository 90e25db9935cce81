//! Database repository for recorded router downtime.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{errors::Result, models::router_status::RouterDowntimeDBResponse},
    types::{abbrev_uuid, RouterId},
};

pub struct RouterDowntimes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> RouterDowntimes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Sum of `total_down_time` for intervals starting at or after `since`, 0 when there are none
    #[instrument(skip(self), fields(router_id = %abbrev_uuid(&router_id)), err)]
    pub async fn total_since(&mut self, router_id: RouterId, since: DateTime<Utc>) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_down_time), 0)::BIGINT FROM router_downtime WHERE router_id = $1 AND start_time >= $2",
        )
        .bind(router_id)
        .bind(since)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(total)
    }

    /// All intervals for a router, newest first
    #[instrument(skip(self), fields(router_id = %abbrev_uuid(&router_id)), err)]
    pub async fn list_for_router(&mut self, router_id: RouterId) -> Result<Vec<RouterDowntimeDBResponse>> {
        let rows = sqlx::query_as::<_, RouterDowntimeDBResponse>(
            "SELECT * FROM router_downtime WHERE router_id = $1 ORDER BY start_time DESC",
        )
        .bind(router_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::{create_test_router, insert_downtime};
    use chrono::Duration;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_total_since_only_counts_recent_intervals(pool: PgPool) {
        let router = create_test_router(&pool, "edge-1", None).await;
        let now = Utc::now();

        insert_downtime(&pool, router.id, now - Duration::days(1), 120).await;
        insert_downtime(&pool, router.id, now - Duration::days(2), 30).await;
        insert_downtime(&pool, router.id, now - Duration::days(10), 5000).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = RouterDowntimes::new(&mut conn);

        let total = repo.total_since(router.id, now - Duration::days(7)).await.unwrap();
        assert_eq!(total, 150);

        let rows = repo.list_for_router(router.id).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].total_down_time, 120);
    }

    #[sqlx::test]
    async fn test_total_since_without_rows_is_zero(pool: PgPool) {
        let router = create_test_router(&pool, "edge-1", None).await;
        let mut conn = pool.acquire().await.unwrap();
        let total = RouterDowntimes::new(&mut conn)
            .total_since(router.id, Utc::now() - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(total, 0);
    }
}

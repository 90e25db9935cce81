//! Database repository for the singleton console settings row.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;

const SETTINGS_NAME: &str = "webadmin_settings";

pub struct WebadminSettings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> WebadminSettings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Record that the router configuration changed; workers reload when this moves
    #[instrument(skip(self), err)]
    pub async fn touch_router_config(&mut self) -> Result<DateTime<Utc>> {
        let updated: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO webadmin_settings (name, router_config_last_updated)
            VALUES ($1, NOW())
            ON CONFLICT (name) DO UPDATE
                SET router_config_last_updated = NOW(), updated_at = NOW()
            RETURNING router_config_last_updated
            "#,
        )
        .bind(SETTINGS_NAME)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(updated)
    }

    #[instrument(skip(self), err)]
    pub async fn router_config_last_updated(&mut self) -> Result<Option<DateTime<Utc>>> {
        let updated: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT router_config_last_updated FROM webadmin_settings WHERE name = $1")
                .bind(SETTINGS_NAME)
                .fetch_optional(&mut *self.db)
                .await?;
        Ok(updated.flatten())
    }
}

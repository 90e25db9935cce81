//! Database repository for users.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
    types::{abbrev_uuid, UserId, UserLevel},
};

/// Every read joins the ACL row; users without one report level 0
const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.password_hash, u.auth_source, u.created_at, u.updated_at, u.last_login,
           COALESCE(a.user_level, 0) AS user_level
    FROM users u
    LEFT JOIN user_acl a ON a.user_id = u.id
"#;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: Option<String>,
    pub auth_source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub user_level: i32,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            password_hash: user.password_hash,
            auth_source: user.auth_source,
            user_level: UserLevel(user.user_level),
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login: user.last_login,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get_user_by_username(&mut self, username: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.username = $1"))
            .bind(username)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(Into::into))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn record_login(&mut self, id: UserId) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }
}

async fn upsert_level(conn: &mut PgConnection, user_id: UserId, level: UserLevel) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_acl (user_id, user_level) VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET user_level = EXCLUDED.user_level, updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(level)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = ();

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // Users and their ACL row are written together
        let mut tx = self.db.begin().await?;
        let user_id = uuid::Uuid::new_v4();

        sqlx::query("INSERT INTO users (id, username, password_hash, auth_source) VALUES ($1, $2, $3, $4)")
            .bind(user_id)
            .bind(&request.username)
            .bind(&request.password_hash)
            .bind(&request.auth_source)
            .execute(&mut *tx)
            .await?;

        upsert_level(&mut tx, user_id, request.user_level).await?;

        let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.id = $1"))
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user.into())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(Into::into))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<UserId>) -> Result<HashMap<Self::Id, UserDBResponse>> {
        let users = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.id = ANY($1)"))
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(users.into_iter().map(|u| (u.id, u.into())).collect())
    }

    #[instrument(skip(self, _filter), err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, User>(&format!("{USER_SELECT} ORDER BY u.username"))
            .fetch_all(&mut *self.db)
            .await?;

        Ok(users.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // This update touches multiple tables, so regardless of the connection passed in, we still need a transaction.
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            "UPDATE users SET password_hash = COALESCE($2, password_hash), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&request.password_hash)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        if let Some(level) = request.user_level {
            upsert_level(&mut tx, id, level).await?;
        }

        let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user.into())
    }
}

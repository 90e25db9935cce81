//! Database repository for router groups and their memberships.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::router_groups::{RouterGroupCreateDBRequest, RouterGroupDBResponse, RouterGroupUpdateDBRequest},
    },
    types::{abbrev_uuid, RouterGroupId, RouterId},
};

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct RouterGroup {
    pub id: RouterGroupId,
    pub name: String,
    pub default_group: bool,
    pub internal_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct Membership {
    pub group_id: RouterGroupId,
    pub router_id: RouterId,
}

impl From<(Vec<RouterId>, RouterGroup)> for RouterGroupDBResponse {
    fn from((router_ids, group): (Vec<RouterId>, RouterGroup)) -> Self {
        Self {
            id: group.id,
            name: group.name,
            default_group: group.default_group,
            internal_notes: group.internal_notes,
            router_ids,
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

pub struct RouterGroups<'c> {
    db: &'c mut PgConnection,
}

impl<'c> RouterGroups<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// The group flagged as `default_group`, if any
    #[cfg(test)]
    #[instrument(skip(self), err)]
    pub async fn get_default(&mut self) -> Result<Option<RouterGroupDBResponse>> {
        let group = sqlx::query_as::<_, RouterGroup>("SELECT * FROM router_groups WHERE default_group LIMIT 1")
            .fetch_optional(&mut *self.db)
            .await?;

        match group {
            Some(group) => {
                let mut members = self.memberships(&[group.id]).await?;
                Ok(Some((members.remove(&group.id).unwrap_or_default(), group).into()))
            }
            None => Ok(None),
        }
    }

    async fn memberships(&mut self, group_ids: &[RouterGroupId]) -> Result<HashMap<RouterGroupId, Vec<RouterId>>> {
        let rows = sqlx::query_as::<_, Membership>(
            r#"
            SELECT m.group_id, m.router_id
            FROM router_group_members m
            JOIN routers r ON r.id = m.router_id
            WHERE m.group_id = ANY($1)
            ORDER BY r.name
            "#,
        )
        .bind(group_ids)
        .fetch_all(&mut *self.db)
        .await?;

        let mut members: HashMap<RouterGroupId, Vec<RouterId>> = HashMap::new();
        for row in rows {
            members.entry(row.group_id).or_default().push(row.router_id);
        }
        Ok(members)
    }
}

/// Clear the default flag on every group other than `keep`
async fn clear_other_defaults(conn: &mut PgConnection, keep: RouterGroupId) -> Result<()> {
    sqlx::query("UPDATE router_groups SET default_group = FALSE WHERE default_group AND id <> $1")
        .bind(keep)
        .execute(conn)
        .await?;
    Ok(())
}

async fn replace_members(conn: &mut PgConnection, group_id: RouterGroupId, router_ids: &[RouterId]) -> Result<()> {
    sqlx::query("DELETE FROM router_group_members WHERE group_id = $1")
        .bind(group_id)
        .execute(&mut *conn)
        .await?;

    if !router_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO router_group_members (group_id, router_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(router_ids)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl<'c> Repository for RouterGroups<'c> {
    type CreateRequest = RouterGroupCreateDBRequest;
    type UpdateRequest = RouterGroupUpdateDBRequest;
    type Response = RouterGroupDBResponse;
    type Id = RouterGroupId;
    type Filter = ();

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // Group row, default flag and membership change together
        let mut tx = self.db.begin().await?;
        let id = uuid::Uuid::new_v4();

        if request.default_group {
            clear_other_defaults(&mut tx, id).await?;
        }

        let group = sqlx::query_as::<_, RouterGroup>(
            r#"
            INSERT INTO router_groups (id, name, default_group, internal_notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(request.default_group)
        .bind(&request.internal_notes)
        .fetch_one(&mut *tx)
        .await?;

        replace_members(&mut tx, group.id, &request.router_ids).await?;
        tx.commit().await?;

        let mut members = self.memberships(&[group.id]).await?;
        Ok((members.remove(&group.id).unwrap_or_default(), group).into())
    }

    #[instrument(skip(self), fields(group_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let group = sqlx::query_as::<_, RouterGroup>("SELECT * FROM router_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        match group {
            Some(group) => {
                let mut members = self.memberships(&[group.id]).await?;
                Ok(Some((members.remove(&group.id).unwrap_or_default(), group).into()))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        let groups = sqlx::query_as::<_, RouterGroup>("SELECT * FROM router_groups WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        let mut members = self.memberships(&ids).await?;
        Ok(groups
            .into_iter()
            .map(|group| (group.id, (members.remove(&group.id).unwrap_or_default(), group).into()))
            .collect())
    }

    #[instrument(skip(self, _filter), err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let groups = sqlx::query_as::<_, RouterGroup>("SELECT * FROM router_groups ORDER BY name")
            .fetch_all(&mut *self.db)
            .await?;

        let ids: Vec<RouterGroupId> = groups.iter().map(|g| g.id).collect();
        let mut members = self.memberships(&ids).await?;
        Ok(groups
            .into_iter()
            .map(|group| (members.remove(&group.id).unwrap_or_default(), group).into())
            .collect())
    }

    #[instrument(skip(self), fields(group_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM router_groups WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(group_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        if request.default_group {
            clear_other_defaults(&mut tx, id).await?;
        }

        let group = sqlx::query_as::<_, RouterGroup>(
            r#"
            UPDATE router_groups SET
                name = $2,
                default_group = $3,
                internal_notes = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(request.default_group)
        .bind(&request.internal_notes)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        replace_members(&mut tx, group.id, &request.router_ids).await?;
        tx.commit().await?;

        let mut members = self.memberships(&[group.id]).await?;
        Ok((members.remove(&group.id).unwrap_or_default(), group).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        handlers::Routers,
        models::routers::{RouterCreateDBRequest, RouterType},
    };
    use sqlx::PgPool;

    async fn create_router(pool: &PgPool, name: &str) -> RouterId {
        let mut conn = pool.acquire().await.unwrap();
        Routers::new(&mut conn)
            .create(&RouterCreateDBRequest {
                name: name.to_string(),
                address: "198.51.100.1".to_string(),
                username: "admin".to_string(),
                password: None,
                ssh_key_id: None,
                router_type: RouterType::Monitoring,
                monitoring: true,
                enabled: true,
                backup_profile_id: None,
            })
            .await
            .unwrap()
            .id
    }

    fn group_request(name: &str, default_group: bool, router_ids: Vec<RouterId>) -> RouterGroupCreateDBRequest {
        RouterGroupCreateDBRequest {
            name: name.to_string(),
            default_group,
            internal_notes: None,
            router_ids,
        }
    }

    #[sqlx::test]
    async fn test_create_group_with_members(pool: PgPool) {
        let router_a = create_router(&pool, "a").await;
        let router_b = create_router(&pool, "b").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = RouterGroups::new(&mut conn);
        let group = repo.create(&group_request("core", false, vec![router_b, router_a])).await.unwrap();

        // Members come back ordered by router name
        assert_eq!(group.router_ids, vec![router_a, router_b]);
    }

    #[sqlx::test]
    async fn test_only_one_default_group(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = RouterGroups::new(&mut conn);

        let first = repo.create(&group_request("first", true, vec![])).await.unwrap();
        let second = repo.create(&group_request("second", true, vec![])).await.unwrap();

        let first = repo.get_by_id(first.id).await.unwrap().unwrap();
        assert!(!first.default_group);

        let default = repo.get_default().await.unwrap().unwrap();
        assert_eq!(default.id, second.id);
    }

    #[sqlx::test]
    async fn test_second_default_row_is_not_a_name_conflict(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        RouterGroups::new(&mut conn)
            .create(&group_request("first", true, vec![]))
            .await
            .unwrap();

        // Bypasses the repository, as a concurrent save would
        let err: DbError = sqlx::query("INSERT INTO router_groups (id, name, default_group) VALUES ($1, 'second', TRUE)")
            .bind(uuid::Uuid::new_v4())
            .execute(&mut *conn)
            .await
            .unwrap_err()
            .into();

        assert!(err.is_unique_violation_on("router_groups"));
        assert!(err.is_unique_violation_on_column("router_groups", "default_group"));
        assert!(!err.is_unique_violation_on_column("router_groups", "name"));
    }

    #[sqlx::test]
    async fn test_update_replaces_membership(pool: PgPool) {
        let router_a = create_router(&pool, "a").await;
        let router_b = create_router(&pool, "b").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = RouterGroups::new(&mut conn);
        let group = repo.create(&group_request("core", false, vec![router_a])).await.unwrap();

        let updated = repo
            .update(
                group.id,
                &RouterGroupUpdateDBRequest {
                    name: "core".to_string(),
                    default_group: false,
                    internal_notes: Some("rack 4".to_string()),
                    router_ids: vec![router_b],
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.router_ids, vec![router_b]);
        assert_eq!(updated.internal_notes.as_deref(), Some("rack 4"));
    }
}

//! Router group list and manage pages.

use axum::{
    extract::{Query, State},
    http::Method,
    response::{IntoResponse, Response},
};
use minijinja::context;
use tracing::{info, instrument};

use crate::{
    api::{
        handlers::{render_form, FormPage},
        models::{
            forms::{FieldErrors, FormData},
            router_groups::{RouterGroupForm, RouterGroupListItem},
            routers::ManageQuery,
        },
    },
    auth::permissions::{has_permission, require_permission},
    db::{
        errors::DbError,
        handlers::{Repository, RouterGroups, Routers},
    },
    errors::{Error, Result},
    flash::FlashLevel,
    templates::Page,
    types::{Operation, Resource},
    AppState,
};

pub const ROUTER_GROUP_LIST_PATH: &str = "/router/group/list/";

#[instrument(skip_all)]
pub async fn router_group_list(State(state): State<AppState>, page: Page) -> Result<Response> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let groups: Vec<RouterGroupListItem> = RouterGroups::new(&mut conn)
        .list(&())
        .await?
        .into_iter()
        .map(|group| RouterGroupListItem {
            router_count: group.router_ids.len(),
            group,
        })
        .collect();

    let can_manage = has_permission(&page.user, Resource::RouterGroups, Operation::Manage);
    page.render(
        "router_group_list.html",
        context! {
            page_title => "Router Group List",
            router_group_list => groups,
            can_manage => can_manage,
        },
    )
}

#[instrument(skip_all)]
pub async fn manage_router_group(
    State(state): State<AppState>,
    Query(query): Query<ManageQuery>,
    method: Method,
    page: Page,
    form: FormData,
) -> Result<Response> {
    require_permission(&page.user, Resource::RouterGroups, Operation::Manage)?;
    let id = query.id("Router group")?;

    let mut tx = state.db.begin().await.map_err(DbError::from)?;
    let existing = match id {
        Some(id) => Some(RouterGroups::new(&mut tx).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
            resource: "Router group".to_string(),
            id: id.to_string(),
        })?),
        None => None,
    };

    if let Some(group) = existing.as_ref().filter(|_| query.wants_delete()) {
        if !query.delete_confirmed() {
            return Ok(page
                .message(FlashLevel::Warning, "Router Group not deleted|Invalid confirmation")
                .redirect(ROUTER_GROUP_LIST_PATH)
                .into_response());
        }

        RouterGroups::new(&mut tx).delete(group.id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(group = %group.name, "Router group deleted");
        return Ok(page
            .message(FlashLevel::Success, "Router Group deleted successfully")
            .redirect(ROUTER_GROUP_LIST_PATH)
            .into_response());
    }

    let routers = Routers::new(&mut tx).list(&Default::default()).await?;
    let form_page = FormPage {
        title: "Manage Router Group",
        instance: id,
        list_url: ROUTER_GROUP_LIST_PATH,
        deletable: true,
    };

    if method != Method::POST {
        let group_form = existing.as_ref().map(RouterGroupForm::from).unwrap_or_default();
        let fields = group_form.fields(&routers, &FieldErrors::default());
        return render_form(page, form_page, fields, &FieldErrors::default());
    }

    let group_form = RouterGroupForm::from_form(&form);
    let values = match group_form.validate(&routers) {
        Ok(values) => values,
        Err(errors) => {
            let fields = group_form.fields(&routers, &errors);
            return render_form(page, form_page, fields, &errors);
        }
    };

    let saved = match id {
        Some(id) => RouterGroups::new(&mut tx).update(id, &values.into()).await,
        None => RouterGroups::new(&mut tx).create(&values.into()).await,
    };
    let group = match saved {
        Ok(group) => group,
        Err(e) if e.is_unique_violation_on_column("router_groups", "name") => {
            let mut errors = FieldErrors::default();
            errors.add("name", "Router group with this Name already exists.");
            let fields = group_form.fields(&routers, &errors);
            return render_form(page, form_page, fields, &errors);
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await.map_err(DbError::from)?;

    info!(group = %group.name, members = group.router_ids.len(), "Router group saved");
    Ok(page
        .message(FlashLevel::Success, "Router Group saved successfully")
        .redirect(ROUTER_GROUP_LIST_PATH)
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::{
        db::handlers::{Repository, RouterGroups},
        test::utils::{add_auth_headers, create_test_app, create_test_router, create_test_user},
        types::UserLevel,
    };
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_group_with_members(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::FLEET_MANAGER).await;
        let a = create_test_router(&pool, "edge-1", None).await;
        let b = create_test_router(&pool, "edge-2", None).await;

        let (name, value) = add_auth_headers(&user);
        let response = server
            .post("/router/group/manage/")
            .add_header(name.clone(), value.clone())
            .form(&[
                ("name", "Edge".to_string()),
                ("routers", a.id.to_string()),
                ("routers", b.id.to_string()),
            ])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/router/group/list/");

        let mut conn = pool.acquire().await.unwrap();
        let groups = RouterGroups::new(&mut conn).list(&()).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].router_ids.len(), 2);

        let list = server.get("/router/group/list/").add_header(name, value).await;
        list.assert_status_ok();
        assert!(list.text().contains("Edge"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_new_default_group_replaces_old_one(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::FLEET_MANAGER).await;
        let (name, value) = add_auth_headers(&user);

        for group in ["Core", "Edge"] {
            server
                .post("/router/group/manage/")
                .add_header(name.clone(), value.clone())
                .form(&[("name", group), ("default_group", "on")])
                .await
                .assert_status(StatusCode::SEE_OTHER);
        }

        let mut conn = pool.acquire().await.unwrap();
        let default = RouterGroups::new(&mut conn).get_default().await.unwrap().unwrap();
        assert_eq!(default.name, "Edge");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_router_manager_cannot_manage_groups(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::ROUTER_MANAGER).await;

        let (name, value) = add_auth_headers(&user);
        let response = server
            .post("/router/group/manage/")
            .add_header(name, value)
            .form(&[("name", "Edge")])
            .await;

        response.assert_status_forbidden();
        let mut conn = pool.acquire().await.unwrap();
        assert!(RouterGroups::new(&mut conn).list(&()).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_group_name(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::FLEET_MANAGER).await;
        let (name, value) = add_auth_headers(&user);

        server
            .post("/router/group/manage/")
            .add_header(name.clone(), value.clone())
            .form(&[("name", "Edge")])
            .await;
        let response = server
            .post("/router/group/manage/")
            .add_header(name, value)
            .form(&[("name", "Edge")])
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Router group with this Name already exists."));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_group_keeps_routers(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::FLEET_MANAGER).await;
        let router = create_test_router(&pool, "edge-1", None).await;
        let (name, value) = add_auth_headers(&user);

        server
            .post("/router/group/manage/")
            .add_header(name.clone(), value.clone())
            .form(&[("name", "Edge".to_string()), ("routers", router.id.to_string())])
            .await;
        let mut conn = pool.acquire().await.unwrap();
        let group = RouterGroups::new(&mut conn).list(&()).await.unwrap().remove(0);

        let response = server
            .get(&format!("/router/group/manage/?uuid={}&action=delete&confirmation=delete", group.id))
            .add_header(name, value)
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert!(RouterGroups::new(&mut conn).get_by_id(group.id).await.unwrap().is_none());
        let routers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM routers")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(routers, 1);
    }
}

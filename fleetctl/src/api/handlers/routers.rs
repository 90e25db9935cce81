//! Router list, details, availability and manage pages.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::Method,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use minijinja::context;
use tracing::{info, instrument};

use crate::{
    api::{
        handlers::{render_form, FormPage},
        models::{
            forms::{FieldErrors, FormData},
            routers::{GroupFilter, ManageQuery, RouterChoices, RouterForm, RouterListItem, RouterListQuery, UuidQuery},
        },
    },
    auth::permissions::{has_permission, require_permission},
    availability,
    backup::{self, STALE_LOCK_RELEASED},
    db::{
        errors::DbError,
        handlers::{
            BackupProfiles, BackupSchedules, Repository, RouterBackups, RouterDowntimes, RouterFilter, RouterGroups,
            RouterStatuses, Routers, SshKeys, WebadminSettings,
        },
        models::routers::RouterDBResponse,
    },
    errors::{Error, Result},
    flash::FlashLevel,
    templates::Page,
    types::{abbrev_uuid, Operation, Resource, RouterId},
    AppState,
};

pub const ROUTER_LIST_PATH: &str = "/router/list/";

const DUPLICATE_NAME: &str = "Router with this Name already exists.";

fn router_not_found(id: RouterId) -> Error {
    Error::NotFound {
        resource: "Router".to_string(),
        id: id.to_string(),
    }
}

async fn load_router(conn: &mut sqlx::PgConnection, id: RouterId) -> Result<RouterDBResponse> {
    Routers::new(conn).get_by_id(id).await?.ok_or_else(|| router_not_found(id))
}

#[instrument(skip_all)]
pub async fn router_list(State(state): State<AppState>, Query(query): Query<RouterListQuery>, page: Page) -> Result<Response> {
    let filter = query.group_filter()?;
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    BackupProfiles::new(&mut conn).get_or_create_default().await?;
    let profile_names: HashMap<_, _> = BackupProfiles::new(&mut conn)
        .list(&())
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let groups = RouterGroups::new(&mut conn).list(&()).await?;
    let (router_filter, selected_group) = match filter {
        GroupFilter::All => (RouterFilter::default(), Some("all".to_string())),
        GroupFilter::Unset => {
            let default_group = groups.iter().find(|g| g.default_group).map(|g| g.id.to_string());
            (RouterFilter::default(), default_group)
        }
        GroupFilter::Group(id) => {
            if !groups.iter().any(|g| g.id == id) {
                return Err(Error::NotFound {
                    resource: "Router group".to_string(),
                    id: id.to_string(),
                });
            }
            (RouterFilter::in_group(id), Some(id.to_string()))
        }
    };

    let routers = Routers::new(&mut conn).list(&router_filter).await?;
    let statuses = RouterStatuses::new(&mut conn).list_all().await?;
    let last_status_change = RouterStatuses::new(&mut conn)
        .latest_status_change()
        .await?
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "0".to_string());

    let items: Vec<RouterListItem> = routers
        .into_iter()
        .map(|router| {
            let status = statuses.get(&router.id);
            RouterListItem {
                router_type_label: router.router_type.label(),
                status_online: status.map(|s| s.status_online),
                backup_lock: status.is_some_and(|s| s.backup_lock.is_some()),
                backup_profile_name: router.backup_profile_id.and_then(|id| profile_names.get(&id).cloned()),
                router,
            }
        })
        .collect();

    let can_backup = has_permission(&page.user, Resource::Backups, Operation::Backup);
    let can_manage = has_permission(&page.user, Resource::Routers, Operation::Manage);
    page.render(
        "router_list.html",
        context! {
            page_title => "Router List",
            routers => items,
            groups => groups,
            selected_group => selected_group,
            last_status_change => last_status_change,
            can_backup => can_backup,
            can_manage => can_manage,
        },
    )
}

#[instrument(skip_all)]
pub async fn router_details(State(state): State<AppState>, Query(query): Query<UuidQuery>, page: Page) -> Result<Response> {
    let id = query.required_id("Router")?;
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let router = load_router(&mut conn, id).await?;

    let page = if backup::release_stale_lock(&mut conn, id).await? {
        page.message(FlashLevel::Warning, STALE_LOCK_RELEASED)
    } else {
        page
    };

    let status = RouterStatuses::new(&mut conn).get_or_create(id).await?;
    let backups = RouterBackups::new(&mut conn).list_for_router(id).await?;
    let availability = availability::for_router(&mut conn, id, Utc::now()).await?;
    let backup_profile = match router.backup_profile_id {
        Some(profile_id) => BackupProfiles::new(&mut conn).get_by_id(profile_id).await?,
        None => None,
    };

    let can_backup = has_permission(&page.user, Resource::Backups, Operation::Backup);
    let can_manage = has_permission(&page.user, Resource::Routers, Operation::Manage);
    page.render(
        "router_details.html",
        context! {
            page_title => "Router Details",
            router_type_label => router.router_type.label(),
            router => router,
            router_status => status,
            backups => backups,
            backup_profile => backup_profile,
            offline_time_last_week => availability.downtime_seconds,
            last_week_availability => availability.percent,
            can_backup => can_backup,
            can_manage => can_manage,
        },
    )
}

#[instrument(skip_all)]
pub async fn router_availability(State(state): State<AppState>, Query(query): Query<UuidQuery>, page: Page) -> Result<Response> {
    let id = query.required_id("Router")?;
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let router = load_router(&mut conn, id).await?;
    let downtimes = RouterDowntimes::new(&mut conn).list_for_router(id).await?;
    let availability = availability::for_router(&mut conn, id, Utc::now()).await?;

    page.render(
        "router_availability.html",
        context! {
            page_title => "Router Availability",
            router => router,
            downtimes => downtimes,
            offline_time_last_week => availability.downtime_seconds,
            last_week_availability => availability.percent,
        },
    )
}

#[instrument(skip_all)]
pub async fn manage_router(
    State(state): State<AppState>,
    Query(query): Query<ManageQuery>,
    method: Method,
    page: Page,
    form: FormData,
) -> Result<Response> {
    require_permission(&page.user, Resource::Routers, Operation::Manage)?;
    let id = query.id("Router")?;

    let mut tx = state.db.begin().await.map_err(DbError::from)?;
    let existing = match id {
        Some(id) => Some(load_router(&mut tx, id).await?),
        None => None,
    };

    if let Some(router) = existing.as_ref().filter(|_| query.wants_delete()) {
        if !query.delete_confirmed() {
            return Ok(page
                .message(FlashLevel::Warning, "Router not deleted|Invalid confirmation")
                .redirect(ROUTER_LIST_PATH)
                .into_response());
        }

        Routers::new(&mut tx).delete(router.id).await?;
        WebadminSettings::new(&mut tx).touch_router_config().await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(router = %router.name, "Router deleted");
        return Ok(page
            .message(FlashLevel::Success, "Router deleted successfully")
            .redirect(ROUTER_LIST_PATH)
            .into_response());
    }

    let ssh_keys = SshKeys::new(&mut tx).list(&()).await?;
    let backup_profiles = BackupProfiles::new(&mut tx).list(&()).await?;
    let choices = RouterChoices {
        ssh_keys: &ssh_keys,
        backup_profiles: &backup_profiles,
    };
    let form_page = FormPage {
        title: "Manage Router",
        instance: id,
        list_url: ROUTER_LIST_PATH,
        deletable: true,
    };

    if method != Method::POST {
        let router_form = existing.as_ref().map(RouterForm::from).unwrap_or_else(RouterForm::blank);
        let fields = router_form.fields(&choices, &FieldErrors::default());
        return render_form(page, form_page, fields, &FieldErrors::default());
    }

    let router_form = RouterForm::from_form(&form);
    let values = match router_form.validate(&choices, existing.as_ref()) {
        Ok(values) => values,
        Err(errors) => {
            let fields = router_form.fields(&choices, &errors);
            return render_form(page, form_page, fields, &errors);
        }
    };

    let saved = match id {
        Some(id) => Routers::new(&mut tx).update(id, &values.into()).await,
        None => Routers::new(&mut tx).create(&values.into()).await,
    };
    let router = match saved {
        Ok(router) => router,
        Err(e) if e.is_unique_violation_on_column("routers", "name") => {
            let mut errors = FieldErrors::default();
            errors.add("name", DUPLICATE_NAME);
            let fields = router_form.fields(&choices, &errors);
            return render_form(page, form_page, fields, &errors);
        }
        Err(e) => return Err(e.into()),
    };

    RouterStatuses::new(&mut tx).get_or_create(router.id).await?;
    BackupSchedules::new(&mut tx).delete_for_router(router.id).await?;
    WebadminSettings::new(&mut tx).touch_router_config().await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(router = %router.name, router_id = %abbrev_uuid(&router.id), "Router saved");
    Ok(page
        .message(
            FlashLevel::Success,
            "Router saved successfully|It may take a few minutes until monitoring starts for this router.",
        )
        .redirect(ROUTER_LIST_PATH)
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::{
        db::handlers::{RouterGroups, Repository, Routers, WebadminSettings},
        db::models::router_groups::RouterGroupCreateDBRequest,
        test::utils::{
            add_auth_headers, backup_lock, create_backup_ready_router, create_test_app, create_test_router,
            create_test_user, insert_downtime,
        },
        types::UserLevel,
    };
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_requires_login(pool: PgPool) {
        let (server, _) = create_test_app(pool).await;

        let response = server.get("/router/list/").await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/accounts/login/?next=%2Frouter%2Flist%2F");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_shows_routers_and_preselects_default_group(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::VIEW_ONLY).await;
        let edge = create_test_router(&pool, "edge-1", None).await;
        create_test_router(&pool, "core-1", None).await;

        let mut conn = pool.acquire().await.unwrap();
        let group = RouterGroups::new(&mut conn)
            .create(&RouterGroupCreateDBRequest {
                name: "Edge".to_string(),
                default_group: true,
                internal_notes: None,
                router_ids: vec![edge.id],
            })
            .await
            .unwrap();

        let (name, value) = add_auth_headers(&user);
        let response = server.get("/router/list/").add_header(name, value).await;

        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("edge-1"));
        assert!(html.contains("core-1"));
        assert!(html.contains(&format!("value=\"{}\" selected", group.id)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_by_group(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::VIEW_ONLY).await;
        let edge = create_test_router(&pool, "edge-1", None).await;
        create_test_router(&pool, "core-1", None).await;

        let mut conn = pool.acquire().await.unwrap();
        let group = RouterGroups::new(&mut conn)
            .create(&RouterGroupCreateDBRequest {
                name: "Edge".to_string(),
                default_group: false,
                internal_notes: None,
                router_ids: vec![edge.id],
            })
            .await
            .unwrap();

        let (name, value) = add_auth_headers(&user);
        let response = server
            .get(&format!("/router/list/?filter_group={}", group.id))
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("edge-1"));
        assert!(!html.contains("core-1"));

        let response = server
            .get(&format!("/router/list/?filter_group={}", uuid::Uuid::new_v4()))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_details_shows_availability(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::VIEW_ONLY).await;
        let router = create_test_router(&pool, "edge-1", None).await;
        insert_downtime(&pool, router.id, Utc::now() - Duration::hours(3), 3_600).await;

        let (name, value) = add_auth_headers(&user);
        let response = server
            .get(&format!("/router/details/?uuid={}", router.id))
            .add_header(name, value)
            .await;

        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("99.405"));
        assert!(html.contains("3600"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_details_unknown_or_malformed_uuid_is_404(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::VIEW_ONLY).await;
        let (name, value) = add_auth_headers(&user);

        let response = server
            .get(&format!("/router/details/?uuid={}", uuid::Uuid::new_v4()))
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let response = server.get("/router/details/?uuid=not-a-uuid").add_header(name, value).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_details_releases_stale_lock(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::VIEW_ONLY).await;
        let router = create_backup_ready_router(&pool, "edge-1").await;

        sqlx::query("INSERT INTO router_status (router_id, backup_lock) VALUES ($1, NOW())")
            .bind(router.id)
            .execute(&pool)
            .await
            .unwrap();

        let (name, value) = add_auth_headers(&user);
        let response = server
            .get(&format!("/router/details/?uuid={}", router.id))
            .add_header(name, value)
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Backup lock removed"));
        assert!(backup_lock(&pool, router.id).await.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_availability_page_lists_downtime(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::VIEW_ONLY).await;
        let router = create_test_router(&pool, "edge-1", None).await;
        insert_downtime(&pool, router.id, Utc::now() - Duration::days(1), 125).await;

        let (name, value) = add_auth_headers(&user);
        let response = server
            .get(&format!("/router/availability/?uuid={}", router.id))
            .add_header(name, value)
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("125"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_manage_requires_router_manager(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::BACKUP_OPERATOR).await;

        let (name, value) = add_auth_headers(&user);
        let response = server.get("/router/manage/").add_header(name, value).await;

        response.assert_status_forbidden();
        assert!(response.text().contains("Access Denied"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_router(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::ROUTER_MANAGER).await;

        let (name, value) = add_auth_headers(&user);
        let response = server
            .post("/router/manage/")
            .add_header(name, value)
            .form(&[
                ("name", "edge-9"),
                ("address", "10.9.9.9"),
                ("username", "admin"),
                ("password", "s3cret"),
                ("router_type", "routeros"),
                ("enabled", "on"),
            ])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/router/list/");

        let mut conn = pool.acquire().await.unwrap();
        let routers = Routers::new(&mut conn).list(&Default::default()).await.unwrap();
        assert_eq!(routers.len(), 1);
        assert_eq!(routers[0].name, "edge-9");

        let status: Option<bool> = sqlx::query_scalar("SELECT status_online FROM router_status WHERE router_id = $1")
            .bind(routers[0].id)
            .fetch_optional(&pool)
            .await
            .unwrap();
        assert_eq!(status, Some(false));
        assert!(WebadminSettings::new(&mut conn).router_config_last_updated().await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_invalid_form_rerenders_with_errors(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::ROUTER_MANAGER).await;

        let (name, value) = add_auth_headers(&user);
        let response = server
            .post("/router/manage/")
            .add_header(name, value)
            .form(&[("name", ""), ("address", "10.0.0.1"), ("router_type", "openwrt")])
            .await;

        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("This field is required."));
        assert!(html.contains("You must provide a password or an SSH key."));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_name_is_a_field_error(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::ROUTER_MANAGER).await;
        create_test_router(&pool, "edge-1", None).await;

        let (name, value) = add_auth_headers(&user);
        let response = server
            .post("/router/manage/")
            .add_header(name, value)
            .form(&[
                ("name", "edge-1"),
                ("address", "10.0.0.2"),
                ("router_type", "monitoring"),
                ("monitoring", "on"),
            ])
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Router with this Name already exists."));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_needs_confirmation(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::ROUTER_MANAGER).await;
        let router = create_test_router(&pool, "edge-1", None).await;
        let (name, value) = add_auth_headers(&user);

        let response = server
            .get(&format!("/router/manage/?uuid={}&action=delete&confirmation=nope", router.id))
            .add_header(name.clone(), value.clone())
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let mut conn = pool.acquire().await.unwrap();
        assert!(Routers::new(&mut conn).get_by_id(router.id).await.unwrap().is_some());

        let response = server
            .get(&format!("/router/manage/?uuid={}&action=delete&confirmation=delete", router.id))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert!(Routers::new(&mut conn).get_by_id(router.id).await.unwrap().is_none());
    }
}

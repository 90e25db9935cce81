//! Backup profile list and manage pages.
//!
//! The `default` profile always exists: the list page recreates it if missing, it cannot be
//! deleted and its name is kept when it is edited.

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
            backup_profiles::BackupProfileForm,
            forms::{FieldErrors, FormData},
            routers::ManageQuery,
        },
    },
    auth::permissions::{has_permission, require_permission},
    db::{
        errors::DbError,
        handlers::{BackupProfiles, Repository},
        models::backup_profiles::DEFAULT_PROFILE_NAME,
    },
    errors::{Error, Result},
    flash::FlashLevel,
    templates::Page,
    types::{Operation, Resource},
    AppState,
};

pub const BACKUP_PROFILE_LIST_PATH: &str = "/backup/profile/list/";

#[instrument(skip_all)]
pub async fn backup_profile_list(State(state): State<AppState>, page: Page) -> Result<Response> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    BackupProfiles::new(&mut conn).get_or_create_default().await?;
    let profiles = BackupProfiles::new(&mut conn).list(&()).await?;

    let can_manage = has_permission(&page.user, Resource::BackupProfiles, Operation::Manage);
    page.render(
        "backup_profile_list.html",
        context! {
            page_title => "Backup Profile List",
            backup_profile_list => profiles,
            can_manage => can_manage,
        },
    )
}

#[instrument(skip_all)]
pub async fn manage_backup_profile(
    State(state): State<AppState>,
    Query(query): Query<ManageQuery>,
    method: Method,
    page: Page,
    form: FormData,
) -> Result<Response> {
    require_permission(&page.user, Resource::BackupProfiles, Operation::Manage)?;
    let id = query.id("Backup profile")?;

    let mut tx = state.db.begin().await.map_err(DbError::from)?;
    let existing = match id {
        Some(id) => Some(BackupProfiles::new(&mut tx).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
            resource: "Backup profile".to_string(),
            id: id.to_string(),
        })?),
        None => None,
    };

    if let Some(profile) = existing.as_ref().filter(|_| query.wants_delete()) {
        if !query.delete_confirmed() {
            return Ok(page
                .message(FlashLevel::Warning, "Backup Profile not deleted|Invalid confirmation")
                .redirect(BACKUP_PROFILE_LIST_PATH)
                .into_response());
        }

        match BackupProfiles::new(&mut tx).delete(profile.id).await {
            Ok(_) => {}
            Err(DbError::ProtectedEntity { .. }) => {
                return Ok(page
                    .message(
                        FlashLevel::Warning,
                        "Backup Profile not deleted|The default profile cannot be deleted",
                    )
                    .redirect(BACKUP_PROFILE_LIST_PATH)
                    .into_response());
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(profile = %profile.name, "Backup profile deleted");
        return Ok(page
            .message(FlashLevel::Success, "Backup Profile deleted successfully")
            .redirect(BACKUP_PROFILE_LIST_PATH)
            .into_response());
    }

    let locked_name = existing.as_ref().is_some_and(|p| p.is_default());
    let form_page = FormPage {
        title: "Manage Backup Profile",
        instance: id,
        list_url: BACKUP_PROFILE_LIST_PATH,
        deletable: !locked_name,
    };

    if method != Method::POST {
        let profile_form = existing.as_ref().map(BackupProfileForm::from).unwrap_or_default();
        let fields = profile_form.fields(locked_name, &FieldErrors::default());
        return render_form(page, form_page, fields, &FieldErrors::default());
    }

    let mut profile_form = BackupProfileForm::from_form(&form);
    if locked_name {
        profile_form.name = DEFAULT_PROFILE_NAME.to_string();
    }
    let values = match profile_form.validate() {
        Ok(values) => values,
        Err(errors) => {
            let fields = profile_form.fields(locked_name, &errors);
            return render_form(page, form_page, fields, &errors);
        }
    };

    let saved = match id {
        Some(id) => BackupProfiles::new(&mut tx).update(id, &values).await,
        None => BackupProfiles::new(&mut tx).create(&values).await,
    };
    let profile = match saved {
        Ok(profile) => profile,
        Err(e) if e.is_unique_violation_on_column("backup_profiles", "name") => {
            let mut errors = FieldErrors::default();
            errors.add("name", "Backup profile with this Name already exists.");
            let fields = profile_form.fields(locked_name, &errors);
            return render_form(page, form_page, fields, &errors);
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await.map_err(DbError::from)?;

    info!(profile = %profile.name, "Backup profile saved");
    Ok(page
        .message(FlashLevel::Success, "Backup Profile saved successfully")
        .redirect(BACKUP_PROFILE_LIST_PATH)
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::{
        db::{
            handlers::{BackupProfiles, Repository},
            models::backup_profiles::WeekDay,
        },
        test::utils::{add_auth_headers, create_test_app, create_test_user},
        types::UserLevel,
    };
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_shows_default_profile(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::VIEW_ONLY).await;

        let (name, value) = add_auth_headers(&user);
        let response = server.get("/backup/profile/list/").add_header(name, value).await;

        response.assert_status_ok();
        assert!(response.text().contains("default"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_default_profile_cannot_be_deleted(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::FLEET_MANAGER).await;
        let mut conn = pool.acquire().await.unwrap();
        let default = BackupProfiles::new(&mut conn).get_or_create_default().await.unwrap();

        let (name, value) = add_auth_headers(&user);
        let response = server
            .get(&format!("/backup/profile/manage/?uuid={}&action=delete&confirmation=delete", default.id))
            .add_header(name, value)
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert!(BackupProfiles::new(&mut conn).get_by_id(default.id).await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_default_profile_keeps_its_name(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::FLEET_MANAGER).await;
        let mut conn = pool.acquire().await.unwrap();
        let default = BackupProfiles::new(&mut conn).get_or_create_default().await.unwrap();

        let (name, value) = add_auth_headers(&user);
        server
            .post(&format!("/backup/profile/manage/?uuid={}", default.id))
            .add_header(name, value)
            .form(&[
                ("name", "renamed"),
                ("daily_backup", "on"),
                ("daily_retention", "14"),
                ("weekly_retention", "30"),
                ("monthly_retention", "365"),
                ("instant_retention", "7"),
                ("weekly_day", "monday"),
                ("monthly_day", "1"),
                ("backup_time", "03:30"),
            ])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let profile = BackupProfiles::new(&mut conn).get_by_id(default.id).await.unwrap().unwrap();
        assert_eq!(profile.name, "default");
        assert_eq!(profile.daily_retention, 14);
        assert_eq!(profile.weekly_day, WeekDay::Monday);
        assert!(!profile.weekly_backup);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_delete_profile(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::FLEET_MANAGER).await;
        let (name, value) = add_auth_headers(&user);

        server
            .post("/backup/profile/manage/")
            .add_header(name.clone(), value.clone())
            .form(&[
                ("name", "nightly"),
                ("daily_retention", "7"),
                ("weekly_retention", "30"),
                ("monthly_retention", "365"),
                ("instant_retention", "7"),
                ("monthly_day", "1"),
                ("backup_time", "02:00"),
            ])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let mut conn = pool.acquire().await.unwrap();
        let profile = BackupProfiles::new(&mut conn)
            .list(&())
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.name == "nightly")
            .unwrap();
        assert_eq!(profile.weekly_day, WeekDay::Sunday);

        server
            .get(&format!("/backup/profile/manage/?uuid={}&action=delete&confirmation=delete", profile.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::SEE_OTHER);
        assert!(BackupProfiles::new(&mut conn).get_by_id(profile.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_invalid_monthly_day_rerenders(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, UserLevel::FLEET_MANAGER).await;

        let (name, value) = add_auth_headers(&user);
        let response = server
            .post("/backup/profile/manage/")
            .add_header(name, value)
            .form(&[
                ("name", "broken"),
                ("daily_retention", "7"),
                ("weekly_retention", "30"),
                ("monthly_retention", "365"),
                ("instant_retention", "7"),
                ("monthly_day", "31"),
                ("backup_time", "02:00"),
            ])
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Enter a whole number between 1 and 28."));
    }
}

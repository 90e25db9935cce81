pub mod utils;

use crate::create_initial_admin_user;
use crate::{
    auth::password,
    db::handlers::{BackupProfiles, Repository, Users},
    types::UserLevel,
};
use axum::http::StatusCode;
use sqlx::PgPool;
use utils::{add_auth_headers, create_backup_ready_router, create_test_app, create_test_config, create_test_user};

#[sqlx::test]
#[test_log::test]
async fn test_healthz(pool: PgPool) {
    let (server, _) = create_test_app(pool).await;

    let response = server.get("/healthz").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}

#[sqlx::test]
#[test_log::test]
async fn test_root_redirects_to_router_list(pool: PgPool) {
    let (server, _) = create_test_app(pool).await;

    let response = server.get("/").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/router/list/");
}

/// Startup seeds the administrator and the default backup profile
#[sqlx::test]
#[test_log::test]
async fn test_database_seeding_behavior(pool: PgPool) {
    let (_server, state) = create_test_app(pool.clone()).await;

    let mut conn = pool.acquire().await.unwrap();
    let admin = Users::new(&mut conn)
        .get_user_by_username(&state.config.admin_username)
        .await
        .unwrap()
        .expect("admin should exist");
    assert_eq!(admin.user_level, UserLevel::ADMINISTRATOR);
    assert_eq!(admin.auth_source, "system");

    let profiles = BackupProfiles::new(&mut conn).list(&()).await.unwrap();
    assert_eq!(profiles.iter().filter(|p| p.is_default()).count(), 1);

    // A second start on the same database keeps a single default profile and admin
    drop(conn);
    let _second = create_test_app(pool.clone()).await;
    let mut conn = pool.acquire().await.unwrap();
    let profiles = BackupProfiles::new(&mut conn).list(&()).await.unwrap();
    assert_eq!(profiles.iter().filter(|p| p.is_default()).count(), 1);
    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = $1")
        .bind(&state.config.admin_username)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(admins, 1);
}

#[sqlx::test]
#[test_log::test]
async fn test_create_initial_admin_user_new_user(pool: PgPool) {
    let config = create_test_config();

    let user_id = create_initial_admin_user("root", Some("hunter2hunter2"), &config, &pool)
        .await
        .expect("Should create admin user successfully");

    let mut conn = pool.acquire().await.unwrap();
    let user = Users::new(&mut conn)
        .get_user_by_username("root")
        .await
        .unwrap()
        .expect("User should exist");

    assert_eq!(user.id, user_id);
    assert_eq!(user.user_level, UserLevel::ADMINISTRATOR);
    let hash = user.password_hash.expect("password should be set");
    assert!(password::verify_string("hunter2hunter2", &hash).unwrap());
}

#[sqlx::test]
#[test_log::test]
async fn test_create_initial_admin_user_existing_user(pool: PgPool) {
    let config = create_test_config();
    let existing = create_test_user(&pool, UserLevel::VIEW_ONLY).await;

    let returned = create_initial_admin_user(&existing.username, None, &config, &pool)
        .await
        .expect("Should handle existing user successfully");
    assert_eq!(returned, existing.id);

    let mut conn = pool.acquire().await.unwrap();
    let user = Users::new(&mut conn).get_by_id(existing.id).await.unwrap().unwrap();
    assert_eq!(user.user_level, UserLevel::ADMINISTRATOR);
    assert_eq!(user.password_hash, None);
}

/// Manage pages open at exactly the level that owns them
#[sqlx::test]
#[test_log::test]
async fn test_manage_page_levels(pool: PgPool) {
    let (server, _) = create_test_app(pool.clone()).await;

    let pages = [
        ("/router/manage/", UserLevel::ROUTER_MANAGER),
        ("/router/group/manage/", UserLevel::FLEET_MANAGER),
        ("/router/ssh_keys/manage/", UserLevel::FLEET_MANAGER),
        ("/backup/profile/manage/", UserLevel::FLEET_MANAGER),
    ];
    let levels = [
        UserLevel::VIEW_ONLY,
        UserLevel::BACKUP_OPERATOR,
        UserLevel::ROUTER_MANAGER,
        UserLevel::FLEET_MANAGER,
        UserLevel::ADMINISTRATOR,
    ];

    for level in levels {
        let user = create_test_user(&pool, level).await;
        let (name, value) = add_auth_headers(&user);

        for (path, required) in pages {
            let response = server.get(path).add_header(name.clone(), value.clone()).await;
            if level >= required {
                response.assert_status_ok();
            } else {
                response.assert_status_forbidden();
                assert!(response.text().contains("Access Denied"));
            }
        }
    }
}

/// Every page sends anonymous browsers to the login form, remembering where they were going
#[sqlx::test]
#[test_log::test]
async fn test_pages_require_login(pool: PgPool) {
    let (server, _) = create_test_app(pool).await;

    for path in [
        "/router/list/",
        "/router/group/list/",
        "/router/ssh_keys/list/",
        "/backup/profile/list/",
        "/router/manage/",
    ] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::SEE_OTHER);
        let location = response.headers()["location"].to_str().unwrap().to_string();
        assert!(location.starts_with("/accounts/login/?next="), "{path} -> {location}");
    }
}

/// Log in, start a backup from the details page, see the result, log out
#[sqlx::test]
#[test_log::test]
async fn test_operator_backup_journey(pool: PgPool) {
    let (server, _) = create_test_app(pool.clone()).await;
    utils::create_test_user_with_password(&pool, "operator", "correct-horse", UserLevel::BACKUP_OPERATOR).await;
    let router = create_backup_ready_router(&pool, "edge-1").await;

    let login = server
        .post("/accounts/login/")
        .form(&[
            ("username", "operator"),
            ("password", "correct-horse"),
            ("next", "/router/list/"),
        ])
        .await;
    login.assert_status(StatusCode::SEE_OTHER);
    let session = login.headers()["set-cookie"].to_str().unwrap().split(';').next().unwrap().to_string();

    let list = server.get("/router/list/").add_header("cookie", session.clone()).await;
    list.assert_status_ok();
    assert!(list.text().contains("edge-1"));

    let backup = server
        .get(&format!("/router/create_instant_backup/?uuid={}", router.id))
        .add_header("cookie", session.clone())
        .await;
    backup.assert_status(StatusCode::SEE_OTHER);
    let messages = backup.headers()["set-cookie"].to_str().unwrap().split(';').next().unwrap().to_string();

    let details = server
        .get(&format!("/router/details/?uuid={}", router.id))
        .add_header("cookie", format!("{session}; {messages}"))
        .await;
    details.assert_status_ok();
    assert!(details.text().contains("Backup task created successfully"));

    // Operators see the page but cannot edit routers
    server
        .get(&format!("/router/manage/?uuid={}", router.id))
        .add_header("cookie", session)
        .await
        .assert_status_forbidden();

    let logout = server.get("/accounts/logout/").await;
    logout.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(logout.headers()["location"], "/accounts/login/");
}

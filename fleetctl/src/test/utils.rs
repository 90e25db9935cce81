//! Test utilities for integration testing
use crate::config::{NativeAuthConfig, PasswordConfig, ProxyHeaderAuthConfig, SessionConfig};
use crate::db::handlers::{repository::Repository, BackupProfiles, Routers, Users};
use crate::db::models::{
    routers::{RouterCreateDBRequest, RouterDBResponse, RouterType},
    users::{UserCreateDBRequest, UserDBResponse},
};
use crate::types::{BackupProfileId, RouterId, UserLevel};
use crate::AppState;
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_test_app(pool: PgPool) -> (TestServer, AppState) {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: crate::config::Config) -> (TestServer, AppState) {
    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

pub fn create_test_config() -> crate::config::Config {
    crate::config::Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_username: "admin".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        auth: crate::config::AuthConfig {
            native: NativeAuthConfig {
                enabled: true,
                password: PasswordConfig {
                    min_length: 8,
                    max_length: 64,
                    // Ultra-weak params for fast testing (DO NOT USE IN PRODUCTION)
                    argon2_memory_kib: 128,
                    argon2_iterations: 1,
                    argon2_parallelism: 1,
                },
                session: SessionConfig {
                    cookie_secure: false,
                    ..Default::default()
                },
            },
            proxy_header: ProxyHeaderAuthConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

pub async fn create_test_user(pool: &PgPool, level: UserLevel) -> UserDBResponse {
    let username = format!("testuser_{}", Uuid::new_v4().simple());
    create_user(pool, username, None, level).await
}

pub async fn create_test_user_with_password(pool: &PgPool, username: &str, password: &str, level: UserLevel) -> UserDBResponse {
    let hash = crate::auth::password::hash_password(password, &create_test_config().auth.native.password)
        .expect("Failed to hash password");
    create_user(pool, username.to_string(), Some(hash), level).await
}

async fn create_user(pool: &PgPool, username: String, password_hash: Option<String>, level: UserLevel) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);

    let user_create = UserCreateDBRequest {
        username,
        password_hash,
        auth_source: "test".to_string(),
        user_level: level,
    };

    users_repo.create(&user_create).await.expect("Failed to create test user")
}

/// Proxy header identifying `user`, for `.add_header(name, value)`
pub fn add_auth_headers(user: &UserDBResponse) -> (String, String) {
    let config = ProxyHeaderAuthConfig::default();
    (config.header_name, user.username.clone())
}

/// A RouterOS router with a password, optionally on a backup profile
pub async fn create_test_router(pool: &PgPool, name: &str, backup_profile_id: Option<BackupProfileId>) -> RouterDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Routers::new(&mut conn)
        .create(&RouterCreateDBRequest {
            name: name.to_string(),
            address: "192.0.2.1".to_string(),
            username: "admin".to_string(),
            password: Some("secret".to_string()),
            ssh_key_id: None,
            router_type: RouterType::RouterOs,
            monitoring: true,
            enabled: true,
            backup_profile_id,
        })
        .await
        .expect("Failed to create test router")
}

/// A router on the `default` backup profile, ready for backups
pub async fn create_backup_ready_router(pool: &PgPool, name: &str) -> RouterDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let profile = BackupProfiles::new(&mut conn)
        .get_or_create_default()
        .await
        .expect("Failed to load default profile");
    drop(conn);
    create_test_router(pool, name, Some(profile.id)).await
}

/// Record a closed offline interval of `seconds` starting at `start_time`
pub async fn insert_downtime(pool: &PgPool, router_id: RouterId, start_time: DateTime<Utc>, seconds: i32) {
    sqlx::query(
        "INSERT INTO router_downtime (router_id, start_time, end_time, total_down_time) VALUES ($1, $2, $3, $4)",
    )
    .bind(router_id)
    .bind(start_time)
    .bind(start_time + Duration::seconds(i64::from(seconds)))
    .bind(seconds)
    .execute(pool)
    .await
    .expect("Failed to insert downtime");
}

/// Mark every pending backup of the router as finished, the way the backup worker does
pub async fn finish_pending_backups(pool: &PgPool, router_id: RouterId) {
    sqlx::query("UPDATE router_backups SET success = TRUE, finish_time = NOW() WHERE router_id = $1 AND NOT success AND NOT error")
        .bind(router_id)
        .execute(pool)
        .await
        .expect("Failed to finish backups");
}

pub async fn backup_lock(pool: &PgPool, router_id: RouterId) -> Option<DateTime<Utc>> {
    sqlx::query_scalar("SELECT backup_lock FROM router_status WHERE router_id = $1")
        .bind(router_id)
        .fetch_optional(pool)
        .await
        .expect("Failed to read router status")
        .flatten()
}

//! # fleetctl: Router Fleet Management Console
//!
//! `fleetctl` is the web console of a router fleet manager. Operators use it to keep an inventory
//! of network routers, organize them in groups, store the SSH credentials used to reach them,
//! define backup profiles, and start configuration backups on demand.
//!
//! ## Overview
//!
//! The console is a server-rendered HTML application backed by PostgreSQL. It does not talk to
//! routers itself: separate monitoring and backup workers read the same database, pick up the
//! backup tasks created here, record router status and downtime, and clear the per-router backup
//! lock when a task finishes. The console reads what the workers wrote (status, downtime, backup
//! history) and writes what they consume (routers, credentials, profiles, tasks).
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer, uses
//! PostgreSQL through `sqlx` for persistence, and renders pages with `minijinja` templates embedded
//! in the binary.
//!
//! ### Request Flow
//!
//! Every page first authenticates the user, either through the signed session cookie issued by
//! the login form or through a trusted proxy header. Unauthenticated browsers are redirected to
//! `/accounts/login/` with a `next` parameter. Handlers then check the user's numeric level for
//! the operation, call the repositories in [`db`], and either render a page or redirect with a
//! one-shot flash message.
//!
//! ### Core Components
//!
//! - **API layer** ([`api`]): page handlers, form models and the bulk backup JSON endpoint
//! - **Authentication** ([`auth`]): sessions, proxy header login, password hashing and level checks
//! - **Database** ([`db`]): repositories over a borrowed connection or transaction
//! - **Backups** ([`backup`]): the backup lock protocol used by the instant backup endpoints
//! - **Availability** ([`availability`]): seven-day availability figures from recorded downtime
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use fleetctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = fleetctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     fleetctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! The application requires a PostgreSQL database and runs migrations on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/fleetctl").await?;
//! fleetctl::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod availability;
pub mod backup;
pub mod config;
pub mod db;
pub mod errors;
pub mod flash;
mod static_assets;
pub mod telemetry;
pub mod templates;
pub mod types;

#[cfg(test)]
mod test;

use crate::{
    api::handlers::{auth as auth_handlers, backup_profiles, backups, router_groups, routers, ssh_keys, static_assets as asset_handlers},
    auth::password,
    db::{
        errors::DbError,
        handlers::{BackupProfiles, Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
};
use axum::{
    response::Redirect,
    routing::{any, get},
    Router,
};
use bon::Builder;
pub use config::Config;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{debug, info, instrument, Level};

pub use types::{RouterId, UserId, UserLevel};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the fleetctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial administrator if it doesn't exist.
///
/// Idempotent: an existing account is raised to administrator level and, when a password is
/// configured, gets that password. Returns the user ID.
#[instrument(skip_all, fields(username = %username))]
pub async fn create_initial_admin_user(
    username: &str,
    password: Option<&str>,
    config: &Config,
    db: &PgPool,
) -> anyhow::Result<UserId> {
    let password_config = &config.auth.native.password;
    let password_hash = match password {
        Some(pwd) => {
            password::validate_password_length(pwd, password_config)
                .map_err(|e| anyhow::anyhow!("Invalid admin password: {e}"))?;
            Some(password::hash_password(pwd, password_config)?)
        }
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    let user_id = match user_repo.get_user_by_username(username).await? {
        Some(existing) => {
            user_repo
                .update(
                    existing.id,
                    &UserUpdateDBRequest {
                        password_hash,
                        user_level: Some(UserLevel::ADMINISTRATOR),
                    },
                )
                .await?;
            existing.id
        }
        None => {
            let created = user_repo
                .create(&UserCreateDBRequest {
                    username: username.to_string(),
                    password_hash,
                    auth_source: "system".to_string(),
                    user_level: UserLevel::ADMINISTRATOR,
                })
                .await?;
            info!("Created initial administrator");
            created.id
        }
    };

    tx.commit().await?;
    Ok(user_id)
}

/// Connect to PostgreSQL, run migrations, and make sure the default profile and admin exist
async fn setup_database(config: &Config, pool: Option<PgPool>) -> anyhow::Result<PgPool> {
    let pool = match pool {
        Some(pool) => pool,
        None => {
            info!(
                max_connections = config.database.max_connections,
                "Connecting to database"
            );
            PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(config.database.acquire_timeout)
                .idle_timeout(config.database.idle_timeout)
                .connect(&config.database.url)
                .await?
        }
    };

    migrator().run(&pool).await?;

    let mut conn = pool.acquire().await?;
    BackupProfiles::new(&mut conn)
        .get_or_create_default()
        .await
        .map_err(|e: DbError| anyhow::anyhow!("Failed to create default backup profile: {e}"))?;
    drop(conn);

    create_initial_admin_user(&config.admin_username, config.admin_password.as_deref(), config, &pool).await?;

    Ok(pool)
}

/// Build the console router with every page and the tracing layer
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(|| async { Redirect::to(routers::ROUTER_LIST_PATH) }))
        .route("/healthz", get(|| async { "OK" }))
        .route("/static/{*path}", get(asset_handlers::serve_embedded_asset))
        // Accounts
        .route("/accounts/login/", get(auth_handlers::login_page).post(auth_handlers::login))
        .route("/accounts/logout/", get(auth_handlers::logout).post(auth_handlers::logout))
        // Routers
        .route(routers::ROUTER_LIST_PATH, get(routers::router_list))
        .route("/router/details/", get(routers::router_details))
        .route("/router/availability/", get(routers::router_availability))
        .route("/router/manage/", get(routers::manage_router).post(routers::manage_router))
        // Backup tasks
        .route("/router/create_instant_backup/", get(backups::create_instant_backup))
        .route(
            "/router/create_instant_backup_multiple/",
            any(backups::create_instant_backup_multiple),
        )
        // Groups, keys and profiles
        .route(router_groups::ROUTER_GROUP_LIST_PATH, get(router_groups::router_group_list))
        .route(
            "/router/group/manage/",
            get(router_groups::manage_router_group).post(router_groups::manage_router_group),
        )
        .route(ssh_keys::SSH_KEY_LIST_PATH, get(ssh_keys::ssh_key_list))
        .route(
            "/router/ssh_keys/manage/",
            get(ssh_keys::manage_ssh_key).post(ssh_keys::manage_ssh_key),
        )
        .route(backup_profiles::BACKUP_PROFILE_LIST_PATH, get(backup_profiles::backup_profile_list))
        .route(
            "/backup/profile/manage/",
            get(backup_profiles::manage_backup_profile).post(backup_profiles::manage_backup_profile),
        )
        .with_state(state);

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// Main application struct that owns all resources and manages the lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations and seeds the
///    administrator and the default backup profile
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, in-flight requests finish and the pool
///    is closed
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Like [`Application::new`], reusing `pool` instead of connecting when given one
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!(bind = %config.bind_address(), site = %config.console.site_name, "Starting fleet console");

        let pool = setup_database(&config, pool).await?;
        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(app_state.clone());

        Ok(Self {
            router,
            app_state,
            config,
            pool,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, AppState) {
        let server = axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server");
        (server, self.app_state)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Fleet console listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

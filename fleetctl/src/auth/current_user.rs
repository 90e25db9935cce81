use crate::db::errors::DbError;
use crate::{
    api::models::users::CurrentUser,
    auth::{session, utils::cookie_value},
    config::Config,
    db::{
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
    errors::{Error, Result},
    types::UserLevel,
    AppState,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use tracing::{debug, info, instrument, trace};

/// Extract user from JWT session cookie if present and valid
/// Returns:
/// - None: No usable JWT cookie present
/// - Some(Ok(user)): Valid JWT found and the account still exists
/// - Some(Err(error)): Token was valid but the user lookup failed
#[instrument(skip(parts, config, db))]
async fn try_jwt_session_auth(parts: &Parts, config: &Config, db: &PgPool) -> Option<Result<CurrentUser>> {
    let token = cookie_value(&parts.headers, &config.auth.native.session.cookie_name)?;

    // Invalid or expired tokens are expected, they just mean "not logged in"
    let claims = match session::verify_session_token(token, config) {
        Ok(claims) => claims,
        Err(e) => {
            trace!("Ignoring session cookie: {e}");
            return None;
        }
    };

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };

    match Users::new(&mut conn).get_by_id(claims.sub).await {
        Ok(Some(user)) => Some(Ok(user.into())),
        Ok(None) => {
            debug!("Session token refers to a deleted user");
            None
        }
        Err(e) => Some(Err(e.into())),
    }
}

/// Extract user from proxy header if present and valid
/// Returns:
/// - None: No proxy header present, or unknown user with auto-create disabled
/// - Some(Ok(user)): Valid proxy header found and user authenticated
/// - Some(Err(error)): Proxy header present but user lookup/creation failed
#[instrument(skip(parts, config, db))]
async fn try_proxy_header_auth(parts: &Parts, config: &Config, db: &PgPool) -> Option<Result<CurrentUser>> {
    let username = parts
        .headers
        .get(&config.auth.proxy_header.header_name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())?;

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };
    let mut user_repo = Users::new(&mut conn);

    match user_repo.get_user_by_username(username).await {
        Ok(Some(user)) => Some(Ok(user.into())),
        Ok(None) if config.auth.proxy_header.auto_create_users => {
            let create_request = UserCreateDBRequest {
                username: username.to_string(),
                password_hash: None,
                auth_source: "proxy-header".to_string(),
                user_level: UserLevel(config.auth.proxy_header.default_user_level),
            };

            match user_repo.create(&create_request).await {
                Ok(new_user) => {
                    info!(username = %new_user.username, level = %new_user.user_level, "Created user from proxy header");
                    Some(Ok(new_user.into()))
                }
                // Two first requests raced to create the same user
                Err(e) if e.is_unique_violation_on("users") => match user_repo.get_user_by_username(username).await {
                    Ok(user) => user.map(|u| Ok(u.into())),
                    Err(e) => Some(Err(e.into())),
                },
                Err(e) => Some(Err(Error::Database(e))),
            }
        }
        Ok(None) => None,
        Err(e) => Some(Err(Error::Database(e))),
    }
}

/// Path and query of the request, used to come back after logging in
fn return_path(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Each method returns Option<Result<CurrentUser>>:
        // - None means the auth method is not applicable (no credentials present)
        // - Some(Ok(user)) means successful authentication
        // - Some(Err(error)) means credentials were present but checking them failed
        let mut auth_errors = Vec::new();

        // Native authentication (JWT sessions)
        if state.config.auth.native.enabled {
            match try_jwt_session_auth(parts, &state.config, &state.db).await {
                Some(Ok(user)) => {
                    debug!("Found JWT session authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => {
                    trace!("JWT session authentication failed: {:?}", e);
                    auth_errors.push(e);
                }
                None => {
                    trace!("No JWT session authentication attempted");
                }
            }
        }

        // Fall back to proxy header authentication
        if state.config.auth.proxy_header.enabled {
            match try_proxy_header_auth(parts, &state.config, &state.db).await {
                Some(Ok(user)) => {
                    debug!("Found proxy header authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => {
                    trace!("Proxy header authentication failed: {:?}", e);
                    auth_errors.push(e);
                }
                None => {
                    trace!("No proxy header authentication attempted");
                }
            }
        }

        // A broken database is not the user's fault, so don't bounce them to the login form
        if let Some(err) = auth_errors.into_iter().next() {
            return Err(err);
        }

        trace!("No authentication credentials found in request");
        Err(Error::Unauthenticated {
            message: None,
            return_to: Some(return_path(parts)),
        })
    }
}

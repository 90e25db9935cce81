//! Login and logout pages.

use axum::{
    extract::{Query, State},
    http::header,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form,
};
use minijinja::context;
use tracing::{info, instrument};

use crate::{
    api::models::users::{safe_next, CurrentUser, LoginQuery, LoginRequest},
    auth::{
        password, session,
        utils::{expired_session_cookie, session_cookie},
    },
    db::{errors::DbError, handlers::Users},
    errors::{Error, Result, LOGIN_PATH},
    flash::{Flash, FlashLevel},
    templates::render_page,
    AppState,
};

const INVALID_LOGIN: &str = "Please enter a correct username and password.";

fn login_form(state: &AppState, flash: &Flash, next: &str, username: &str, error: Option<&str>) -> Result<Response> {
    render_page(
        "login.html",
        &state.config.console.site_name,
        None,
        flash,
        context! {
            page_title => "Login",
            next => next,
            username => username,
            error => error,
            native_enabled => state.config.auth.native.enabled,
        },
    )
}

#[instrument(skip_all)]
pub async fn login_page(State(state): State<AppState>, Query(query): Query<LoginQuery>, flash: Flash) -> Result<Response> {
    login_form(&state, &flash, safe_next(query.next.as_deref()), "", None)
}

#[instrument(skip_all, fields(username = %request.username))]
pub async fn login(State(state): State<AppState>, flash: Flash, Form(request): Form<LoginRequest>) -> Result<Response> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }
    let next = safe_next(request.next.as_deref()).to_string();

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let user = Users::new(&mut conn).get_user_by_username(request.username.trim()).await?;

    let user = match user {
        Some(user) => user,
        None => return login_form(&state, &flash, &next, &request.username, Some(INVALID_LOGIN)),
    };

    // Proxy-created accounts have no password and cannot log in here
    let is_valid = match user.password_hash.clone() {
        Some(hash) => password::verify_password(request.password, hash).await?,
        None => false,
    };
    if !is_valid {
        info!("Rejected login");
        return login_form(&state, &flash, &next, &request.username, Some(INVALID_LOGIN));
    }

    Users::new(&mut conn).record_login(user.id).await?;

    let current_user = CurrentUser::from(user);
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = session_cookie(&token, &state.config.auth.native.session);

    info!(user_id = %current_user.id, "User logged in");
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to(&next)).into_response())
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = expired_session_cookie(&state.config.auth.native.session);
    let mut flash = Flash::default();
    flash.push(FlashLevel::Info, "You have been logged out");

    (AppendHeaders([(header::SET_COOKIE, cookie)]), flash.redirect(LOGIN_PATH))
}

#[cfg(test)]
mod tests {
    use crate::test::utils::{create_test_app, create_test_user_with_password};
    use crate::types::UserLevel;
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_sets_session_cookie_and_redirects(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        create_test_user_with_password(&pool, "netops", "correct-horse", UserLevel::VIEW_ONLY).await;

        let response = server
            .post("/accounts/login/")
            .form(&[
                ("username", "netops"),
                ("password", "correct-horse"),
                ("next", "/router/group/list/"),
            ])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/router/group/list/");
        let cookie = response.headers()["set-cookie"].to_str().unwrap();
        assert!(cookie.starts_with("fleetctl_session="));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_session_cookie_opens_pages(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        create_test_user_with_password(&pool, "netops", "correct-horse", UserLevel::VIEW_ONLY).await;

        let login = server
            .post("/accounts/login/")
            .form(&[("username", "netops"), ("password", "correct-horse")])
            .await;
        let cookie = login.headers()["set-cookie"].to_str().unwrap().split(';').next().unwrap().to_string();

        let page = server.get("/router/list/").add_header("cookie", cookie).await;
        page.assert_status_ok();
        assert!(page.text().contains("netops"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_wrong_password_rerenders_form(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        create_test_user_with_password(&pool, "netops", "correct-horse", UserLevel::VIEW_ONLY).await;

        let response = server
            .post("/accounts/login/")
            .form(&[("username", "netops"), ("password", "battery-staple")])
            .await;

        response.assert_status_ok();
        assert!(response.headers().get("set-cookie").is_none());
        assert!(response.text().contains("Please enter a correct username and password."));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_offsite_next_is_ignored(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        create_test_user_with_password(&pool, "netops", "correct-horse", UserLevel::VIEW_ONLY).await;

        let response = server
            .post("/accounts/login/")
            .form(&[
                ("username", "netops"),
                ("password", "correct-horse"),
                ("next", "https://evil.example/"),
            ])
            .await;

        assert_eq!(response.headers()["location"], "/router/list/");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_next_with_control_characters_is_ignored(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;
        create_test_user_with_password(&pool, "netops", "correct-horse", UserLevel::VIEW_ONLY).await;

        for next in ["/\t/evil.example", "/a\nb"] {
            let response = server
                .post("/accounts/login/")
                .form(&[("username", "netops"), ("password", "correct-horse"), ("next", next)])
                .await;

            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(response.headers()["location"], "/router/list/");
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_logout_clears_cookie(pool: PgPool) {
        let (server, _) = create_test_app(pool.clone()).await;

        let response = server.get("/accounts/logout/").await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/accounts/login/");
        let cookies: Vec<String> = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("fleetctl_session=;") && c.contains("Max-Age=0")));
        assert!(cookies.iter().any(|c| c.starts_with("fleetctl_messages=")));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_page_renders(pool: PgPool) {
        let (server, _) = create_test_app(pool).await;

        let response = server.get("/accounts/login/?next=/router/list/").await;
        response.assert_status_ok();
        // Auto-escaping writes `/` as `&#x2f;`
        assert!(response.text().contains("name=\"next\" value=\"&#x2f;router&#x2f;list&#x2f;\""));
    }
}

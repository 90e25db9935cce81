//! Authentication utility functions.

use axum::http::{header, HeaderMap};

use crate::config::SessionConfig;

/// Find a cookie value by name across every `Cookie` header
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(cookie_name, _)| *cookie_name == name)
        .map(|(_, value)| value)
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, session: &SessionConfig) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; {}SameSite={}; Max-Age={}",
        session.cookie_name,
        token,
        if session.cookie_secure { "Secure; " } else { "" },
        same_site(&session.cookie_same_site),
        session.timeout.as_secs()
    )
}

/// `Set-Cookie` value that removes the session cookie
pub fn expired_session_cookie(session: &SessionConfig) -> String {
    format!(
        "{}=; Path=/; HttpOnly; {}SameSite={}; Max-Age=0",
        session.cookie_name,
        if session.cookie_secure { "Secure; " } else { "" },
        same_site(&session.cookie_same_site),
    )
}

fn same_site(value: &str) -> &'static str {
    match value.to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "none" => "None",
        _ => "Lax",
    }
}

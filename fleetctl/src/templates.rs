//! Server-side HTML rendering.
//!
//! Templates are embedded at build time (see [`crate::static_assets::Templates`]) and compiled
//! into one shared [`Environment`] on first use. Handlers render through [`Page`], which adds the
//! logged-in user, the site name and pending flash messages to every template context.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{AppendHeaders, Html, IntoResponse, Response},
};
use chrono::{DateTime, FixedOffset};
use minijinja::{context, Environment, Value};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::{error, instrument};

use crate::{
    api::models::users::CurrentUser,
    errors::{Error, Result},
    flash::{Flash, FlashLevel, FlashRedirect},
    static_assets::Templates,
    AppState,
};

static ENV: Lazy<Environment<'static>> = Lazy::new(build_environment);

fn build_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_filter("datetime", format_datetime);

    for name in Templates::iter() {
        let Some(file) = Templates::get(&name) else {
            continue;
        };
        let source = match String::from_utf8(file.data.into_owned()) {
            Ok(source) => source,
            Err(e) => {
                error!("Template {name} is not UTF-8: {e}");
                continue;
            }
        };
        if let Err(e) = env.add_template_owned(name.to_string(), source) {
            error!("Template {name} failed to compile: {e:#}");
        }
    }

    env
}

/// `{{ value|datetime }}` for RFC 3339 timestamps, `-` when unset
fn format_datetime(value: Option<String>) -> String {
    match value {
        Some(raw) => DateTime::<FixedOffset>::parse_from_rfc3339(&raw)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or(raw),
        None => "-".to_string(),
    }
}

/// Render a template by name
pub fn render<S: Serialize>(name: &str, ctx: S) -> std::result::Result<String, minijinja::Error> {
    ENV.get_template(name)?.render(ctx)
}

/// Per-request rendering context: who is logged in and which messages are waiting
pub struct Page {
    pub user: CurrentUser,
    pub flash: Flash,
    site_name: String,
}

impl FromRequestParts<AppState> for Page {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        let Ok(flash) = <Flash as FromRequestParts<AppState>>::from_request_parts(parts, state).await;

        Ok(Self {
            user,
            flash,
            site_name: state.config.console.site_name.clone(),
        })
    }
}

/// Render a full page: `ctx` merged over the common context. Shown messages are cleared.
pub fn render_page(
    template: &str,
    site_name: &str,
    user: Option<&CurrentUser>,
    flash: &Flash,
    ctx: Value,
) -> Result<Response> {
    let body = render(
        template,
        context! {
            site_name => site_name,
            user => user,
            messages => flash.views(),
            ..ctx
        },
    )
    .map_err(|e| Error::Internal {
        operation: format!("render {template}: {e:#}"),
    })?;

    let cookies: Vec<(header::HeaderName, String)> = if flash.is_empty() {
        Vec::new()
    } else {
        vec![(header::SET_COOKIE, Flash::clear_cookie())]
    };
    Ok((AppendHeaders(cookies), Html(body)).into_response())
}

impl Page {
    #[instrument(skip(self, ctx), fields(user = %self.user.username))]
    pub fn render(self, template: &str, ctx: Value) -> Result<Response> {
        render_page(template, &self.site_name, Some(&self.user), &self.flash, ctx)
    }

    pub fn message(mut self, level: FlashLevel, text: impl Into<String>) -> Self {
        self.flash.push(level, text);
        self
    }

    /// Redirect, keeping unread and newly added messages
    pub fn redirect(self, to: impl Into<String>) -> FlashRedirect {
        self.flash.redirect(to)
    }
}

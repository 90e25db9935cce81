//! One-shot messages carried across a redirect.
//!
//! Messages are stored as base64 JSON in a cookie. A page that renders them clears the cookie, a
//! redirect re-issues it with any unread messages plus the new ones. Text of the form
//! `title|body` is shown as a heading with a detail line.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::utils::cookie_value;

pub const FLASH_COOKIE: &str = "fleetctl_messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    pub fn title(&self) -> &str {
        self.text.split_once('|').map_or(self.text.as_str(), |(title, _)| title)
    }

    pub fn body(&self) -> Option<&str> {
        self.text.split_once('|').map(|(_, body)| body)
    }
}

/// Message as handed to templates
#[derive(Debug, Serialize)]
pub struct FlashView<'a> {
    pub level: FlashLevel,
    pub title: &'a str,
    pub body: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash {
    messages: Vec<FlashMessage>,
}

impl Flash {
    pub fn push(&mut self, level: FlashLevel, text: impl Into<String>) {
        self.messages.push(FlashMessage {
            level,
            text: text.into(),
        });
    }

    pub fn success(mut self, text: impl Into<String>) -> Self {
        self.push(FlashLevel::Success, text);
        self
    }

    pub fn warning(mut self, text: impl Into<String>) -> Self {
        self.push(FlashLevel::Warning, text);
        self
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[FlashMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn views(&self) -> Vec<FlashView<'_>> {
        self.messages
            .iter()
            .map(|m| FlashView {
                level: m.level,
                title: m.title(),
                body: m.body(),
            })
            .collect()
    }

    pub fn encode(&self) -> String {
        // Serializing plain strings and unit enums cannot fail
        let json = serde_json::to_vec(&self.messages).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Tampered or stale cookies decode to no messages
    pub fn decode(value: &str) -> Self {
        let messages = URL_SAFE_NO_PAD
            .decode(value)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self { messages }
    }

    pub fn set_cookie(&self) -> String {
        format!("{FLASH_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.encode())
    }

    pub fn clear_cookie() -> String {
        format!("{FLASH_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }

    pub fn redirect(self, to: impl Into<String>) -> FlashRedirect {
        FlashRedirect {
            location: to.into(),
            flash: self,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Flash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let flash = cookie_value(&parts.headers, FLASH_COOKIE)
            .filter(|value| !value.is_empty())
            .map(Flash::decode)
            .unwrap_or_default();
        if !flash.is_empty() {
            debug!(count = flash.messages.len(), "Loaded flash messages");
        }
        Ok(flash)
    }
}

/// `303 See Other` that stores pending messages for the next page
#[derive(Debug)]
pub struct FlashRedirect {
    location: String,
    flash: Flash,
}

impl IntoResponse for FlashRedirect {
    fn into_response(self) -> Response {
        let redirect = Redirect::to(&self.location);
        if self.flash.is_empty() {
            return redirect.into_response();
        }
        (AppendHeaders([(header::SET_COOKIE, self.flash.set_cookie())]), redirect).into_response()
    }
}

//! HTTP request handlers for all console pages.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Query and form parsing
//! - Authentication and level checks
//! - Calling the database repositories
//! - Rendering a page or redirecting with a flash message
//!
//! # Handler Modules
//!
//! - [`auth`]: Login form and logout
//! - [`backups`]: Instant backup tasks for one or many routers
//! - [`backup_profiles`]: Backup profile list and manage pages
//! - [`router_groups`]: Router group list and manage pages
//! - [`routers`]: Router list, details, availability and manage pages
//! - [`ssh_keys`]: SSH key list and manage pages
//! - [`static_assets`]: Embedded stylesheet serving
//!
//! # Manage pages
//!
//! Every entity has one manage page at `.../manage/`. Without `?uuid=` it creates, with it it
//! edits. `?uuid=...&action=delete&confirmation=delete` deletes; any other confirmation leaves the
//! entity in place and redirects with a warning. GET shows the form, POST validates and saves, and
//! invalid input re-renders the form with field errors.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which renders the error, access denied or login
//! redirect response. The bulk backup endpoint answers in JSON instead.

use axum::response::Response;
use minijinja::context;
use uuid::Uuid;

use crate::{
    api::models::forms::{FieldErrors, FieldView},
    errors::Result,
    templates::Page,
};

pub mod auth;
pub mod backup_profiles;
pub mod backups;
pub mod router_groups;
pub mod routers;
pub mod ssh_keys;
pub mod static_assets;

/// Header and links of a manage form
pub(crate) struct FormPage<'a> {
    pub title: &'a str,
    pub instance: Option<Uuid>,
    /// Where "Back" leads
    pub list_url: &'a str,
    /// Deleting is offered when editing and this is set
    pub deletable: bool,
}

/// Render `generic_form.html`
pub(crate) fn render_form(page: Page, form: FormPage<'_>, fields: Vec<FieldView>, errors: &FieldErrors) -> Result<Response> {
    page.render(
        "generic_form.html",
        context! {
            page_title => form.title,
            fields => fields,
            non_field_errors => errors.get(FieldErrors::NON_FIELD),
            instance => form.instance,
            list_url => form.list_url,
            deletable => form.deletable && form.instance.is_some(),
        },
    )
}

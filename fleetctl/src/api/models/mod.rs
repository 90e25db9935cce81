//! Request and page models.
//!
//! These sit between HTTP and the database models: query strings, HTML form values with their
//! validation, and the rows list pages render.
//!
//! - [`forms`]: Form body parsing, field errors and input descriptors
//! - [`users`]: The authenticated user and the login form
//! - [`routers`]: Router query strings, edit form and bulk backup payloads
//! - [`router_groups`], [`ssh_keys`], [`backup_profiles`]: Edit forms

pub mod backup_profiles;
pub mod forms;
pub mod router_groups;
pub mod routers;
pub mod ssh_keys;
pub mod users;

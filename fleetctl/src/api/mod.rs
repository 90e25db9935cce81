//! HTTP layer: page handlers and the form and view models they use.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: query strings, form parsing and validation, list rows, JSON bodies
//!
//! # Pages
//!
//! - **Accounts** (`/accounts/login/`, `/accounts/logout/`)
//! - **Routers** (`/router/list/`, `/router/details/`, `/router/availability/`, `/router/manage/`)
//! - **Backups** (`/router/create_instant_backup/`, `/router/create_instant_backup_multiple/`)
//! - **Router groups** (`/router/group/list/`, `/router/group/manage/`)
//! - **SSH keys** (`/router/ssh_keys/list/`, `/router/ssh_keys/manage/`)
//! - **Backup profiles** (`/backup/profile/list/`, `/backup/profile/manage/`)
//!
//! Entities are addressed with a `?uuid=` query parameter. Everything renders HTML except the bulk
//! backup endpoint, which answers in JSON for the router list's "Backup selected" button.

pub mod handlers;
pub mod models;

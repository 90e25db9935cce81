//! Database record models matching table schemas.
//!
//! These structs are the write requests and read responses exchanged with the repositories in
//! [`crate::db::handlers`]. Enumerated columns (`router_type`, `weekly_day`, `schedule_type`) are
//! stored as text and parsed into Rust enums at the repository boundary.
//!
//! - [`routers`]: router inventory entries
//! - [`router_groups`]: named groups of routers
//! - [`router_status`]: monitoring state, downtime intervals and backup tasks
//! - [`ssh_keys`]: SSH credentials
//! - [`backup_profiles`]: backup schedules and retention
//! - [`users`]: console accounts and their levels

pub mod backup_profiles;
pub mod router_groups;
pub mod router_status;
pub mod routers;
pub mod ssh_keys;
pub mod users;

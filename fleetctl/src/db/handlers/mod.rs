//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed `PgConnection` (a pooled connection or an open
//! transaction) and returns the models in [`crate::db::models`]. Entities managed through the
//! console's manage pages implement the [`Repository`] trait; the monitoring and backup tables
//! only expose the narrow operations the console needs.
//!
//! # Available Repositories
//!
//! - [`Routers`], [`RouterGroups`], [`SshKeys`], [`BackupProfiles`], [`Users`]: CRUD entities
//! - [`RouterStatuses`]: status rows and the backup lock
//! - [`RouterBackups`]: backup tasks
//! - [`RouterDowntimes`]: recorded offline intervals
//! - [`BackupSchedules`]: computed next-run rows
//! - [`WebadminSettings`]: the configuration-changed marker
//!
//! # Common Pattern
//!
//! ```ignore
//! use fleetctl::db::handlers::{Routers, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let routers = Routers::new(&mut tx).list(&Default::default()).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod backup_profiles;
pub mod backup_schedules;
pub mod downtimes;
pub mod repository;
pub mod router_backups;
pub mod router_groups;
pub mod router_status;
pub mod routers;
pub mod ssh_keys;
pub mod users;
pub mod webadmin_settings;

pub use backup_profiles::BackupProfiles;
pub use backup_schedules::BackupSchedules;
pub use downtimes::RouterDowntimes;
pub use repository::Repository;
pub use router_backups::RouterBackups;
pub use router_groups::RouterGroups;
pub use router_status::RouterStatuses;
pub use routers::{RouterFilter, Routers};
pub use ssh_keys::SshKeys;
pub use users::Users;
pub use webadmin_settings::WebadminSettings;

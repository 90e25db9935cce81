//! Instant backup task creation guarded by the per-router backup lock.
//!
//! A router accepts a new instant backup only when it has no pending task, its `backup_lock` is
//! clear and it has a backup profile. The check and the write happen in one transaction that
//! first takes a row lock on the router's status row, so two concurrent requests for the same
//! router serialize and the second one sees the task created by the first.
//!
//! The lock is released by the backup worker when a task finishes. If the worker dies, the
//! details page calls [`release_stale_lock`] which clears a lock that no pending task backs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Connection, PgConnection};
use tracing::{info, instrument};

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::{Repository, RouterBackups, RouterStatuses, Routers},
        models::router_status::{RouterBackupCreateDBRequest, RouterBackupDBResponse, ScheduleType},
    },
    types::{abbrev_uuid, RouterId},
};

/// Flash text shown when the details page clears an orphaned lock
pub const STALE_LOCK_RELEASED: &str = "Backup lock removed|Backup lock was removed as there are no active backup tasks";

/// Why a backup task was not created, in the order the checks run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackupRefusal {
    ActiveTaskExists,
    Locked,
    NoBackupProfile,
}

impl BackupRefusal {
    /// Message shown on the details page
    pub fn message(&self) -> &'static str {
        match self {
            BackupRefusal::ActiveTaskExists => "Active router backup task already exists",
            BackupRefusal::Locked => "Router backup is currently locked",
            BackupRefusal::NoBackupProfile => "Router has no backup profile",
        }
    }

    /// Status string reported by the bulk endpoint
    pub fn bulk_status(&self) -> &'static str {
        match self {
            BackupRefusal::ActiveTaskExists => "active backup task exists",
            BackupRefusal::Locked => "backup locked",
            BackupRefusal::NoBackupProfile => "no backup profile",
        }
    }
}

#[derive(Debug, Clone)]
pub enum BackupOutcome {
    Started(RouterBackupDBResponse),
    Refused(BackupRefusal),
}

impl BackupOutcome {
    pub fn bulk_status(&self) -> &'static str {
        match self {
            BackupOutcome::Started(_) => "backup started",
            BackupOutcome::Refused(refusal) => refusal.bulk_status(),
        }
    }
}

/// Decide whether a backup may start. Pending task wins over lock, lock wins over missing profile.
pub fn evaluate(has_pending_task: bool, backup_lock: Option<DateTime<Utc>>, has_profile: bool) -> Option<BackupRefusal> {
    if has_pending_task {
        Some(BackupRefusal::ActiveTaskExists)
    } else if backup_lock.is_some() {
        Some(BackupRefusal::Locked)
    } else if !has_profile {
        Some(BackupRefusal::NoBackupProfile)
    } else {
        None
    }
}

/// Create an instant backup task for the router and set its lock, or report why not.
///
/// Returns [`DbError::NotFound`] if the router does not exist.
#[instrument(skip(conn), fields(router_id = %abbrev_uuid(&router_id)), err)]
pub async fn create_instant_backup(conn: &mut PgConnection, router_id: RouterId) -> Result<BackupOutcome> {
    let mut tx = conn.begin().await?;

    let router = Routers::new(&mut tx).get_by_id(router_id).await?.ok_or(DbError::NotFound)?;
    let status = RouterStatuses::new(&mut tx).lock_for_update(router_id).await?;
    let pending = RouterBackups::new(&mut tx).has_pending(router_id).await?;

    if let Some(refusal) = evaluate(pending, status.backup_lock, router.backup_profile_id.is_some()) {
        // Keeps the status row if lock_for_update had to create it
        tx.commit().await?;
        info!(router = %router.name, reason = refusal.message(), "Backup task refused");
        return Ok(BackupOutcome::Refused(refusal));
    }

    let backup = RouterBackups::new(&mut tx)
        .create(&RouterBackupCreateDBRequest {
            router_id,
            schedule_time: Utc::now(),
            schedule_type: ScheduleType::Instant,
        })
        .await?;
    RouterStatuses::new(&mut tx)
        .set_backup_lock(router_id, Some(backup.schedule_time))
        .await?;

    tx.commit().await?;
    info!(router = %router.name, backup_id = %abbrev_uuid(&backup.id), "Instant backup task created");
    Ok(BackupOutcome::Started(backup))
}

/// Clear `backup_lock` when no pending task backs it. Returns whether a lock was released.
#[instrument(skip(conn), fields(router_id = %abbrev_uuid(&router_id)), err)]
pub async fn release_stale_lock(conn: &mut PgConnection, router_id: RouterId) -> Result<bool> {
    let mut tx = conn.begin().await?;

    let status = RouterStatuses::new(&mut tx).lock_for_update(router_id).await?;
    if status.backup_lock.is_none() {
        tx.commit().await?;
        return Ok(false);
    }

    if RouterBackups::new(&mut tx).has_pending(router_id).await? {
        tx.commit().await?;
        return Ok(false);
    }

    RouterStatuses::new(&mut tx).set_backup_lock(router_id, None).await?;
    tx.commit().await?;
    info!("Released backup lock with no pending task");
    Ok(true)
}

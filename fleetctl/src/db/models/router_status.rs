//! Database models for router monitoring state, downtime and backup tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::types::{RouterBackupId, RouterId};

/// One row per router, written by the monitoring and backup workers
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RouterStatusDBResponse {
    pub router_id: RouterId,
    pub status_online: bool,
    pub last_status_change: Option<DateTime<Utc>>,
    pub backup_lock: Option<DateTime<Utc>>,
    pub last_backup: Option<DateTime<Utc>>,
    pub last_backup_failed: Option<DateTime<Utc>>,
}

/// A recorded offline interval
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RouterDowntimeDBResponse {
    pub id: uuid::Uuid,
    pub router_id: RouterId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_down_time: i32,
}

/// What triggered a backup task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Instant,
    Daily,
    Weekly,
    Monthly,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Instant => "instant",
            ScheduleType::Daily => "daily",
            ScheduleType::Weekly => "weekly",
            ScheduleType::Monthly => "monthly",
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instant" => Ok(ScheduleType::Instant),
            "daily" => Ok(ScheduleType::Daily),
            "weekly" => Ok(ScheduleType::Weekly),
            "monthly" => Ok(ScheduleType::Monthly),
            other => Err(format!("unknown schedule type '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterBackupCreateDBRequest {
    pub router_id: RouterId,
    pub schedule_time: DateTime<Utc>,
    pub schedule_type: ScheduleType,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterBackupDBResponse {
    pub id: RouterBackupId,
    pub router_id: RouterId,
    pub schedule_time: DateTime<Utc>,
    pub schedule_type: ScheduleType,
    pub success: bool,
    pub error: bool,
    pub error_message: Option<String>,
    pub finish_time: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
}

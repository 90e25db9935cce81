//! Database models for backup profiles.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::types::BackupProfileId;

/// Name of the profile that always exists and cannot be deleted
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Day of the week a weekly backup runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    #[default]
    Sunday,
}

impl WeekDay {
    pub const ALL: [WeekDay; 7] = [
        WeekDay::Monday,
        WeekDay::Tuesday,
        WeekDay::Wednesday,
        WeekDay::Thursday,
        WeekDay::Friday,
        WeekDay::Saturday,
        WeekDay::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeekDay::Monday => "monday",
            WeekDay::Tuesday => "tuesday",
            WeekDay::Wednesday => "wednesday",
            WeekDay::Thursday => "thursday",
            WeekDay::Friday => "friday",
            WeekDay::Saturday => "saturday",
            WeekDay::Sunday => "sunday",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeekDay::Monday => "Monday",
            WeekDay::Tuesday => "Tuesday",
            WeekDay::Wednesday => "Wednesday",
            WeekDay::Thursday => "Thursday",
            WeekDay::Friday => "Friday",
            WeekDay::Saturday => "Saturday",
            WeekDay::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeekDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeekDay::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("unknown week day '{s}'"))
    }
}

/// Editable profile fields, shared by create and update
#[derive(Debug, Clone, PartialEq)]
pub struct BackupProfileFields {
    pub name: String,
    pub daily_backup: bool,
    pub weekly_backup: bool,
    pub monthly_backup: bool,
    pub daily_retention: i32,
    pub weekly_retention: i32,
    pub monthly_retention: i32,
    pub instant_retention: i32,
    pub weekly_day: WeekDay,
    pub monthly_day: i32,
    pub backup_time: NaiveTime,
}

impl Default for BackupProfileFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            daily_backup: true,
            weekly_backup: true,
            monthly_backup: true,
            daily_retention: 7,
            weekly_retention: 30,
            monthly_retention: 365,
            instant_retention: 7,
            weekly_day: WeekDay::Sunday,
            monthly_day: 1,
            backup_time: NaiveTime::MIN,
        }
    }
}

pub type BackupProfileCreateDBRequest = BackupProfileFields;
pub type BackupProfileUpdateDBRequest = BackupProfileFields;

#[derive(Debug, Clone, Serialize)]
pub struct BackupProfileDBResponse {
    pub id: BackupProfileId,
    pub name: String,
    pub daily_backup: bool,
    pub weekly_backup: bool,
    pub monthly_backup: bool,
    pub daily_retention: i32,
    pub weekly_retention: i32,
    pub monthly_retention: i32,
    pub instant_retention: i32,
    pub weekly_day: WeekDay,
    pub monthly_day: i32,
    pub backup_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BackupProfileDBResponse {
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_PROFILE_NAME
    }
}

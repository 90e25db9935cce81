//! Database models for routers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::types::{BackupProfileId, RouterId, SshKeyId};

/// Kind of device behind a router entry, stored as text in `routers.router_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterType {
    RouterOs,
    OpenWrt,
    Monitoring,
}

impl RouterType {
    pub const ALL: [RouterType; 3] = [RouterType::RouterOs, RouterType::OpenWrt, RouterType::Monitoring];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouterType::RouterOs => "routeros",
            RouterType::OpenWrt => "openwrt",
            RouterType::Monitoring => "monitoring",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RouterType::RouterOs => "Mikrotik (RouterOS)",
            RouterType::OpenWrt => "OpenWRT",
            RouterType::Monitoring => "Monitoring Only",
        }
    }
}

impl fmt::Display for RouterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RouterType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown router type '{s}'"))
    }
}

/// Database request for creating a new router
#[derive(Debug, Clone)]
pub struct RouterCreateDBRequest {
    pub name: String,
    pub address: String,
    pub username: String,
    pub password: Option<String>,
    pub ssh_key_id: Option<SshKeyId>,
    pub router_type: RouterType,
    pub monitoring: bool,
    pub enabled: bool,
    pub backup_profile_id: Option<BackupProfileId>,
}

/// Database request for updating a router. A `None` password keeps the stored one.
#[derive(Debug, Clone)]
pub struct RouterUpdateDBRequest {
    pub name: String,
    pub address: String,
    pub username: String,
    pub password: Option<String>,
    pub ssh_key_id: Option<SshKeyId>,
    pub router_type: RouterType,
    pub monitoring: bool,
    pub enabled: bool,
    pub backup_profile_id: Option<BackupProfileId>,
}

/// Database response for a router
#[derive(Debug, Clone, Serialize)]
pub struct RouterDBResponse {
    pub id: RouterId,
    pub name: String,
    pub address: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub ssh_key_id: Option<SshKeyId>,
    pub router_type: RouterType,
    pub monitoring: bool,
    pub enabled: bool,
    pub backup_profile_id: Option<BackupProfileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

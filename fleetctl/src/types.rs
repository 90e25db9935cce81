//! Common type definitions and permission system types.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, RouterId, etc.)
//! - The numeric [`UserLevel`] each account is granted
//! - Resource and operation enums for access control
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases. The router UUID is also the identifier
//! used in page URLs (`?uuid=...`).
//!
//! # Permission System
//!
//! Every account carries a single [`UserLevel`]. Each ([`Resource`], [`Operation`]) pair maps to
//! a minimum level (see [`crate::auth::permissions::required_level`]); a user is allowed to
//! perform the operation when their level is at least that minimum.
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type RouterId = Uuid;
pub type RouterGroupId = Uuid;
pub type SshKeyId = Uuid;
pub type BackupProfileId = Uuid;
pub type RouterBackupId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Numeric permission level stored in `user_acl.user_level`.
///
/// Levels are ordered: a higher level implies every permission of the lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserLevel(pub i32);

impl UserLevel {
    /// Accounts without an ACL row
    pub const NONE: UserLevel = UserLevel(0);
    pub const VIEW_ONLY: UserLevel = UserLevel(10);
    pub const BACKUP_OPERATOR: UserLevel = UserLevel(20);
    pub const ROUTER_MANAGER: UserLevel = UserLevel(30);
    pub const FLEET_MANAGER: UserLevel = UserLevel(40);
    pub const ADMINISTRATOR: UserLevel = UserLevel(50);

    pub const ALL: [UserLevel; 6] = [
        Self::NONE,
        Self::VIEW_ONLY,
        Self::BACKUP_OPERATOR,
        Self::ROUTER_MANAGER,
        Self::FLEET_MANAGER,
        Self::ADMINISTRATOR,
    ];

    pub fn label(&self) -> &'static str {
        match *self {
            Self::NONE => "No access",
            Self::VIEW_ONLY => "View only",
            Self::BACKUP_OPERATOR => "Backup operator",
            Self::ROUTER_MANAGER => "Router manager",
            Self::FLEET_MANAGER => "Fleet manager",
            Self::ADMINISTRATOR => "Administrator",
            _ => "Custom",
        }
    }

    /// Parse a configured level, rejecting values outside the known set
    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.0 == value)
    }
}

impl fmt::Display for UserLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.0)
    }
}

// Operations that can be performed on resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    /// Create, update or delete through a manage page
    Manage,
    /// Start a backup task
    Backup,
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Routers,
    RouterGroups,
    SshKeys,
    BackupProfiles,
    Backups,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => write!(f, "view"),
            Operation::Manage => write!(f, "manage"),
            Operation::Backup => write!(f, "create"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Routers => write!(f, "routers"),
            Resource::RouterGroups => write!(f, "router groups"),
            Resource::SshKeys => write!(f, "SSH keys"),
            Resource::BackupProfiles => write!(f, "backup profiles"),
            Resource::Backups => write!(f, "backup tasks"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }

    #[test]
    fn test_user_level_ordering() {
        assert!(UserLevel::ADMINISTRATOR > UserLevel::FLEET_MANAGER);
        assert!(UserLevel::FLEET_MANAGER > UserLevel::ROUTER_MANAGER);
        assert!(UserLevel::ROUTER_MANAGER > UserLevel::BACKUP_OPERATOR);
        assert!(UserLevel::BACKUP_OPERATOR > UserLevel::VIEW_ONLY);
        assert!(UserLevel::VIEW_ONLY > UserLevel::NONE);
    }

    #[test]
    fn test_user_level_from_value() {
        assert_eq!(UserLevel::from_value(30), Some(UserLevel::ROUTER_MANAGER));
        assert_eq!(UserLevel::from_value(35), None);
        assert_eq!(UserLevel(20).label(), "Backup operator");
    }
}

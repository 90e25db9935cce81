//! Database models for users.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{UserId, UserLevel};

/// Database request for creating a new user together with its ACL row
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub username: String,
    pub password_hash: Option<String>,
    pub auth_source: String,
    pub user_level: UserLevel,
}

/// Database request for updating a user. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub password_hash: Option<String>,
    pub user_level: Option<UserLevel>,
}

/// Database response for a user
#[derive(Debug, Clone, Serialize)]
pub struct UserDBResponse {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub auth_source: String,
    /// `UserLevel::NONE` when the user has no ACL row
    pub user_level: UserLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

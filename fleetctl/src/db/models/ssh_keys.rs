//! Database models for SSH keys.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::SshKeyId;

#[derive(Debug, Clone)]
pub struct SshKeyCreateDBRequest {
    pub name: String,
    pub public_key: Option<String>,
    pub private_key: String,
}

/// A `None` private key keeps the stored one
#[derive(Debug, Clone)]
pub struct SshKeyUpdateDBRequest {
    pub name: String,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SshKeyDBResponse {
    pub id: SshKeyId,
    pub name: String,
    pub public_key: Option<String>,
    #[serde(skip_serializing)]
    pub private_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

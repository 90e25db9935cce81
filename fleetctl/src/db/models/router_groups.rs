//! Database models for router groups.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{RouterGroupId, RouterId};

/// Database request for creating a new router group
#[derive(Debug, Clone)]
pub struct RouterGroupCreateDBRequest {
    pub name: String,
    pub default_group: bool,
    pub internal_notes: Option<String>,
    pub router_ids: Vec<RouterId>,
}

/// Database request for updating a router group; membership is replaced wholesale
#[derive(Debug, Clone)]
pub struct RouterGroupUpdateDBRequest {
    pub name: String,
    pub default_group: bool,
    pub internal_notes: Option<String>,
    pub router_ids: Vec<RouterId>,
}

/// Database response for a router group
#[derive(Debug, Clone, Serialize)]
pub struct RouterGroupDBResponse {
    pub id: RouterGroupId,
    pub name: String,
    pub default_group: bool,
    pub internal_notes: Option<String>,
    pub router_ids: Vec<RouterId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//! Database layer for data persistence and access.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (api::handlers - page handlers)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - records)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Transactions
//!
//! Writes that span several tables (saving a router, creating a backup task) open a transaction
//! and build every repository on it:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! Routers::new(&mut tx).update(id, &request).await?;
//! WebadminSettings::new(&mut tx).touch_router_config().await?;
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and are applied at startup through [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;

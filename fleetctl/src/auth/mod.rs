//! Authentication and authorization.
//!
//! # Authentication Methods
//!
//! Methods are tried in order on every request:
//!
//! ## 1. Session Authentication
//!
//! Browser login through `/accounts/login/` with username and password:
//! - Passwords are stored as Argon2id hashes
//! - A signed JWT is stored in an HTTP-only cookie
//! - The user row is re-read on each request so level changes apply immediately
//!
//! ## 2. Proxy Header Authentication
//!
//! A trusted reverse proxy sets a header (default `x-fleetctl-user`) with the username. Unknown
//! users can be created on first sight with a configured default level.
//!
//! Requests with neither are redirected to the login page with a `next` parameter.
//!
//! # Authorization
//!
//! Each account has one numeric level (see [`crate::types::UserLevel`]) and each
//! resource/operation pair needs a minimum level. See [`permissions`].
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for the authenticated user
//! - [`password`]: Password hashing and verification using Argon2
//! - [`permissions`]: Level checks and the `RequiresPermission` extractor
//! - [`session`]: JWT session tokens
//! - [`utils`]: Cookie helpers

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
pub mod utils;

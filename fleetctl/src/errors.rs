use crate::db::errors::DbError;
use crate::templates;
use crate::types::{Operation, Resource, UserLevel};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
};
use minijinja::context;
use serde_json::json;
use thiserror::Error as ThisError;

/// Where unauthenticated browsers are sent
pub const LOGIN_PATH: &str = "/accounts/login/";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated {
        message: Option<String>,
        /// Path (with query) to come back to after logging in
        return_to: Option<String>,
    },

    /// User level is below what the operation needs
    #[error("Insufficient permissions to {action} {resource}")]
    InsufficientPermissions {
        required: UserLevel,
        action: Operation,
        resource: Resource,
    },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::SEE_OTHER,
            Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::ProtectedEntity { .. } => StatusCode::FORBIDDEN,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message, .. } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { action, resource, .. } => {
                format!("You do not have permission to {action} {resource}.")
            }
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, .. } => format!("{resource} not found"),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "The requested page was not found".to_string(),
                DbError::UniqueViolation { table, .. } => match table.as_deref() {
                    Some("users") => "This username is already taken".to_string(),
                    Some("routers") => "A router with this name already exists".to_string(),
                    Some("router_groups") => "A router group with this name already exists".to_string(),
                    Some("ssh_keys") => "An SSH key with this name already exists".to_string(),
                    Some("backup_profiles") => "A backup profile with this name already exists".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::ProtectedEntity {
                    operation,
                    entity_type,
                    reason,
                    ..
                } => {
                    format!("Cannot {operation} {entity_type}: {reason}")
                }
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }

    /// Title shown on the error page
    fn page_title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::FORBIDDEN => "Access Denied",
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::CONFLICT => "Conflict",
            _ => "Server Error",
        }
    }
}

/// Login URL carrying the page to return to
pub fn login_url(return_to: Option<&str>) -> String {
    match return_to {
        Some(next) => {
            let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
            format!("{LOGIN_PATH}?next={encoded}")
        }
        None => LOGIN_PATH.to_string(),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        if let Error::Unauthenticated { return_to, .. } = &self {
            return Redirect::to(&login_url(return_to.as_deref())).into_response();
        }

        let status = self.status_code();
        let template = match &self {
            Error::InsufficientPermissions { .. } => "access_denied.html",
            _ => "error.html",
        };
        let ctx = context! {
            page_title => self.page_title(),
            status => status.as_u16(),
            message => self.user_message(),
        };

        match templates::render(template, ctx) {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render {template}: {e:#}");
                (status, self.user_message()).into_response()
            }
        }
    }
}

/// Error body for JSON endpoints: `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonError {
    pub status: StatusCode,
    pub message: &'static str,
}

impl JsonError {
    pub const fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, "JSON error: {}", self.message);
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url(None), "/accounts/login/");
        assert_eq!(
            login_url(Some("/router/details/?uuid=abc")),
            "/accounts/login/?next=%2Frouter%2Fdetails%2F%3Fuuid%3Dabc"
        );
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let response = Error::Unauthenticated {
            message: None,
            return_to: Some("/router/list/".to_string()),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/accounts/login/?next=%2Frouter%2Flist%2F"
        );
    }

    #[test]
    fn test_permission_error_is_forbidden() {
        let err = Error::InsufficientPermissions {
            required: UserLevel::FLEET_MANAGER,
            action: Operation::Manage,
            resource: Resource::SshKeys,
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.user_message(), "You do not have permission to manage SSH keys.");
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_database_not_found_maps_to_404() {
        let err = Error::Database(DbError::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let err = Error::Internal {
            operation: "connect to 10.0.0.1 with secret".to_string(),
        };
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn test_json_error_status() {
        let response = JsonError::new(StatusCode::METHOD_NOT_ALLOWED, "Invalid request method.").into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

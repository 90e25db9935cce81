use serde::{Deserialize, Serialize};

use crate::{
    db::models::users::UserDBResponse,
    types::{UserId, UserLevel},
};

/// The authenticated user of a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub user_level: UserLevel,
}

impl CurrentUser {
    /// Whether the user's level is at least `level`
    pub fn at_least(&self, level: UserLevel) -> bool {
        self.user_level >= level
    }
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            user_level: db.user_level,
        }
    }
}

/// Login form body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Page to return to, carried through a hidden field
    #[serde(default)]
    pub next: Option<String>,
}

/// `?next=` on the login page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Only local absolute paths without control characters are followed after login
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(|c| c.is_ascii_control()) =>
        {
            path
        }
        _ => "/router/list/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next(Some("/router/details/?uuid=1")), "/router/details/?uuid=1");
        assert_eq!(safe_next(Some("//evil.example/")), "/router/list/");
        assert_eq!(safe_next(Some("https://evil.example/")), "/router/list/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/router/list/");
        assert_eq!(safe_next(None), "/router/list/");
    }

    #[test]
    fn test_safe_next_rejects_control_characters() {
        assert_eq!(safe_next(Some("/\t/evil.example")), "/router/list/");
        assert_eq!(safe_next(Some("/a\nb")), "/router/list/");
        assert_eq!(safe_next(Some("/router/\u{7f}")), "/router/list/");
    }
}

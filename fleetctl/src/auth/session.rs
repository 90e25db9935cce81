//! Signed session tokens carried in the session cookie.
//!
//! The token only identifies the user. The permission level is read from the database on every
//! request, so level changes and deleted accounts take effect without waiting for expiry.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{api::models::users::CurrentUser, config::Config, errors::Error, types::UserId};

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: UserId,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn new(user: &CurrentUser, config: &Config) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id,
            username: user.username.clone(),
            exp: (now + config.auth.security.jwt_expiry).timestamp(),
            iat: now.timestamp(),
        }
    }
}

fn secret(config: &Config) -> Result<&[u8], Error> {
    config
        .secret_key
        .as_deref()
        .map(str::as_bytes)
        .ok_or_else(|| Error::Internal {
            operation: "sign sessions: secret_key is not configured".to_string(),
        })
}

pub fn create_session_token(user: &CurrentUser, config: &Config) -> Result<String, Error> {
    let claims = SessionClaims::new(user, config);
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret(config)?)).map_err(|e| {
        Error::Internal {
            operation: format!("create session token: {e}"),
        }
    })
}

/// Decode a session token.
///
/// Anything wrong with the token itself (bad signature, expired, garbage) is
/// [`Error::Unauthenticated`] so the browser is sent back to the login form. Key and encoding
/// failures on our side are [`Error::Internal`].
pub fn verify_session_token(token: &str, config: &Config) -> Result<SessionClaims, Error> {
    let key = DecodingKey::from_secret(secret(config)?);

    jsonwebtoken::decode::<SessionClaims>(token, &key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::RsaFailedSigning
            | ErrorKind::InvalidKeyFormat
            | ErrorKind::Crypto(_) => Error::Internal {
                operation: format!("verify session token: {e}"),
            },
            _ => Error::Unauthenticated {
                message: None,
                return_to: None,
            },
        })
}

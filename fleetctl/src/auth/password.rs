//! Argon2id password hashes for console accounts.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use crate::{config::PasswordConfig, errors::Error};

/// Cost parameters for new hashes. Existing hashes carry their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<&PasswordConfig> for Argon2Params {
    fn from(config: &PasswordConfig) -> Self {
        Self {
            memory_kib: config.argon2_memory_kib,
            iterations: config.argon2_iterations,
            parallelism: config.argon2_parallelism,
        }
    }
}

impl Argon2Params {
    fn argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("argon2 parameters {self:?}: {e}"),
        })?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hash a password with the configured cost
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, Error> {
    let argon2 = Argon2Params::from(config).argon2()?;
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal {
            operation: format!("hash password: {e}"),
        })
}

/// Check `input` against a stored PHC hash string
pub fn verify_string(input: &str, hash: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(hash).map_err(|e| Error::Internal {
        operation: format!("parse password hash: {e}"),
    })?;
    Ok(Argon2::default().verify_password(input.as_bytes(), &parsed).is_ok())
}

/// Verify a login password off the async runtime. A stored hash that cannot be parsed never matches.
#[instrument(skip_all)]
pub async fn verify_password(password: String, hash: String) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || verify_string(&password, &hash).unwrap_or(false))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join password verification task: {e}"),
        })
}

/// Check a new password against the configured length limits
pub fn validate_password_length(password: &str, config: &PasswordConfig) -> Result<(), String> {
    let length = password.chars().count();
    if length < config.min_length {
        return Err(format!("Password must be at least {} characters", config.min_length));
    }
    if length > config.max_length {
        return Err(format!("Password must be at most {} characters", config.max_length));
    }
    Ok(())
}

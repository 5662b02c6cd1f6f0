//! Argon2id password hashing and verification.
//!
//! Hashes are stored as PHC strings, so the algorithm parameters and salt
//! travel with each hash. Parameters are the argon2 crate defaults; changing
//! them only affects new hashes.

use anyhow::anyhow;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use super::error::AuthError;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Reject passwords outside the accepted length range.
pub(super) fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with a fresh random salt.
pub(super) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Unexpected(anyhow!("failed to hash password: {err}")))
}

/// Verify a password against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch; only malformed hashes are errors.
pub(super) fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|err| AuthError::Unexpected(anyhow!("stored password hash is invalid: {err}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AuthError::Unexpected(anyhow!(
            "failed to verify password: {err}"
        ))),
    }
}

//! Small helpers for auth validation and secret generation.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Bytes of entropy in session and reset tokens.
const TOKEN_BYTES: usize = 32;

/// Number of digits in an emailed verification code. Part of the UI contract;
/// expiry plus single-use bounds the brute-force window.
pub(super) const VERIFICATION_CODE_DIGITS: usize = 6;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Create a new session or reset token.
///
/// The raw value is only ever sent to the user; the database stores a hash.
pub(super) fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Create a new 6-digit verification code.
///
/// Rejection sampling on 32-bit draws keeps the distribution uniform over
/// the full digit range.
pub(super) fn generate_verification_code() -> Result<String> {
    const RANGE: u32 = 10u32.pow(VERIFICATION_CODE_DIGITS as u32);
    const LIMIT: u32 = u32::MAX - (u32::MAX % RANGE);
    loop {
        let mut bytes = [0u8; 4];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate verification code")?;
        let draw = u32::from_be_bytes(bytes);
        if draw < LIMIT {
            return Ok(format!(
                "{:0width$}",
                draw % RANGE,
                width = VERIFICATION_CODE_DIGITS
            ));
        }
    }
}

/// Hash a secret value so raw tokens and codes never touch the database.
/// The hash is used for lookups when the value is presented back.
pub(super) fn hash_secret(value: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().to_vec()
}

/// Build the frontend reset link included in outbound emails.
///
/// The token rides in the fragment so it stays out of server access logs.
pub(super) fn build_reset_url(frontend_base_url: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/reset-password#token={token}")
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

//! # Accesso (Email/Password Authentication Service)
//!
//! `accesso` is a standalone authentication service: user registration with
//! email verification, password login, session cookies, and password reset.
//!
//! ## Credentials & Artifacts
//!
//! - **Passwords:** stored as Argon2id PHC strings, never in plaintext.
//! - **Session and reset tokens:** 32 random bytes, URL-safe base64; the
//!   database only stores a SHA-256 hash of each value.
//! - **Verification codes:** 6 decimal digits, drawn uniformly from a
//!   cryptographically secure source, delivered by email.
//! - **Single-use:** consuming an artifact deletes it in the same transaction
//!   that applies its effect, so no value can be redeemed twice.
//!
//! ## Session Policy
//!
//! Each user has at most one active session set: a successful login deletes
//! all prior sessions before issuing a new cookie. A password reset also
//! revokes every session for the account. Expiry is checked lazily on lookup;
//! expired rows are never resurrected.
//!
//! ## Enumeration Resistance
//!
//! Login failures, unknown emails, and expired sessions all surface the same
//! `401 Unauthorized`. Password reset and resend-verification requests return
//! identical success responses whether or not the account exists.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}

//! Database operations for users, sessions, and verification artifacts.
//!
//! Single-use semantics live here: consuming an artifact is a conditional
//! `DELETE ... RETURNING` plus its effect inside one transaction, so of two
//! concurrent consumers at most one can succeed, regardless of how many
//! service instances are running.

use anyhow::{Context, Result, anyhow};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::error::{ArtifactKind, AuthError};
use super::state::AuthConfig;
use super::types::UserBody;
use super::utils::{
    build_reset_url, generate_token, generate_verification_code, hash_secret, is_unique_violation,
};
use crate::api::email;

/// Row shape returned for user-facing responses.
pub(super) struct UserRecord {
    pub(super) id: Uuid,
    pub(super) email: String,
    pub(super) email_verified: bool,
}

/// Fields needed to check a password login.
pub(super) struct LoginRecord {
    pub(super) user_id: Uuid,
    pub(super) email: String,
    pub(super) email_verified: bool,
    pub(super) password_hash: String,
}

/// Minimal data returned for a valid session token.
pub(crate) struct SessionRecord {
    pub(crate) user_id: Uuid,
    pub(crate) email: String,
    pub(crate) email_verified: bool,
}

impl UserRecord {
    pub(super) fn into_body(self) -> UserBody {
        UserBody {
            id: self.id.to_string(),
            email: self.email,
            email_verified: self.email_verified,
        }
    }
}

impl LoginRecord {
    pub(super) fn into_body(self) -> UserBody {
        UserBody {
            id: self.user_id.to_string(),
            email: self.email,
            email_verified: self.email_verified,
        }
    }
}

impl SessionRecord {
    pub(crate) fn into_body(self) -> UserBody {
        UserBody {
            id: self.user_id.to_string(),
            email: self.email,
            email_verified: self.email_verified,
        }
    }
}

/// Create the user and their first verification code in one transaction.
///
/// The verification email is enqueued in the same transaction, so a user row
/// never exists without a deliverable code.
pub(super) async fn insert_user_and_verification(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    config: &AuthConfig,
) -> Result<UserRecord, AuthError> {
    let mut tx = pool.begin().await.context("begin signup transaction")?;

    let query = r"
        INSERT INTO users (email, password_hash)
        VALUES ($1, $2)
        RETURNING id, email, email_verified
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let user = match row {
        Ok(row) => UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            email_verified: row.get("email_verified"),
        },
        Err(err) => {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Err(AuthError::DuplicateEmail);
            }
            return Err(AuthError::from(
                anyhow::Error::new(err).context("failed to insert user"),
            ));
        }
    };

    let _code = issue_verification_code(&mut tx, user.id, &user.email, config).await?;

    tx.commit().await.context("commit signup transaction")?;

    Ok(user)
}

/// Look up login data by email (absent means the caller sees `Unauthenticated`).
pub(super) async fn lookup_login_record(
    pool: &PgPool,
    email: &str,
) -> Result<Option<LoginRecord>, AuthError> {
    let query = "SELECT id, email, email_verified, password_hash FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup login record")?;

    Ok(row.map(|row| LoginRecord {
        user_id: row.get("id"),
        email: row.get("email"),
        email_verified: row.get("email_verified"),
        password_hash: row.get("password_hash"),
    }))
}

/// Issue a session token for the user.
///
/// Single-active-session policy: all prior sessions for the user are deleted
/// first, so a new login supersedes older ones everywhere.
pub(super) async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<String, AuthError> {
    let query = "DELETE FROM sessions WHERE user_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete prior sessions")?;

    // Generate a random token, store only its hash, and return the raw value
    // so the caller can set the session cookie.
    let query = r"
        INSERT INTO sessions (user_id, token_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_token()?;
        let token_hash = hash_secret(&token);
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => {
                return Err(AuthError::from(
                    anyhow::Error::new(err).context("failed to insert session"),
                ));
            }
        }
    }

    Err(AuthError::Unexpected(anyhow!(
        "failed to generate unique session token"
    )))
}

/// Resolve a session token hash; expiry is checked in the query itself.
pub(super) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionRecord>, AuthError> {
    let query = r"
        SELECT users.id, users.email, users.email_verified
        FROM sessions
        JOIN users ON users.id = sessions.user_id
        WHERE sessions.token_hash = $1
          AND sessions.expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    Ok(row.map(|row| SessionRecord {
        user_id: row.get("id"),
        email: row.get("email"),
        email_verified: row.get("email_verified"),
    }))
}

/// Delete a session row. Signout is idempotent; deleting nothing is fine.
pub(super) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<(), AuthError> {
    let query = "DELETE FROM sessions WHERE token_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

/// Re-issue a verification code for an unverified account.
///
/// Unknown emails are a silent no-op so the endpoint cannot be used to probe
/// for accounts; an already-verified account is a real business error.
pub(super) async fn request_resend(
    pool: &PgPool,
    email: &str,
    config: &AuthConfig,
) -> Result<(), AuthError> {
    let mut tx = pool.begin().await.context("begin resend transaction")?;

    let query = "SELECT id, email, email_verified FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to lookup user for resend")?;

    let Some(row) = row else {
        tx.commit().await.context("commit resend noop")?;
        return Ok(());
    };

    if row.get::<bool, _>("email_verified") {
        let _ = tx.rollback().await;
        return Err(AuthError::AlreadyVerified);
    }

    let user_id: Uuid = row.get("id");
    let user_email: String = row.get("email");
    let _code = issue_verification_code(&mut tx, user_id, &user_email, config).await?;

    tx.commit().await.context("commit resend transaction")?;
    Ok(())
}

/// Issue a reset token if the account exists; unknown emails are a no-op.
///
/// The caller returns the same success response either way.
pub(super) async fn request_password_reset(
    pool: &PgPool,
    email: &str,
    config: &AuthConfig,
) -> Result<(), AuthError> {
    let mut tx = pool.begin().await.context("begin reset request transaction")?;

    let query = "SELECT id, email FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to lookup user for reset")?;

    let Some(row) = row else {
        tx.commit().await.context("commit reset noop")?;
        return Ok(());
    };

    let user_id: Uuid = row.get("id");
    let user_email: String = row.get("email");
    let _token = issue_reset_token(&mut tx, user_id, &user_email, config).await?;

    tx.commit().await.context("commit reset request transaction")?;
    Ok(())
}

/// Consume a verification code and mark the user verified, atomically.
pub(super) async fn consume_verification_code(
    pool: &PgPool,
    email: &str,
    code_hash: &[u8],
) -> Result<(), AuthError> {
    let kind = ArtifactKind::EmailVerification;
    let mut tx = pool.begin().await.context("begin verify transaction")?;

    let query = "SELECT id, email_verified FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to lookup user for verification")?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        // An unknown account reads the same as a wrong code.
        return Err(AuthError::InvalidArtifact(kind));
    };
    let user_id: Uuid = row.get("id");
    let email_verified: bool = row.get("email_verified");

    // Conditional delete: of two concurrent consumers, only one sees the row.
    let query = r"
        DELETE FROM verification_artifacts
        WHERE user_id = $1
          AND value_hash = $2
          AND kind = $3
        RETURNING (expires_at <= NOW()) AS expired
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(code_hash)
        .bind(kind.as_str())
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume verification code")?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Err(AuthError::InvalidArtifact(kind));
    };

    if row.get::<bool, _>("expired") {
        // Keep the delete: an expired code is permanently unusable.
        tx.commit().await.context("commit expired code cleanup")?;
        return Err(AuthError::ExpiredArtifact(kind));
    }

    if email_verified {
        let _ = tx.rollback().await;
        return Err(AuthError::AlreadyVerified);
    }

    let query = "UPDATE users SET email_verified = TRUE, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to mark email verified")?;

    tx.commit().await.context("commit verify transaction")?;
    Ok(())
}

/// Consume a reset token and overwrite the password, atomically.
///
/// A successful reset also revokes every session for the user: whoever holds
/// the email account should end up as the only authenticated party.
pub(super) async fn consume_reset_token(
    pool: &PgPool,
    token_hash: &[u8],
    new_password_hash: &str,
) -> Result<(), AuthError> {
    let kind = ArtifactKind::PasswordReset;
    let mut tx = pool.begin().await.context("begin reset transaction")?;

    let query = r"
        DELETE FROM verification_artifacts
        WHERE value_hash = $1
          AND kind = $2
        RETURNING user_id, (expires_at <= NOW()) AS expired
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(kind.as_str())
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume reset token")?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Err(AuthError::InvalidArtifact(kind));
    };

    if row.get::<bool, _>("expired") {
        // Keep the delete: retrying an expired token must fail as invalid.
        tx.commit().await.context("commit expired token cleanup")?;
        return Err(AuthError::ExpiredArtifact(kind));
    }

    let user_id: Uuid = row.get("user_id");
    let query = "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(new_password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update password")?;

    let query = "DELETE FROM sessions WHERE user_id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to revoke sessions after reset")?;

    tx.commit().await.context("commit reset transaction")?;
    Ok(())
}

/// Replace the user's pending verification code and enqueue its email.
async fn issue_verification_code(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    email: &str,
    config: &AuthConfig,
) -> Result<String> {
    let code = generate_verification_code()?;
    let value_hash = hash_secret(&code);
    insert_artifact(
        tx,
        user_id,
        &value_hash,
        ArtifactKind::EmailVerification,
        config.verification_code_ttl_seconds(),
    )
    .await?;

    let message = email::verification_email(email, &code);
    email::enqueue(tx, &message).await?;

    Ok(code)
}

/// Replace the user's pending reset token and enqueue its email.
async fn issue_reset_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    email: &str,
    config: &AuthConfig,
) -> Result<String> {
    let token = generate_token()?;
    let value_hash = hash_secret(&token);
    insert_artifact(
        tx,
        user_id,
        &value_hash,
        ArtifactKind::PasswordReset,
        config.reset_token_ttl_seconds(),
    )
    .await?;

    let reset_url = build_reset_url(config.frontend_base_url(), &token);
    let message = email::password_reset_email(email, &reset_url);
    email::enqueue(tx, &message).await?;

    Ok(token)
}

async fn insert_artifact(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    value_hash: &[u8],
    kind: ArtifactKind,
    ttl_seconds: i64,
) -> Result<()> {
    // Replace any prior pending artifact of this kind for the user.
    let query = "DELETE FROM verification_artifacts WHERE user_id = $1 AND kind = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(kind.as_str())
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to delete prior artifact")?;

    let query = r"
        INSERT INTO verification_artifacts (user_id, value_hash, kind, expires_at)
        VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(value_hash)
        .bind(kind.as_str())
        .bind(ttl_seconds)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert verification artifact")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LoginRecord, SessionRecord, UserRecord};
    use uuid::Uuid;

    #[test]
    fn user_record_holds_values() {
        let record = UserRecord {
            id: Uuid::nil(),
            email: "alice@example.com".to_string(),
            email_verified: false,
        };
        assert_eq!(record.id, Uuid::nil());
        assert_eq!(record.email, "alice@example.com");
        assert!(!record.email_verified);
    }

    #[test]
    fn login_record_holds_values() {
        let record = LoginRecord {
            user_id: Uuid::nil(),
            email: "alice@example.com".to_string(),
            email_verified: true,
            password_hash: "$argon2id$stub".to_string(),
        };
        assert_eq!(record.user_id, Uuid::nil());
        assert!(record.email_verified);
        assert!(record.password_hash.starts_with("$argon2id$"));
    }

    #[test]
    fn session_record_holds_values() {
        let record = SessionRecord {
            user_id: Uuid::nil(),
            email: "alice@example.com".to_string(),
            email_verified: true,
        };
        assert_eq!(record.email, "alice@example.com");
        assert!(record.email_verified);
    }
}

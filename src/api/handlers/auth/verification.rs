//! Email verification endpoints.

use axum::{Json, extract::Extension};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::state::AuthState;
use super::storage;
use super::types::{MessageResponse, ResendVerificationRequest, VerifyEmailRequest};
use super::utils::{hash_secret, normalize_email, valid_email};

/// Consume a verification code and flip the account's verified flag.
#[utoipa::path(
    post,
    path = "/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid, expired, or already-consumed code", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    pool: Extension<PgPool>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }
    let code = request.code.trim();
    if code.is_empty() {
        return Err(AuthError::Validation("Missing code".to_string()));
    }

    // Hash the code before lookup; raw values are never stored server-side.
    let code_hash = hash_secret(code);
    storage::consume_verification_code(&pool, &email, &code_hash).await?;

    Ok(Json(MessageResponse {
        message: "Email verified successfully".to_string(),
    }))
}

/// Re-send the verification email.
///
/// Unknown emails get the same success body as real ones so this endpoint
/// cannot confirm whether an account exists.
#[utoipa::path(
    post,
    path = "/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Verification email sent if the account needs one", body = MessageResponse),
        (status = 400, description = "Malformed email or already verified", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResendVerificationRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }

    storage::request_resend(&pool, &email, auth_state.config()).await?;

    Ok(Json(MessageResponse {
        message: "Verification email sent".to_string(),
    }))
}

//! Password reset endpoints.

use axum::{Json, extract::Extension};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::password::{hash_password, validate_password};
use super::state::AuthState;
use super::storage;
use super::types::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest};
use super::utils::{hash_secret, normalize_email, valid_email};

/// The body is identical whether or not the account exists.
const RESET_REQUESTED_MESSAGE: &str =
    "If that account exists, a password reset email has been sent";

/// Request a password reset email.
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent if the account exists", body = MessageResponse),
        (status = 400, description = "Malformed email", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }

    storage::request_password_reset(&pool, &email, auth_state.config()).await?;

    Ok(Json(MessageResponse {
        message: RESET_REQUESTED_MESSAGE.to_string(),
    }))
}

/// Consume a reset token and store the new password.
///
/// Success revokes every session for the account.
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Invalid or expired token, or weak password", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let token = request.token.trim();
    if token.is_empty() {
        return Err(AuthError::Validation("Missing token".to_string()));
    }
    validate_password(&request.new_password)?;

    let token_hash = hash_secret(token);
    let password_hash = hash_password(&request.new_password)?;
    storage::consume_reset_token(&pool, &token_hash, &password_hash).await?;

    Ok(Json(MessageResponse {
        message: "Password reset successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::{RESET_REQUESTED_MESSAGE, forgot_password, reset_password};
    use crate::api::handlers::auth::state::{AuthConfig, AuthState};
    use crate::api::handlers::auth::types::{ForgotPasswordRequest, ResetPasswordRequest};
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn auth_state() -> Arc<AuthState> {
        Arc::new(AuthState::new(AuthConfig::new(
            "https://accesso.dev".to_string(),
        )))
    }

    #[test]
    fn reset_message_does_not_mention_existence() {
        assert!(!RESET_REQUESTED_MESSAGE.contains("not"));
        assert!(RESET_REQUESTED_MESSAGE.starts_with("If that account exists"));
    }

    #[tokio::test]
    async fn forgot_password_missing_payload() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = forgot_password(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn forgot_password_invalid_email() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = forgot_password(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(ForgotPasswordRequest {
                email: "not-an-email".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_missing_token() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = reset_password(
            Extension(pool),
            Some(Json(ResetPasswordRequest {
                token: " ".to_string(),
                new_password: "long-enough-password".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_weak_password() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = reset_password(
            Extension(pool),
            Some(Json(ResetPasswordRequest {
                token: "some-token".to_string(),
                new_password: "short".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}

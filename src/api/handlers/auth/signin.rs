//! Signin endpoint.

use anyhow::Context;
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::password::verify_password;
use super::session::session_cookie;
use super::state::AuthState;
use super::storage;
use super::types::{AuthResponse, NeedsVerificationResponse, SigninRequest};
use super::utils::{normalize_email, valid_email};

/// Authenticate with email and password.
///
/// Unknown email and wrong password produce the same `401`. Valid credentials
/// on an unverified account return `needsVerification` and no cookie.
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in, or verification still required", body = AuthResponse),
        (status = 400, description = "Malformed request", body = super::error::ErrorBody),
        (status = 401, description = "Invalid email or password", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn signin(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SigninRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }
    if request.password.is_empty() {
        return Err(AuthError::Validation("Password is required".to_string()));
    }

    let record = storage::lookup_login_record(&pool, &email)
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    if !verify_password(&request.password, &record.password_hash)? {
        return Err(AuthError::Unauthenticated);
    }

    if !record.email_verified {
        // Credentials are fine but the account is not usable yet; no cookie.
        let body = NeedsVerificationResponse {
            needs_verification: true,
        };
        return Ok((StatusCode::OK, Json(body)).into_response());
    }

    let config = auth_state.config();
    let token = storage::create_session(&pool, record.user_id, config.session_ttl_seconds()).await?;

    let mut headers = HeaderMap::new();
    let cookie = session_cookie(config, &token).context("failed to build session cookie")?;
    headers.insert(SET_COOKIE, cookie);

    let body = AuthResponse {
        user: record.into_body(),
        token,
    };
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::signin;
    use crate::api::handlers::auth::state::{AuthConfig, AuthState};
    use crate::api::handlers::auth::types::SigninRequest;
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

    #[tokio::test]
    async fn signin_missing_payload() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = signin(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn signin_invalid_email() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = signin(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(SigninRequest {
                email: "nope".to_string(),
                password: "some-password".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn signin_empty_password() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = signin(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(SigninRequest {
                email: "alice@example.com".to_string(),
                password: String::new(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}

//! Signup endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::password::{hash_password, validate_password};
use super::session::session_cookie;
use super::state::AuthState;
use super::storage;
use super::types::{AuthResponse, SignupRequest};
use super::utils::{normalize_email, valid_email};

/// Create an account, enqueue its verification email, and start a session.
///
/// The session is issued immediately; verification gates later signins, not
/// the signup response itself.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid email or password", body = super::error::ErrorBody),
        (status = 409, description = "Email already registered", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn signup(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }
    validate_password(&request.password)?;

    let password_hash = hash_password(&request.password)?;

    let config = auth_state.config();
    let user =
        storage::insert_user_and_verification(&pool, &email, &password_hash, config).await?;
    let token = storage::create_session(&pool, user.id, config.session_ttl_seconds()).await?;

    let mut headers = HeaderMap::new();
    let cookie = session_cookie(config, &token).context("failed to build session cookie")?;
    headers.insert(SET_COOKIE, cookie);

    let body = AuthResponse {
        user: user.into_body(),
        token,
    };
    Ok((StatusCode::CREATED, headers, Json(body)).into_response())
}

//! API handlers for Accesso.
//!
//! Auth endpoints live under [`auth`]; [`health`] and [`logs`] cover the
//! operational surface.

pub mod auth;
pub mod health;
pub mod logs;

use axum::response::IntoResponse;
use self::auth::AuthError;

/// Service identity for `/`.
pub async fn root() -> impl IntoResponse {
    crate::APP_USER_AGENT
}

/// JSON 404 fallback so unmatched routes share the error body shape.
pub async fn not_found() -> AuthError {
    AuthError::NotFound
}

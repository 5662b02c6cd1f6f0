//! OpenAPI document generation.
//!
//! Handlers carry `#[utoipa::path]` annotations; this module collects them
//! into one document served at `/openapi.json`.

use axum::{Json, response::IntoResponse};
use utoipa::OpenApi;

use super::handlers;
use super::reqlog;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "accesso",
        description = "Email/password authentication service with sessions and verification flows"
    ),
    paths(
        handlers::health::health,
        handlers::logs::logs,
        handlers::auth::signup::signup,
        handlers::auth::signin::signin,
        handlers::auth::session::session,
        handlers::auth::session::signout,
        handlers::auth::verification::verify_email,
        handlers::auth::verification::resend_verification,
        handlers::auth::reset::forgot_password,
        handlers::auth::reset::reset_password,
    ),
    components(schemas(
        handlers::health::Health,
        handlers::auth::error::ErrorBody,
        handlers::auth::types::SignupRequest,
        handlers::auth::types::SigninRequest,
        handlers::auth::types::VerifyEmailRequest,
        handlers::auth::types::ResendVerificationRequest,
        handlers::auth::types::ForgotPasswordRequest,
        handlers::auth::types::ResetPasswordRequest,
        handlers::auth::types::UserBody,
        handlers::auth::types::AuthResponse,
        handlers::auth::types::NeedsVerificationResponse,
        handlers::auth::types::MessageResponse,
        handlers::auth::types::SessionResponse,
        reqlog::RequestLogEntry,
    )),
    tags(
        (name = "auth", description = "Signup, sessions, verification, and password reset"),
        (name = "health", description = "Service health"),
        (name = "logs", description = "Request log viewer")
    )
)]
pub struct ApiDoc;

/// Serve the generated document as JSON.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use anyhow::{Context, Result};
    use utoipa::OpenApi;

    #[test]
    fn document_lists_every_route() -> Result<()> {
        let value = serde_json::to_value(ApiDoc::openapi())?;
        let paths = value
            .get("paths")
            .and_then(serde_json::Value::as_object)
            .context("missing paths object")?;

        for route in [
            "/health",
            "/logs",
            "/auth/signup",
            "/auth/signin",
            "/auth/session",
            "/auth/signout",
            "/auth/verify-email",
            "/auth/resend-verification",
            "/auth/forgot-password",
            "/auth/reset-password",
        ] {
            assert!(paths.contains_key(route), "missing route: {route}");
        }
        Ok(())
    }

    #[test]
    fn document_has_error_schema() -> Result<()> {
        let value = serde_json::to_value(ApiDoc::openapi())?;
        let schemas = value
            .pointer("/components/schemas")
            .and_then(serde_json::Value::as_object)
            .context("missing schemas object")?;
        assert!(schemas.contains_key("ErrorBody"));
        assert!(schemas.contains_key("AuthResponse"));
        Ok(())
    }
}

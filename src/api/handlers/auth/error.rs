//! Typed auth failures and their HTTP mapping.
//!
//! Storage and workflow code raise [`AuthError`]; the boundary turns each
//! variant into a status code and a stable, non-leaking `{"error": ...}`
//! body. Credential and session failures all collapse into
//! [`AuthError::Unauthenticated`] so callers cannot distinguish "unknown
//! email" from "wrong password" or "expired session".

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Error body shape shared by every non-2xx response.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

/// Which single-use artifact a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    EmailVerification,
    PasswordReset,
}

impl ArtifactKind {
    /// Database tag; part of every artifact lookup so kinds never cross.
    pub(super) const fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::EmailVerification => "verification code",
            Self::PasswordReset => "reset token",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("A user with this email already exists")]
    DuplicateEmail,

    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Email is not verified")]
    Unverified,

    #[error("Not found")]
    NotFound,

    #[error("Invalid {0}")]
    InvalidArtifact(ArtifactKind),

    #[error("Expired {0}")]
    ExpiredArtifact(ArtifactKind),

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("Internal server error")]
    Unexpected(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidArtifact(_)
            | Self::ExpiredArtifact(_)
            | Self::AlreadyVerified => StatusCode::BAD_REQUEST,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Unverified => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Unexpected(err) = &self {
            // Log the cause chain; the client only sees a generic message.
            error!("Unexpected auth failure: {err:#}");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

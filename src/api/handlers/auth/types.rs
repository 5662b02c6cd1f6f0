//! Request/response types for auth endpoints.
//!
//! Passwords arrive as plain strings inside TLS-terminated request bodies;
//! the manual `Debug` impls keep them out of logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SigninRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigninRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

impl fmt::Debug for ResetPasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetPasswordRequest")
            .field("token", &self.token)
            .field("new_password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserBody {
    pub id: String,
    pub email: String,
    pub email_verified: bool,
}

/// Successful signup/signin body; the token also travels in the cookie.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub user: UserBody,
    pub token: String,
}

/// Signin outcome for valid credentials on an unverified account.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NeedsVerificationResponse {
    pub needs_verification: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user: UserBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn signup_request_round_trips() -> Result<()> {
        let request: SignupRequest =
            serde_json::from_str(r#"{"email":"alice@example.com","password":"hunter2hunter2"}"#)?;
        assert_eq!(request.email, "alice@example.com");
        assert_eq!(request.password, "hunter2hunter2");
        Ok(())
    }

    #[test]
    fn debug_redacts_passwords() {
        let signup = SignupRequest {
            email: "alice@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
        };
        let rendered = format!("{signup:?}");
        assert!(rendered.contains("alice@example.com"));
        assert!(!rendered.contains("hunter2"));

        let reset = ResetPasswordRequest {
            token: "token".to_string(),
            new_password: "hunter2hunter2".to_string(),
        };
        let rendered = format!("{reset:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn reset_request_uses_camel_case() -> Result<()> {
        let request: ResetPasswordRequest =
            serde_json::from_str(r#"{"token":"abc","newPassword":"hunter2hunter2"}"#)?;
        assert_eq!(request.token, "abc");
        assert_eq!(request.new_password, "hunter2hunter2");
        Ok(())
    }

    #[test]
    fn user_body_serializes_camel_case() -> Result<()> {
        let user = UserBody {
            id: "id".to_string(),
            email: "bob@example.com".to_string(),
            email_verified: true,
        };
        let value = serde_json::to_value(&user)?;
        let verified = value
            .get("emailVerified")
            .and_then(serde_json::Value::as_bool)
            .context("missing emailVerified")?;
        assert!(verified);
        Ok(())
    }

    #[test]
    fn needs_verification_serializes_camel_case() -> Result<()> {
        let body = NeedsVerificationResponse {
            needs_verification: true,
        };
        let value = serde_json::to_value(&body)?;
        assert!(value.get("needsVerification").is_some());
        Ok(())
    }
}

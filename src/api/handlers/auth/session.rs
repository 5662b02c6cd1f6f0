//! Session endpoints for cookie and bearer auth.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::error::AuthError;
use super::state::{AuthConfig, AuthState};
use super::storage::{SessionRecord, delete_session, lookup_session};
use super::types::SessionResponse;
use super::utils::hash_secret;

const SESSION_COOKIE_NAME: &str = "accesso_session";

/// Resolve the current session into the owning user.
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 401, description = "Missing or expired session", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<Json<SessionResponse>, AuthError> {
    let record = authenticate_session(&headers, &pool)
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    Ok(Json(SessionResponse {
        user: record.into_body(),
    }))
}

/// Resolve a session cookie or bearer token into a session record.
///
/// Returns `Ok(None)` when no valid session is presented; only infrastructure
/// failures are errors.
pub(crate) async fn authenticate_session(
    headers: &HeaderMap,
    pool: &PgPool,
) -> Result<Option<SessionRecord>, AuthError> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    // Only the hash is stored; never compare raw tokens against the database.
    let token_hash = hash_secret(&token);
    lookup_session(pool, &token_hash).await
}

/// Delete the presented session and clear the cookie.
#[utoipa::path(
    post,
    path = "/auth/signout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn signout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        let token_hash = hash_secret(&token);
        if let Err(err) = delete_session(&pool, &token_hash).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Build the `HttpOnly` session cookie for a freshly issued token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::AuthConfig;
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    fn auth_state() -> Arc<AuthState> {
        Arc::new(AuthState::new(AuthConfig::new(
            "https://accesso.dev".to_string(),
        )))
    }

    #[test]
    fn session_cookie_sets_policy_attributes() {
        let config = AuthConfig::new("https://accesso.dev".to_string()).with_session_ttl_seconds(60);
        let cookie = session_cookie(&config, "token-value").expect("valid cookie");
        let cookie = cookie.to_str().expect("ascii cookie");

        assert!(cookie.starts_with("accesso_session=token-value"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=60"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn session_cookie_omits_secure_for_http_frontend() {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        let cookie = session_cookie(&config, "token-value").expect("valid cookie");
        assert!(!cookie.to_str().expect("ascii cookie").contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let config = AuthConfig::new("https://accesso.dev".to_string());
        let cookie = clear_session_cookie(&config).expect("valid cookie");
        assert!(cookie.to_str().expect("ascii cookie").contains("Max-Age=0"));
    }

    #[test]
    fn extract_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("other=1; accesso_session=raw-token; theme=dark"),
        );
        assert_eq!(
            extract_session_token(&headers),
            Some("raw-token".to_string())
        );
    }

    #[test]
    fn extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("accesso_session=from-cookie"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc".to_string()));
    }

    #[test]
    fn extract_token_none_when_missing() {
        assert_eq!(extract_session_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[tokio::test]
    async fn session_without_cookie_is_unauthorized() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = session(HeaderMap::new(), Extension(pool))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn signout_without_cookie_still_clears() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = signout(HeaderMap::new(), Extension(pool), Extension(auth_state()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(SET_COOKIE));
        Ok(())
    }
}

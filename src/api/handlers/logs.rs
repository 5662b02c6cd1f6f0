//! Request-log viewer endpoint.

use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::auth::error::AuthError;
use super::auth::session::authenticate_session;
use crate::api::reqlog::{RequestLog, RequestLogEntry};

/// Recent request-log entries, oldest first.
///
/// Requires an active session for a verified account; the buffer contains
/// paths and timings for every non-internal request handled since startup.
#[utoipa::path(
    get,
    path = "/logs",
    responses(
        (status = 200, description = "Recent request log entries", body = [RequestLogEntry]),
        (status = 401, description = "Missing or expired session", body = super::auth::error::ErrorBody),
        (status = 403, description = "Account email is not verified", body = super::auth::error::ErrorBody)
    ),
    tag = "logs"
)]
pub async fn logs(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    request_log: Extension<Arc<RequestLog>>,
) -> Result<impl IntoResponse, AuthError> {
    let record = authenticate_session(&headers, &pool)
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    if !record.email_verified {
        return Err(AuthError::Unverified);
    }

    Ok(Json(request_log.entries()))
}

#[cfg(test)]
mod tests {
    use super::logs;
    use crate::api::reqlog::RequestLog;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    #[tokio::test]
    async fn logs_require_a_session() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request_log = Arc::new(RequestLog::with_capacity(10));
        let response = logs(HeaderMap::new(), Extension(pool), Extension(request_log))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}

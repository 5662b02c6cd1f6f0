use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post},
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;
use url::Url;

// Keep these internal to the crate while allowing CLI/server wiring to reference them.
pub(crate) mod email;
pub(crate) mod handlers;
pub(crate) mod reqlog;
// OpenAPI document generation lives in openapi.rs.
mod openapi;

use self::handlers::auth::{AuthConfig, AuthState};
use self::reqlog::RequestLog;

/// Matches the bound the original log viewer kept in memory.
const REQUEST_LOG_CAPACITY: usize = 1000;

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: AuthConfig,
    email_config: email::EmailWorkerConfig,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let auth_state = Arc::new(AuthState::new(auth_config));
    let request_log = Arc::new(RequestLog::with_capacity(REQUEST_LOG_CAPACITY));

    // Background worker polls email_outbox (DB-backed queue) for pending rows,
    // delivers them through the configured sender, and retries failures.
    email::spawn_outbox_worker(pool.clone(), Arc::new(email::LogEmailSender), email_config);

    let frontend_origin = frontend_origin(auth_state.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = router().layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(auth_state.clone()))
            .layer(Extension(request_log.clone()))
            .layer(middleware::from_fn(reqlog::record_request))
            .layer(Extension(pool.clone())),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the application router with all routes registered.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health::health))
        .route("/openapi.json", get(openapi::openapi_json))
        .route("/logs", get(handlers::logs::logs))
        .route("/auth/signup", post(handlers::auth::signup::signup))
        .route("/auth/signin", post(handlers::auth::signin::signin))
        .route("/auth/signout", post(handlers::auth::session::signout))
        .route("/auth/session", get(handlers::auth::session::session))
        .route(
            "/auth/verify-email",
            post(handlers::auth::verification::verify_email),
        )
        .route(
            "/auth/resend-verification",
            post(handlers::auth::verification::resend_verification),
        )
        .route(
            "/auth/forgot-password",
            post(handlers::auth::reset::forgot_password),
        )
        .route(
            "/auth/reset-password",
            post(handlers::auth::reset::reset_password),
        )
        .fallback(handlers::not_found)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to install shutdown signal handler: {err}");
        return;
    }
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::frontend_origin;

    #[test]
    fn frontend_origin_strips_path() {
        let origin = frontend_origin("https://app.accesso.dev/some/path").expect("valid URL");
        assert_eq!(origin, "https://app.accesso.dev");
    }

    #[test]
    fn frontend_origin_keeps_explicit_port() {
        let origin = frontend_origin("http://localhost:3000").expect("valid URL");
        assert_eq!(origin, "http://localhost:3000");
    }

    #[test]
    fn frontend_origin_rejects_invalid_url() {
        assert!(frontend_origin("not a url").is_err());
    }
}

//! Auth configuration and shared state.
//!
//! Every expiry horizon lives here, once: earlier iterations of this service
//! carried the same TTLs hard-coded in several disagreeing places.

const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_VERIFICATION_CODE_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    session_ttl_seconds: i64,
    verification_code_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            verification_code_ttl_seconds: DEFAULT_VERIFICATION_CODE_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_verification_code_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verification_code_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(super) fn verification_code_ttl_seconds(&self) -> i64 {
        self.verification_code_ttl_seconds
    }

    pub(super) fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    /// Cookies are only marked `Secure` when the frontend is served over HTTPS.
    pub(super) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthConfig, AuthState};

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://accesso.dev".to_string());

        assert_eq!(config.frontend_base_url(), "https://accesso.dev");
        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert_eq!(
            config.verification_code_ttl_seconds(),
            super::DEFAULT_VERIFICATION_CODE_TTL_SECONDS
        );
        assert_eq!(
            config.reset_token_ttl_seconds(),
            super::DEFAULT_RESET_TOKEN_TTL_SECONDS
        );

        let config = config
            .with_session_ttl_seconds(120)
            .with_verification_code_ttl_seconds(60)
            .with_reset_token_ttl_seconds(30);

        assert_eq!(config.session_ttl_seconds(), 120);
        assert_eq!(config.verification_code_ttl_seconds(), 60);
        assert_eq!(config.reset_token_ttl_seconds(), 30);
    }

    #[test]
    fn cookie_secure_follows_frontend_scheme() {
        let https = AuthConfig::new("https://accesso.dev".to_string());
        assert!(https.session_cookie_secure());

        let http = AuthConfig::new("http://localhost:3000".to_string());
        assert!(!http.session_cookie_secure());
    }

    #[test]
    fn auth_state_exposes_config() {
        let state = AuthState::new(AuthConfig::new("https://accesso.dev".to_string()));
        assert_eq!(state.config().frontend_base_url(), "https://accesso.dev");
    }
}

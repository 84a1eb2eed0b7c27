//! Configuration for the SAML → PKCE bridge.

use std::time::Duration;

use crate::error::ConfigError;

/// Lifetime constants for the ephemeral stores and issued tokens.
pub mod ttl {
    use std::time::Duration;

    /// Pending login (state → challenge) lifetime: 5 minutes.
    pub const PENDING_LOGIN: Duration = Duration::from_secs(300);

    /// Authorization code lifetime: 5 minutes.
    pub const AUTH_CODE: Duration = Duration::from_secs(300);

    /// Bearer token validity window: 30 minutes.
    pub const ACCESS_TOKEN: Duration = Duration::from_secs(1800);

    /// Interval between expired-entry sweeps.
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
}

/// Outbound HTTP constants (assertion-validation service).
pub mod http {
    use std::time::Duration;

    /// Request timeout for assertion validation.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    /// Port the HTTP front door listens on.
    pub port: u16,

    /// Public base URL of this service (used to build the ACS URL).
    pub base_url: String,

    /// Frontend application base URL.
    pub frontend_url: String,

    /// Frontend route receiving `code` and `state` after login.
    pub frontend_complete_route: String,

    /// Identity provider SSO entry point (HTTP-Redirect binding).
    pub saml_entry_point: String,

    /// Our SAML issuer / entity ID.
    pub saml_issuer: String,

    /// Endpoint of the external assertion-validation service.
    pub saml_verifier_url: String,

    /// HMAC secret used to sign bearer tokens.
    pub token_secret: String,

    /// Pending login lifetime.
    pub pending_login_ttl: Duration,

    /// Authorization code lifetime.
    pub auth_code_ttl: Duration,

    /// Bearer token lifetime.
    pub access_token_ttl: Duration,

    /// Sweep interval.
    pub sweep_interval: Duration,

    /// Request timeout for the assertion-validation service.
    pub request_timeout: Duration,

    /// Connection timeout for the assertion-validation service.
    pub connect_timeout: Duration,
}

impl Config {
    /// Create a configuration with default lifetimes.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        frontend_url: impl Into<String>,
        saml_entry_point: impl Into<String>,
        saml_verifier_url: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            port: DEFAULT_PORT,
            saml_issuer: base_url.clone(),
            base_url,
            frontend_url: frontend_url.into(),
            frontend_complete_route: "login".to_string(),
            saml_entry_point: saml_entry_point.into(),
            saml_verifier_url: saml_verifier_url.into(),
            token_secret: token_secret.into(),
            pending_login_ttl: ttl::PENDING_LOGIN,
            auth_code_ttl: ttl::AUTH_CODE,
            access_token_ttl: ttl::ACCESS_TOKEN,
            sweep_interval: ttl::SWEEP_INTERVAL,
            request_timeout: http::REQUEST_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
        }
    }

    /// Create a test configuration pointing the assertion verifier at a mock server.
    #[must_use]
    pub fn for_testing(verifier_base_url: &str) -> Self {
        let mut config = Self::new(
            "http://bridge.localhost",
            "http://frontend.localhost",
            "http://idp.localhost/sso",
            format!("{verifier_base_url}/verify"),
            "test-signing-secret",
        );
        config.request_timeout = Duration::from_secs(5);
        config.connect_timeout = Duration::from_secs(2);
        config
    }

    /// Create configuration from environment variables.
    ///
    /// Loads a `.env` file first when one is present.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{DEFAULT_PORT}"));
        let frontend_url = required("FRONTEND_ENDPOINT")?;
        let entry_point = required("SAML_ENTRY_POINT")?;
        let verifier_url = required("SAML_VERIFIER_URL")?;
        let token_secret = std::env::var("TOKEN_SECRET").unwrap_or_default();

        let mut config = Self::new(base_url, frontend_url, entry_point, verifier_url, token_secret);

        if let Ok(issuer) = std::env::var("SAML_ISSUER") {
            config.saml_issuer = issuer;
        }
        if let Ok(route) = std::env::var("FRONTEND_COMPLETE_ROUTE") {
            config.frontend_complete_route = route;
        }

        Ok(config)
    }

    /// Assertion consumer service URL (where the IdP posts back).
    #[must_use]
    pub fn acs_url(&self) -> String {
        format!("{}/login", self.base_url.trim_end_matches('/'))
    }

    /// Frontend URL that receives the authorization code.
    #[must_use]
    pub fn frontend_complete_url(&self) -> String {
        format!(
            "{}/{}",
            self.frontend_url.trim_end_matches('/'),
            self.frontend_complete_route.trim_start_matches('/')
        )
    }

    /// Check if a signing secret is configured.
    #[must_use]
    pub fn has_token_secret(&self) -> bool {
        !self.token_secret.is_empty()
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("frontend_url", &self.frontend_url)
            .field("frontend_complete_route", &self.frontend_complete_route)
            .field("saml_entry_point", &self.saml_entry_point)
            .field("saml_issuer", &self.saml_issuer)
            .field("saml_verifier_url", &self.saml_verifier_url)
            .field("has_token_secret", &self.has_token_secret())
            .field("pending_login_ttl", &self.pending_login_ttl)
            .field("auth_code_ttl", &self.auth_code_ttl)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lifetimes() {
        let config = Config::for_testing("http://mock");
        assert_eq!(config.pending_login_ttl, Duration::from_secs(300));
        assert_eq!(config.auth_code_ttl, Duration::from_secs(300));
        assert_eq!(config.access_token_ttl, Duration::from_secs(1800));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_derived_urls() {
        let mut config = Config::for_testing("http://mock");
        config.base_url = "https://bridge.example.com/".to_string();
        config.frontend_url = "https://app.example.com/".to_string();
        config.frontend_complete_route = "/auth/complete".to_string();

        assert_eq!(config.acs_url(), "https://bridge.example.com/login");
        assert_eq!(config.frontend_complete_url(), "https://app.example.com/auth/complete");
        assert_eq!(config.saml_verifier_url, "http://mock/verify");
    }

    #[test]
    fn test_debug_hides_secret() {
        let mut config = Config::for_testing("http://mock");
        config.token_secret = "super-secret-signing-key".to_string();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-signing-key"));
        assert!(debug.contains("has_token_secret: true"));
    }
}

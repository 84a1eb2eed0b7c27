//! Bridge server implementation.
//!
//! Owns the stores, the token issuer, the identity provider and the sweeper
//! task, and serves the HTTP front door until shutdown.

pub mod bridge;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use url::Url;

use crate::config::Config;
use crate::provider::{IdentityProvider, SamlProvider};
use bridge::{
    Bridge, ChallengeStore, CodeStore, MemoryChallengeStore, MemoryCodeStore, Sweeper,
    TokenIssuer,
};

/// SAML → PKCE bridge server.
pub struct BridgeServer {
    bridge: Bridge,
    provider: Arc<dyn IdentityProvider>,
    sweeper: Sweeper,
    frontend_complete_url: Url,
    port: u16,
}

impl BridgeServer {
    /// Create a server backed by in-memory stores and the SAML provider.
    ///
    /// # Errors
    ///
    /// Returns error if the signing secret is missing or a configured URL is invalid.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let provider: Arc<dyn IdentityProvider> = Arc::new(SamlProvider::new(config)?);
        Self::with_provider(config, provider)
    }

    /// Create a server with a custom identity provider.
    ///
    /// # Errors
    ///
    /// Returns error if the signing secret is missing or the frontend URL is invalid.
    pub fn with_provider(
        config: &Config,
        provider: Arc<dyn IdentityProvider>,
    ) -> anyhow::Result<Self> {
        let issuer = TokenIssuer::new(&config.token_secret, config.access_token_ttl)?;
        let frontend_complete_url = Url::parse(&config.frontend_complete_url())?;

        let challenges: Arc<dyn ChallengeStore> =
            Arc::new(MemoryChallengeStore::new(config.pending_login_ttl));
        let codes: Arc<dyn CodeStore> = Arc::new(MemoryCodeStore::new(config.auth_code_ttl));

        let sweeper =
            Sweeper::new(Arc::clone(&challenges), Arc::clone(&codes), config.sweep_interval);
        let bridge = Bridge::new(challenges, codes, issuer);

        Ok(Self { bridge, provider, sweeper, frontend_complete_url, port: config.port })
    }

    /// Build the router without starting the sweeper.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        transport::create_router(
            self.bridge.clone(),
            Arc::clone(&self.provider),
            self.frontend_complete_url.clone(),
        )
    }

    /// Run the HTTP server until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be bound or on server failure.
    pub async fn run_http(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("HTTP server listening on http://{}", addr);
        self.serve(listener).await
    }

    /// Serve on an already bound listener, sweeping in the background until
    /// the server stops.
    ///
    /// # Errors
    ///
    /// Returns error on server failure.
    pub async fn serve(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        let router = self.router();
        let sweeper = self.sweeper.start();

        let served = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await;

        sweeper.shutdown().await;
        served?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }

    /// The bridge protocol handle.
    #[must_use]
    pub const fn bridge(&self) -> &Bridge {
        &self.bridge
    }
}

impl std::fmt::Debug for BridgeServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeServer")
            .field("port", &self.port)
            .field("frontend_complete_url", &self.frontend_complete_url.as_str())
            .field("sweeper", &self.sweeper)
            .finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_http_fails_when_port_taken() {
        let occupied = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
        let mut config = Config::for_testing("http://unused.localhost");
        config.port = occupied.local_addr().unwrap().port();

        let server = BridgeServer::new(&config).unwrap();
        assert!(server.run_http().await.is_err());
    }

    #[tokio::test]
    async fn test_serve_on_bound_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = BridgeServer::new(&Config::for_testing("http://unused.localhost")).unwrap();

        let task = tokio::spawn(server.serve(listener));

        let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert!(response.status().is_success());

        task.abort();
    }

    #[tokio::test]
    async fn test_missing_secret_is_fatal() {
        let mut config = Config::for_testing("http://unused.localhost");
        config.token_secret = String::new();

        assert!(BridgeServer::new(&config).is_err());
    }
}

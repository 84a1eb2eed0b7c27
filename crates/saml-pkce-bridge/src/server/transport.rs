//! HTTP transport for the bridge.
//!
//! Wires the bridge endpoints, health probes, CORS and request tracing into
//! one axum router.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, Method, header},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use url::Url;

use super::bridge::Bridge;
use super::bridge::handlers;
use crate::provider::IdentityProvider;

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub bridge: Bridge,
    pub provider: Arc<dyn IdentityProvider>,
    /// Frontend route receiving `code`/`state` or `error`.
    pub frontend_complete_url: Url,
}

impl std::fmt::Debug for HttpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpState")
            .field("bridge", &self.bridge)
            .field("frontend_complete_url", &self.frontend_complete_url.as_str())
            .finish()
    }
}

/// Create the HTTP router for the bridge.
pub fn create_router(
    bridge: Bridge,
    provider: Arc<dyn IdentityProvider>,
    frontend_complete_url: Url,
) -> Router {
    let state = Arc::new(HttpState { bridge, provider, frontend_complete_url });

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/login", get(handlers::handle_login_start).post(handlers::handle_login_complete))
        .route("/token", post(handlers::handle_token))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS that reflects the caller's origin.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "saml-pkce-bridge",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn readiness_check(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let pending_logins = state.bridge.challenges().entry_count().await;
    let auth_codes = state.bridge.codes().entry_count().await;
    Json(serde_json::json!({
        "status": "ready",
        "service": "saml-pkce-bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "pendingLogins": pending_logins,
        "authCodes": auth_codes
    }))
}

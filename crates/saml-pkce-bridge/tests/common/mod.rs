//! Shared fixtures for bridge integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use url::Url;

use saml_pkce_bridge::config::Config;
use saml_pkce_bridge::error::{ProviderError, ProviderResult};
use saml_pkce_bridge::provider::{AuthenticatedSubject, IdentityProvider};
use saml_pkce_bridge::server::BridgeServer;

pub const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
pub const FRONTEND_COMPLETE: &str = "http://frontend.localhost/login";

/// Provider that trusts assertions of the form `valid:<name-id>`.
pub struct StubProvider;

#[async_trait]
impl IdentityProvider for StubProvider {
    fn authorization_url(&self, state: &str) -> ProviderResult<Url> {
        let mut url = Url::parse("https://idp.test/sso")
            .map_err(|e| ProviderError::request(e.to_string()))?;
        url.query_pairs_mut().append_pair("RelayState", state);
        Ok(url)
    }

    async fn verify_assertion(&self, saml_response: &str) -> ProviderResult<AuthenticatedSubject> {
        saml_response
            .strip_prefix("valid:")
            .map(|name_id| AuthenticatedSubject { name_id: name_id.to_owned() })
            .ok_or_else(|| ProviderError::rejected(401, "signature invalid"))
    }
}

pub fn build_server() -> BridgeServer {
    let config = Config::for_testing("http://unused.localhost");
    BridgeServer::with_provider(&config, Arc::new(StubProvider)).unwrap()
}

pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

pub fn login_start(state: &str, challenge: &str) -> Request<Body> {
    let query = serde_urlencoded::to_string([("state", state), ("code_challenge", challenge)])
        .unwrap();
    Request::get(format!("/login?{query}")).body(Body::empty()).unwrap()
}

pub fn assertion_post(saml_response: &str, relay_state: &str) -> Request<Body> {
    let body =
        serde_urlencoded::to_string([("SAMLResponse", saml_response), ("RelayState", relay_state)])
            .unwrap();
    Request::post("/login")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

pub fn token_post(body: &serde_json::Value) -> Request<Body> {
    Request::post("/token")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Query pairs of a redirect response's `Location` header.
pub fn location_params(response: &Response<Body>) -> (String, HashMap<String, String>) {
    let location = response.headers().get("Location").unwrap().to_str().unwrap().to_owned();
    let url = Url::parse(&location).unwrap();
    let pairs = url.query_pairs().into_owned().collect();
    (location, pairs)
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

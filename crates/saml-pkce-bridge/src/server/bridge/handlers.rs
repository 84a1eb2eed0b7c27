//! HTTP endpoints for the SAML → PKCE bridge.
//!
//! - `GET /login`: record the PKCE challenge and redirect into the IdP
//! - `POST /login`: assertion consumer; issue a code and redirect to the frontend
//! - `POST /token`: exchange code + verifier for the bearer token

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{
        Query, State,
        rejection::{FormRejection, JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use url::Url;

use super::protocol::{ExchangeRequest, ExchangedToken, StartRequest};
use crate::error::BridgeError;
use crate::server::transport::HttpState;

// ─── Login Start ─────────────────────────────────────────────────────────────

/// `GET /login`
///
/// Stores `code_challenge` under `state` and redirects the user agent into the
/// identity provider handshake with `state` as the relay state.
pub async fn handle_login_start(
    State(state): State<Arc<HttpState>>,
    query: Result<Query<StartRequest>, QueryRejection>,
) -> Response {
    let req = query.map(|Query(q)| q).unwrap_or_default();

    let relay_state = match state.bridge.start(req).await {
        Ok(relay_state) => relay_state,
        Err(err) => return error_response(&err),
    };

    match state.provider.authorization_url(&relay_state) {
        Ok(url) => redirect(url.as_str()),
        Err(err) => {
            tracing::error!(error = %err, "Failed to build identity provider redirect");
            error_response(&BridgeError::from(err))
        }
    }
}

// ─── Assertion Consumer ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct AssertionForm {
    #[serde(rename = "SAMLResponse")]
    pub saml_response: Option<String>,
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// `POST /login`
///
/// Receives the identity provider's response. On success redirects to the
/// frontend completion route with `code` and `state`; on failure redirects to
/// the same route with an `error` parameter.
pub async fn handle_login_complete(
    State(state): State<Arc<HttpState>>,
    form: Result<Form<AssertionForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let relay_state = form.relay_state.unwrap_or_default();

    let Some(saml_response) = form.saml_response.filter(|r| !r.is_empty()) else {
        tracing::warn!("Assertion post without SAMLResponse");
        let err = BridgeError::missing("SAMLResponse");
        return failure_redirect(&state.frontend_complete_url, &err, &relay_state);
    };

    let subject = match state.provider.verify_assertion(&saml_response).await {
        Ok(subject) => subject,
        Err(err) => {
            tracing::warn!(error = %err, "Assertion verification failed");
            let err = BridgeError::from(err);
            return failure_redirect(&state.frontend_complete_url, &err, &relay_state);
        }
    };

    match state.bridge.complete(&relay_state, &subject.name_id).await {
        Ok(issued) => {
            let mut url = state.frontend_complete_url.clone();
            url.query_pairs_mut()
                .append_pair("code", &issued.code)
                .append_pair("state", &issued.state);
            redirect(url.as_str())
        }
        Err(err) => failure_redirect(&state.frontend_complete_url, &err, &relay_state),
    }
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

/// `POST /token`
///
/// Exchange an authorization code and its verifier for the bearer token.
pub async fn handle_token(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected token request body");
            return error_response(&BridgeError::missing("body"));
        }
    };

    match state.bridge.exchange(req).await {
        Ok(token) => token_success(&token),
        Err(err) => error_response(&err),
    }
}

/// Build a token response with required cache headers (RFC 6749 §5.1).
fn token_success(token: &ExchangedToken) -> Response {
    let mut response = Json(serde_json::json!({
        "accessToken": token.access_token,
        "tokenType": "Bearer",
        "expiresIn": token.expires_in
    }))
    .into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

/// JSON error body with an OAuth-style code.
///
/// Unknown codes and wrong verifiers produce identical responses.
fn error_response(err: &BridgeError) -> Response {
    let status = match err {
        BridgeError::SigningUnavailable | BridgeError::Signing(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        BridgeError::Provider(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    };

    (
        status,
        Json(serde_json::json!({
            "error": err.oauth_code(),
            "error_description": err.to_user_message()
        })),
    )
        .into_response()
}

fn failure_redirect(target: &Url, err: &BridgeError, relay_state: &str) -> Response {
    let mut url = target.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("error", err.oauth_code());
        if !relay_state.is_empty() {
            pairs.append_pair("state", relay_state);
        }
    }
    redirect(url.as_str())
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}

//! The three-step bridge flow: login start, login completion, code exchange.
//!
//! ```text
//! start(state, challenge)     → PENDING   (challenge stored under state)
//! complete(state, identity)   → COMPLETED (token minted, code issued)
//! exchange(code, verifier)    → EXCHANGED (token released, code deleted)
//! ```
//!
//! Pending entries and codes that are never consumed become `EXPIRED` and are
//! reclaimed by the sweeper.

use std::sync::Arc;

use serde::Deserialize;

use super::pkce;
use super::store::{ChallengeStore, CodeStore};
use super::token::TokenIssuer;
use crate::error::{BridgeError, BridgeResult};

/// Parameters accepted at login start.
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub state: Option<String>,
    #[serde(alias = "challenge")]
    pub code_challenge: Option<String>,
}

/// Parameters accepted at code exchange.
#[derive(Debug, Default, Deserialize)]
pub struct ExchangeRequest {
    pub code: Option<String>,
    #[serde(alias = "proof", alias = "codeVerifier")]
    pub code_verifier: Option<String>,
}

/// Result of a successful login completion.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub code: String,
    pub state: String,
}

/// Result of a successful code exchange.
#[derive(Clone)]
pub struct ExchangedToken {
    pub access_token: String,
    pub expires_in: u64,
}

/// Orchestrates the stores and the token issuer.
#[derive(Clone)]
pub struct Bridge {
    challenges: Arc<dyn ChallengeStore>,
    codes: Arc<dyn CodeStore>,
    issuer: TokenIssuer,
}

impl Bridge {
    #[must_use]
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        codes: Arc<dyn CodeStore>,
        issuer: TokenIssuer,
    ) -> Self {
        Self { challenges, codes, issuer }
    }

    /// Record the challenge for a new login attempt.
    ///
    /// Returns the validated `state` to carry through the identity provider.
    /// A second start with the same `state` replaces the earlier challenge.
    pub async fn start(&self, req: StartRequest) -> BridgeResult<String> {
        let state = non_empty(req.state, "state")?;
        let challenge = non_empty(req.code_challenge, "code_challenge")?;
        let challenge = pkce::normalize_challenge(&challenge);
        if challenge.is_empty() {
            return Err(BridgeError::missing("code_challenge"));
        }

        self.challenges.put(&state, &challenge).await;
        tracing::info!(state = %state, "Login started");

        Ok(state)
    }

    /// Complete a login for an identity the provider has authenticated.
    pub async fn complete(&self, state: &str, identity: &str) -> BridgeResult<IssuedCode> {
        if state.is_empty() {
            return Err(BridgeError::StateInvalid);
        }

        let Some(challenge) = self.challenges.take_challenge(state).await else {
            tracing::warn!(state = %state, "Login completion with unknown or expired state");
            return Err(BridgeError::StateInvalid);
        };

        let token = self.issuer.mint(identity)?;
        let code = self.codes.create(challenge, token.access_token).await;

        tracing::info!(state = %state, "Issued authorization code");

        Ok(IssuedCode { code, state: state.to_owned() })
    }

    /// Redeem an authorization code for its bearer token.
    pub async fn exchange(&self, req: ExchangeRequest) -> BridgeResult<ExchangedToken> {
        let code = non_empty(req.code, "code")?;
        let code_verifier = non_empty(req.code_verifier, "code_verifier")?;

        let access_token = match self.codes.exchange(&code, &code_verifier).await {
            Ok(access_token) => access_token,
            Err(err) if err.is_exchange_rejection() => {
                tracing::warn!(reason = %err, "Code exchange rejected");
                return Err(err);
            }
            Err(err) => {
                tracing::error!(error = %err, "Code exchange failed");
                return Err(err);
            }
        };

        // The token was minted at login completion; report what is left of it.
        let expires_in = self.issuer.remaining_lifetime(&access_token).map_err(|err| {
            tracing::warn!(error = %err, "Stored bearer token no longer valid");
            BridgeError::CodeInvalid
        })?;
        tracing::info!(expires_in, "Released bearer token");

        Ok(ExchangedToken { access_token, expires_in })
    }

    /// Store handle for pending logins.
    #[must_use]
    pub fn challenges(&self) -> &Arc<dyn ChallengeStore> {
        &self.challenges
    }

    /// Store handle for authorization codes.
    #[must_use]
    pub fn codes(&self) -> &Arc<dyn CodeStore> {
        &self.codes
    }

    /// Token issuer.
    #[must_use]
    pub const fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge").field("issuer", &self.issuer).finish()
    }
}

fn non_empty(value: Option<String>, field: &'static str) -> BridgeResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(BridgeError::missing(field)),
    }
}

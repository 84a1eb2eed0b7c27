//! Bearer token issuance.
//!
//! Tokens are HS256 JWTs carrying the authenticated identity as `sub` and a
//! fixed validity window. Only holders of the signing secret can verify them.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::ttl;
use crate::error::{BridgeError, BridgeResult};

/// Claims embedded in an issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated identity (SAML NameID).
    pub sub: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// A freshly minted bearer token.
#[derive(Clone)]
pub struct BearerToken {
    pub access_token: String,
    pub expires_in: u64,
}

/// Mints and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    /// Create an issuer for the given HMAC secret.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SigningUnavailable`] if the secret is empty.
    pub fn new(secret: &str, lifetime: Duration) -> BridgeResult<Self> {
        if secret.is_empty() {
            return Err(BridgeError::SigningUnavailable);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        })
    }

    /// Create an issuer with the default 30 minute lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SigningUnavailable`] if the secret is empty.
    pub fn with_default_lifetime(secret: &str) -> BridgeResult<Self> {
        Self::new(secret, ttl::ACCESS_TOKEN)
    }

    /// Mint a token for `identity`, valid from now for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns error if encoding fails.
    pub fn mint(&self, identity: &str) -> BridgeResult<BearerToken> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: identity.to_owned(),
            iat: now,
            exp: now + self.lifetime.as_secs() as i64,
        };

        let access_token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(BearerToken { access_token, expires_in: self.lifetime.as_secs() })
    }

    /// Verify a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns error if the token is malformed, tampered with or expired.
    pub fn verify(&self, token: &str) -> BridgeResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Seconds until `token` expires, counted from now.
    ///
    /// # Errors
    ///
    /// Returns error if the token does not verify or has already expired.
    pub fn remaining_lifetime(&self, token: &str) -> BridgeResult<u64> {
        let claims = self.verify(token)?;
        let remaining = claims.exp - Utc::now().timestamp();
        Ok(remaining.max(0) as u64)
    }

    /// Token lifetime.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").field("lifetime", &self.lifetime).finish()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken").field("expires_in", &self.expires_in).finish()
    }
}

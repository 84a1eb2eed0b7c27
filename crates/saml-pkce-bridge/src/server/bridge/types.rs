//! Entries held by the ephemeral bridge stores.

use std::time::Duration;

use tokio::time::Instant;

/// Entries that carry an absolute expiry.
pub trait Expiring {
    fn expires_at(&self) -> Instant;

    /// Expired at or after `expires_at`.
    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

/// A login awaiting the identity provider callback.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub challenge: String,
    pub expires_at: Instant,
}

/// An authorization code issued after a successful assertion.
#[derive(Clone)]
pub struct AuthCode {
    pub challenge: String,
    pub access_token: String,
    pub expires_at: Instant,
}

impl PendingLogin {
    #[must_use]
    pub fn new(challenge: String, ttl: Duration) -> Self {
        Self { challenge, expires_at: Instant::now() + ttl }
    }
}

impl AuthCode {
    #[must_use]
    pub fn new(challenge: String, access_token: String, ttl: Duration) -> Self {
        Self { challenge, access_token, expires_at: Instant::now() + ttl }
    }
}

impl Expiring for PendingLogin {
    fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

impl Expiring for AuthCode {
    fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

// Keep the access token out of logs.
impl std::fmt::Debug for AuthCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCode").field("expires_at", &self.expires_at).finish()
    }
}

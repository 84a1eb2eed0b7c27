//! In-memory stores for pending logins and authorization codes.
//!
//! Both stores lock only for the duration of a single map operation, so an
//! exchange never waits on another request's I/O. Expiry is checked on every
//! read; the sweeper only reclaims memory.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::pkce;
use super::types::{AuthCode, Expiring, PendingLogin};
use crate::config::ttl;
use crate::error::{BridgeError, BridgeResult};

/// Pending logins keyed by caller-chosen `state`.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Insert or replace the challenge for `state` with a fresh expiry.
    async fn put(&self, state: &str, challenge: &str);

    /// Atomically remove the entry for `state`, returning its challenge if it
    /// had not expired.
    async fn take_challenge(&self, state: &str) -> Option<String>;

    /// Remove every expired entry. Returns how many were removed.
    async fn purge_expired(&self) -> usize;

    /// Number of entries currently held, expired or not.
    async fn entry_count(&self) -> usize;
}

/// Authorization codes awaiting exchange.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Store a new code bound to `challenge` and `access_token`; returns the code.
    async fn create(&self, challenge: String, access_token: String) -> String;

    /// Redeem `code` with the client's verifier.
    ///
    /// The entry is removed before verification, so a code can be attempted
    /// at most once whatever the outcome.
    async fn exchange(&self, code: &str, code_verifier: &str) -> BridgeResult<String>;

    /// Remove every expired entry. Returns how many were removed.
    async fn purge_expired(&self) -> usize;

    /// Number of entries currently held, expired or not.
    async fn entry_count(&self) -> usize;
}

/// Map of expiring entries shared by both stores.
struct ExpiringMap<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V: Expiring + Send + Sync> ExpiringMap<V> {
    fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    async fn insert(&self, key: String, value: V) {
        self.entries.write().await.insert(key, value);
    }

    /// Insert under a freshly generated key that is not currently present.
    async fn insert_unique(&self, value: V, generate: impl Fn() -> String) -> String {
        let mut entries = self.entries.write().await;
        loop {
            let key = generate();
            if let Entry::Vacant(slot) = entries.entry(key.clone()) {
                slot.insert(value);
                return key;
            }
        }
    }

    /// Remove and return the entry if present and unexpired.
    async fn take(&self, key: &str) -> Option<V> {
        let entry = self.entries.write().await.remove(key)?;
        if entry.is_expired_at(Instant::now()) {
            return None;
        }
        Some(entry)
    }

    /// Collect expired keys under a read lock, then remove them one at a
    /// time, re-checking expiry under each short write lock.
    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for key in self.expired_keys(now).await {
            if self.remove_if_expired(&key, now).await {
                removed += 1;
            }
        }
        removed
    }

    async fn expired_keys(&self, now: Instant) -> Vec<String> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remove `key` only if the entry held now is still expired at `now`.
    ///
    /// A key replaced since [`Self::expired_keys`] ran is left alone.
    async fn remove_if_expired(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
            entries.remove(key);
            return true;
        }
        false
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Generate a random code using two UUIDs (244 random bits, hex-encoded).
fn generate_code() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

/// In-memory [`ChallengeStore`].
pub struct MemoryChallengeStore {
    entries: ExpiringMap<PendingLogin>,
    ttl: Duration,
}

impl MemoryChallengeStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { entries: ExpiringMap::new(), ttl }
    }
}

impl Default for MemoryChallengeStore {
    fn default() -> Self {
        Self::new(ttl::PENDING_LOGIN)
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn put(&self, state: &str, challenge: &str) {
        self.entries
            .insert(state.to_owned(), PendingLogin::new(challenge.to_owned(), self.ttl))
            .await;
    }

    async fn take_challenge(&self, state: &str) -> Option<String> {
        self.entries.take(state).await.map(|pending| pending.challenge)
    }

    async fn purge_expired(&self) -> usize {
        self.entries.purge_expired().await
    }

    async fn entry_count(&self) -> usize {
        self.entries.len().await
    }
}

impl std::fmt::Debug for MemoryChallengeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChallengeStore").field("ttl", &self.ttl).finish()
    }
}

/// In-memory [`CodeStore`].
pub struct MemoryCodeStore {
    entries: ExpiringMap<AuthCode>,
    ttl: Duration,
}

impl MemoryCodeStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { entries: ExpiringMap::new(), ttl }
    }
}

impl Default for MemoryCodeStore {
    fn default() -> Self {
        Self::new(ttl::AUTH_CODE)
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn create(&self, challenge: String, access_token: String) -> String {
        let entry = AuthCode::new(challenge, access_token, self.ttl);
        self.entries.insert_unique(entry, generate_code).await
    }

    async fn exchange(&self, code: &str, code_verifier: &str) -> BridgeResult<String> {
        let Some(auth_code) = self.entries.take(code).await else {
            return Err(BridgeError::CodeInvalid);
        };

        if !pkce::verify_s256(code_verifier, &auth_code.challenge) {
            return Err(BridgeError::ProofMismatch);
        }

        Ok(auth_code.access_token)
    }

    async fn purge_expired(&self) -> usize {
        self.entries.purge_expired().await
    }

    async fn entry_count(&self) -> usize {
        self.entries.len().await
    }
}

impl std::fmt::Debug for MemoryCodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCodeStore").field("ttl", &self.ttl).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[tokio::test]
    async fn test_challenge_take_is_single_use() {
        let store = MemoryChallengeStore::default();
        store.put("abc", "challenge").await;

        assert_eq!(store.take_challenge("abc").await.as_deref(), Some("challenge"));
        assert!(store.take_challenge("abc").await.is_none());
        assert_eq!(store.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_challenge_last_write_wins() {
        let store = MemoryChallengeStore::default();
        store.put("abc", "first").await;
        store.put("abc", "second").await;

        assert_eq!(store.entry_count().await, 1);
        assert_eq!(store.take_challenge("abc").await.as_deref(), Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_challenge_expires_at_ttl_without_sweep() {
        let store = MemoryChallengeStore::new(Duration::from_secs(300));
        store.put("early", "c1").await;
        store.put("late", "c2").await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(store.take_challenge("early").await.as_deref(), Some("c1"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.take_challenge("late").await.is_none());
    }

    #[tokio::test]
    async fn test_code_lifecycle() {
        let store = MemoryCodeStore::default();
        let code = store.create(CHALLENGE.into(), "token-1".into()).await;
        assert_eq!(code.len(), 64);

        // First exchange succeeds
        assert_eq!(store.exchange(&code, VERIFIER).await.unwrap(), "token-1");

        // Second exchange fails (already redeemed)
        assert!(matches!(store.exchange(&code, VERIFIER).await, Err(BridgeError::CodeInvalid)));
    }

    #[tokio::test]
    async fn test_code_mismatch_still_consumes() {
        let store = MemoryCodeStore::default();
        let code = store.create(CHALLENGE.into(), "token-1".into()).await;

        assert!(matches!(store.exchange(&code, "wrong").await, Err(BridgeError::ProofMismatch)));
        assert!(matches!(store.exchange(&code, VERIFIER).await, Err(BridgeError::CodeInvalid)));
        assert_eq!(store.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_codes_are_unique() {
        let store = MemoryCodeStore::default();
        let a = store.create(CHALLENGE.into(), "t".into()).await;
        let b = store.create(CHALLENGE.into(), "t".into()).await;
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_code_expires_at_ttl_without_sweep() {
        let store = MemoryCodeStore::new(Duration::from_secs(300));
        let code = store.create(CHALLENGE.into(), "token".into()).await;

        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(matches!(store.exchange(&code, VERIFIER).await, Err(BridgeError::CodeInvalid)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_exchange_single_winner() {
        let store = Arc::new(MemoryCodeStore::default());
        let code = store.create(CHALLENGE.into(), "token".into()).await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let code = code.clone();
                tokio::spawn(async move { store.exchange(&code, VERIFIER).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(token) => {
                    assert_eq!(token, "token");
                    successes += 1;
                }
                Err(err) => assert!(matches!(err, BridgeError::CodeInvalid)),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_is_idempotent_and_spares_live_entries() {
        let store = MemoryChallengeStore::new(Duration::from_secs(300));
        store.put("old", "c").await;
        tokio::time::advance(Duration::from_secs(200)).await;
        store.put("new", "c").await;
        tokio::time::advance(Duration::from_secs(100)).await;

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.purge_expired().await, 0);
        assert_eq!(store.entry_count().await, 1);
        assert!(store.take_challenge("new").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_spares_replaced_state() {
        let store = MemoryChallengeStore::new(Duration::from_secs(300));
        store.put("abc", "stale").await;
        tokio::time::advance(Duration::from_secs(300)).await;
        store.put("abc", "fresh").await;

        assert_eq!(store.purge_expired().await, 0);
        assert_eq!(store.take_challenge("abc").await.as_deref(), Some("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_spares_state_refreshed_after_scan() {
        let store = MemoryChallengeStore::new(Duration::from_secs(300));
        store.put("abc", "stale").await;
        tokio::time::advance(Duration::from_secs(300)).await;

        let now = Instant::now();
        let candidates = store.entries.expired_keys(now).await;
        assert_eq!(candidates, vec!["abc".to_string()]);

        // A new login start lands between the scan and the removal.
        store.put("abc", "fresh").await;

        for key in &candidates {
            assert!(!store.entries.remove_if_expired(key, now).await);
        }
        assert_eq!(store.take_challenge("abc").await.as_deref(), Some("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_if_expired_removes_stale_entry() {
        let store = MemoryCodeStore::new(Duration::from_secs(300));
        let code = store.create(CHALLENGE.into(), "token".into()).await;
        tokio::time::advance(Duration::from_secs(300)).await;

        let now = Instant::now();
        assert!(store.entries.remove_if_expired(&code, now).await);
        assert!(!store.entries.remove_if_expired(&code, now).await);
        assert_eq!(store.entry_count().await, 0);
    }
}

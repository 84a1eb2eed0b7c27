//! Property-based tests for the code exchange.

use std::time::Duration;

use proptest::prelude::*;

use saml_pkce_bridge::error::BridgeError;
use saml_pkce_bridge::server::bridge::pkce;
use saml_pkce_bridge::server::bridge::{CodeStore, MemoryCodeStore};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

/// Unreserved PKCE verifier characters.
fn verifier() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._~-]{43,128}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn challenge_is_unpadded_base64url(v in verifier()) {
        let challenge = pkce::s256_challenge(&v);
        prop_assert_eq!(challenge.len(), 43);
        let url_safe = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
        prop_assert!(challenge.chars().all(url_safe));
        prop_assert!(pkce::verify_s256(&v, &challenge));
    }

    #[test]
    fn altered_verifier_fails_and_consumes_code(
        v in verifier(),
        idx in any::<prop::sample::Index>(),
    ) {
        let pos = idx.index(v.len());
        let mut bytes = v.clone().into_bytes();
        bytes[pos] = if bytes[pos] == b'a' { b'b' } else { b'a' };
        let altered = String::from_utf8(bytes).unwrap();

        runtime().block_on(async {
            let store = MemoryCodeStore::new(Duration::from_secs(300));
            let code = store.create(pkce::s256_challenge(&v), "token".to_string()).await;

            let result = store.exchange(&code, &altered).await;
            assert!(matches!(result, Err(BridgeError::ProofMismatch)));
            assert_eq!(store.entry_count().await, 0);

            let retry = store.exchange(&code, &v).await;
            assert!(matches!(retry, Err(BridgeError::CodeInvalid)));
        });
    }
}

//! Authorization code + PKCE bridge.
//!
//! Turns an identity asserted by a SAML provider into a short-lived,
//! single-use authorization code that the frontend redeems with its PKCE
//! verifier for a signed bearer token.
//!
//! ## Supported Standards
//! - RFC 7636: PKCE (S256)
//! - RFC 7519: JSON Web Token (HS256 bearer tokens)
//! - SAML 2.0 HTTP-Redirect / HTTP-POST bindings (via [`crate::provider`])

pub mod handlers;
pub mod pkce;
pub mod protocol;
pub mod store;
pub mod sweeper;
pub mod token;
mod types;

pub use protocol::{Bridge, ExchangeRequest, IssuedCode, StartRequest};
pub use store::{ChallengeStore, CodeStore, MemoryChallengeStore, MemoryCodeStore};
pub use sweeper::{SweepReport, Sweeper, SweeperHandle};
pub use token::{BearerToken, Claims, TokenIssuer};

//! SAML → PKCE Bridge
//!
//! Lets a frontend that speaks the authorization code + PKCE flow log in
//! against a SAML identity provider. The bridge binds the frontend's PKCE
//! challenge to a login `state`, turns the identity from the provider's
//! assertion into a single-use authorization code, and releases a signed
//! bearer token only to the holder of the matching verifier.
//!
//! # Features
//!
//! - **Single-use codes**: every exchange attempt consumes the code
//! - **Expiry on read**: pending logins and codes live 5 minutes, checked on every access
//! - **Background sweep**: expired entries are reclaimed every 60 seconds
//! - **Signed tokens**: HS256 JWTs valid for 30 minutes
//!
//! # Example
//!
//! ```no_run
//! use saml_pkce_bridge::{config::Config, server::BridgeServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = BridgeServer::new(&config)?;
//!
//!     server.run_http().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod server;

pub use config::Config;
pub use error::{BridgeError, ProviderError};
pub use server::BridgeServer;

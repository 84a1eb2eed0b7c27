//! Identity provider boundary.
//!
//! The bridge never parses or validates SAML assertions itself. It needs two
//! things from the provider integration: a URL that starts the handshake for a
//! given `state`, and the authenticated subject of a posted assertion.

mod saml;

use async_trait::async_trait;
use url::Url;

use crate::error::ProviderResult;

pub use saml::SamlProvider;

/// Identity established by a verified assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject {
    /// SAML NameID (typically an email address).
    pub name_id: String,
}

/// The external identity-provider integration.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL that sends the user agent into the provider handshake, carrying
    /// `state` back as the correlation tag.
    fn authorization_url(&self, state: &str) -> ProviderResult<Url>;

    /// Validate a posted `SAMLResponse` and return its subject.
    async fn verify_assertion(&self, saml_response: &str) -> ProviderResult<AuthenticatedSubject>;
}

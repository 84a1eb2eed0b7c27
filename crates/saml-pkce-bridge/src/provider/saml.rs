//! SAML 2.0 service-provider side of the handshake.
//!
//! Sends users to the IdP with an HTTP-Redirect binding AuthnRequest and
//! hands posted responses to an external assertion-validation service.

use std::io::Write;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::DeflateEncoder;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{AuthenticatedSubject, IdentityProvider};
use crate::config::Config;
use crate::error::{ProviderError, ProviderResult};

const NAMEID_FORMAT_EMAIL: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress";
const BINDING_HTTP_POST: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";

/// SAML service provider backed by a remote assertion validator.
#[derive(Clone)]
pub struct SamlProvider {
    client: Client,
    entry_point: Url,
    issuer: String,
    acs_url: String,
    verifier_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    saml_response: &'a str,
    audience: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    name_id: Option<String>,
}

impl SamlProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the entry point is not a URL or the HTTP client
    /// cannot be built.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let entry_point = Url::parse(&config.saml_entry_point)?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            entry_point,
            issuer: config.saml_issuer.clone(),
            acs_url: config.acs_url(),
            verifier_url: config.saml_verifier_url.clone(),
        })
    }

    /// Build the AuthnRequest document.
    fn authn_request(&self, request_id: &str, issue_instant: &str) -> String {
        format!(
            concat!(
                r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" "#,
                r#"xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" "#,
                r#"ID="{id}" Version="2.0" IssueInstant="{instant}" "#,
                r#"Destination="{destination}" ProtocolBinding="{binding}" "#,
                r#"AssertionConsumerServiceURL="{acs}">"#,
                r#"<saml:Issuer>{issuer}</saml:Issuer>"#,
                r#"<samlp:NameIDPolicy Format="{format}" AllowCreate="true"/>"#,
                r#"</samlp:AuthnRequest>"#,
            ),
            id = xml_escape(request_id),
            instant = xml_escape(issue_instant),
            destination = xml_escape(self.entry_point.as_str()),
            binding = BINDING_HTTP_POST,
            acs = xml_escape(&self.acs_url),
            issuer = xml_escape(&self.issuer),
            format = NAMEID_FORMAT_EMAIL,
        )
    }
}

#[async_trait]
impl IdentityProvider for SamlProvider {
    fn authorization_url(&self, state: &str) -> ProviderResult<Url> {
        let request_id = format!("_{}", uuid::Uuid::new_v4().simple());
        let issue_instant = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let xml = self.authn_request(&request_id, &issue_instant);

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(xml.as_bytes())
            .map_err(|e| ProviderError::request(format!("deflate failed: {e}")))?;
        let deflated = encoder
            .finish()
            .map_err(|e| ProviderError::request(format!("deflate failed: {e}")))?;

        let mut url = self.entry_point.clone();
        url.query_pairs_mut()
            .append_pair("SAMLRequest", &STANDARD.encode(deflated))
            .append_pair("RelayState", state);

        tracing::debug!(request_id = %request_id, "Built AuthnRequest redirect");
        Ok(url)
    }

    async fn verify_assertion(&self, saml_response: &str) -> ProviderResult<AuthenticatedSubject> {
        let response = self
            .client
            .post(&self.verifier_url)
            .json(&VerifyRequest { saml_response, audience: &self.issuer })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::rejected(status.as_u16(), text));
        }

        let body: VerifyResponse = response.json().await?;
        match body.name_id {
            Some(name_id) if !name_id.trim().is_empty() => Ok(AuthenticatedSubject { name_id }),
            _ => Err(ProviderError::MissingSubject),
        }
    }
}

impl std::fmt::Debug for SamlProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamlProvider")
            .field("entry_point", &self.entry_point.as_str())
            .field("issuer", &self.issuer)
            .field("verifier_url", &self.verifier_url)
            .finish()
    }
}

/// Escape XML special characters for attribute and text content.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

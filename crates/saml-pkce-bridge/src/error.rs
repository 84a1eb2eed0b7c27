//! Error types for the SAML → PKCE bridge.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

/// Errors from the bridge protocol and its stores.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// A required request field was absent or empty. No state was mutated.
    #[error("Missing required parameter: {0}")]
    MissingParameters(&'static str),

    /// Unknown, expired or already consumed `state` at login completion.
    #[error("Login state is invalid or expired")]
    StateInvalid,

    /// Unknown, expired or already redeemed authorization code.
    #[error("Authorization code is invalid or expired")]
    CodeInvalid,

    /// The supplied verifier does not match the stored challenge.
    #[error("Code verifier does not match challenge")]
    ProofMismatch,

    /// No signing secret configured. Fatal at startup.
    #[error("Token signing key is not configured")]
    SigningUnavailable,

    /// The token encoder failed.
    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The identity provider rejected or could not verify the assertion.
    #[error("Identity provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl BridgeError {
    /// Create a missing parameter error.
    #[must_use]
    pub const fn missing(field: &'static str) -> Self {
        Self::MissingParameters(field)
    }

    /// Returns true for failures of the code exchange verification step.
    ///
    /// These are reported to callers with a single generic message.
    #[must_use]
    pub const fn is_exchange_rejection(&self) -> bool {
        matches!(self, Self::CodeInvalid | Self::ProofMismatch)
    }

    /// OAuth-style error code for the HTTP response body.
    #[must_use]
    pub const fn oauth_code(&self) -> &'static str {
        match self {
            Self::MissingParameters(_) => "invalid_request",
            Self::StateInvalid => "invalid_state",
            Self::CodeInvalid | Self::ProofMismatch => "invalid_grant",
            Self::Provider(_) => "access_denied",
            Self::SigningUnavailable | Self::Signing(_) => "server_error",
        }
    }

    /// Message safe to show the caller.
    ///
    /// Never distinguishes an unknown code from a wrong verifier.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::CodeInvalid | Self::ProofMismatch => {
                "Invalid authorization code or code verifier".to_string()
            }
            Self::Provider(_) => "Authentication with the identity provider failed".to_string(),
            Self::SigningUnavailable | Self::Signing(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Errors from the identity-provider integration.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// HTTP transport error talking to the assertion-validation service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The assertion was rejected.
    #[error("Assertion rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code returned by the validation service
        status: u16,
        /// Response body or message
        message: String,
    },

    /// The validation service answered without a subject.
    #[error("Assertion carried no subject identifier")]
    MissingSubject,

    /// Building the AuthnRequest redirect failed.
    #[error("Invalid identity provider request: {0}")]
    Request(String),
}

impl ProviderError {
    /// Create a rejection error.
    #[must_use]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected { status, message: message.into() }
    }

    /// Create a request-building error.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }
}

/// Errors loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type alias for identity-provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

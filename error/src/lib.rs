//! Common error types for token issuance and verification.
//!
//! The token core returns these as tagged reasons; mapping them onto
//! transport responses is left to the boundary layer via [`ErrorResponse`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregate error for callers that drive several stages at once.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token issuance failed: {0}")]
    Issue(#[from] IssueError),

    #[error("Token rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),
}

/// Issuance-side errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueError {
    #[error("Invalid principal: {0}")]
    InvalidPrincipal(String),

    #[error("Invalid validity window: expiry {expires_at} is not after not-before {not_before}")]
    InvalidValidityWindow { not_before: i64, expires_at: i64 },

    #[error("Signing failed: {0}")]
    SigningFailure(String),
}

/// Verification-side rejection reasons.
///
/// Exactly one reason is reported per verification call: the first check
/// that fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Algorithm mismatch: expected {expected}, found {found}")]
    AlgorithmMismatch { expected: String, found: String },

    #[error("Issuer mismatch: expected {expected}, found {found:?}")]
    IssuerMismatch {
        expected: String,
        found: Option<String>,
    },

    #[error("Audience mismatch: expected {expected}, found {found:?}")]
    AudienceMismatch { expected: String, found: Vec<String> },

    #[error("Token not valid until {not_before} (now: {now}, skew: {skew_secs}s)")]
    NotYetValid {
        not_before: i64,
        now: i64,
        skew_secs: u64,
    },

    #[error("Token expired at {expires_at} (now: {now}, skew: {skew_secs}s)")]
    Expired {
        expires_at: i64,
        now: i64,
        skew_secs: u64,
    },
}

/// Field-less view of a [`Rejection`] for policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    MalformedToken,
    InvalidSignature,
    AlgorithmMismatch,
    IssuerMismatch,
    AudienceMismatch,
    NotYetValid,
    Expired,
}

impl Rejection {
    /// Kind of this rejection, without its diagnostic context.
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::MalformedToken(_) => RejectionKind::MalformedToken,
            Rejection::InvalidSignature => RejectionKind::InvalidSignature,
            Rejection::AlgorithmMismatch { .. } => RejectionKind::AlgorithmMismatch,
            Rejection::IssuerMismatch { .. } => RejectionKind::IssuerMismatch,
            Rejection::AudienceMismatch { .. } => RejectionKind::AudienceMismatch,
            Rejection::NotYetValid { .. } => RejectionKind::NotYetValid,
            Rejection::Expired { .. } => RejectionKind::Expired,
        }
    }
}

/// Errors raised while loading signing configuration or key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid key material: {0}")]
    KeyMaterial(String),
}

/// Errors raised by the external authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    #[error("User name or password is missing")]
    MissingCredentials,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User directory error: {0}")]
    Directory(String),
}

/// Error response for API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// HTTP-style status hint for the transport layer
    pub status: u16,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status,
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&IssueError> for ErrorResponse {
    fn from(err: &IssueError) -> Self {
        let (code, message, status) = match err {
            IssueError::InvalidPrincipal(_) => ("TOKEN_INVALID_PRINCIPAL", "Invalid principal", 400),
            IssueError::InvalidValidityWindow { .. } => {
                ("TOKEN_INVALID_WINDOW", "Token validity window is empty", 500)
            }
            IssueError::SigningFailure(_) => ("TOKEN_SIGNING_FAILED", "Failed to sign token", 500),
        };
        Self::new(code, message, status).with_details(err.to_string())
    }
}

impl From<&Rejection> for ErrorResponse {
    fn from(err: &Rejection) -> Self {
        // Diagnostic context stays server-side; clients only learn the reason.
        let (code, message) = match err.kind() {
            RejectionKind::MalformedToken => ("TOKEN_MALFORMED", "Token is malformed"),
            RejectionKind::InvalidSignature => ("TOKEN_INVALID_SIGNATURE", "Invalid token signature"),
            RejectionKind::AlgorithmMismatch => ("TOKEN_ALGORITHM_MISMATCH", "Unexpected token algorithm"),
            RejectionKind::IssuerMismatch => ("TOKEN_ISSUER_MISMATCH", "Unexpected token issuer"),
            RejectionKind::AudienceMismatch => ("TOKEN_AUDIENCE_MISMATCH", "Unexpected token audience"),
            RejectionKind::NotYetValid => ("TOKEN_NOT_YET_VALID", "Token is not yet valid"),
            RejectionKind::Expired => ("TOKEN_EXPIRED", "Token has expired"),
        };
        Self::new(code, message, 401)
    }
}

impl From<&ConfigError> for ErrorResponse {
    fn from(err: &ConfigError) -> Self {
        Self::new("TOKEN_CONFIGURATION", "Token service is misconfigured", 500)
            .with_details(err.to_string())
    }
}

impl From<&AuthenticationError> for ErrorResponse {
    fn from(err: &AuthenticationError) -> Self {
        let (code, message, status) = match err {
            AuthenticationError::MissingCredentials => (
                "AUTH_MISSING_CREDENTIALS",
                "User name or password is not valid",
                400,
            ),
            AuthenticationError::InvalidCredentials => (
                "AUTH_INVALID_CREDENTIALS",
                "User name or password is not correct",
                401,
            ),
            AuthenticationError::Directory(_) => {
                ("AUTH_DIRECTORY_UNAVAILABLE", "User directory unavailable", 500)
            }
        };
        Self::new(code, message, status)
    }
}

impl From<&TokenError> for ErrorResponse {
    fn from(err: &TokenError) -> Self {
        match err {
            TokenError::Issue(e) => e.into(),
            TokenError::Rejected(e) => e.into(),
            TokenError::Config(e) => e.into(),
            TokenError::Authentication(e) => e.into(),
        }
    }
}

/// Result type alias using TokenError.
pub type Result<T> = std::result::Result<T, TokenError>;

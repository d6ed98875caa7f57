//! Token issuance and verification for microservices.
//!
//! This crate builds signed JWTs for authenticated principals and verifies
//! presented tokens against an immutable, shareable signing configuration.

mod algorithm;
pub mod claims;
mod config;
mod issuer;
mod keys;
mod login;
mod principal;
mod shared;
mod verifier;

pub use algorithm::Algorithm;
pub use config::{SigningConfiguration, SigningSettings, DEFAULT_CLOCK_SKEW, DEFAULT_LIFETIME};
pub use issuer::{issue, issue_at, IssuedToken};
pub use keys::{KeyMaterial, MIN_RSA_KEY_BITS};
pub use login::{login, Authenticator, Credentials, InMemoryUserDirectory};
pub use principal::Principal;
pub use shared::SharedSigningConfiguration;
pub use verifier::{verify, VerificationResult, VerifiedToken};

pub use error::{
    AuthenticationError, ConfigError, ErrorResponse, IssueError, Rejection, RejectionKind,
    TokenError,
};

//! Process-wide signing configuration with atomic rotation.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use error::IssueError;

use crate::config::SigningConfiguration;
use crate::issuer::{self, IssuedToken};
use crate::principal::Principal;
use crate::verifier::{self, VerificationResult};

/// Shared handle to the current [`SigningConfiguration`].
///
/// Readers take an `Arc` snapshot and never hold the lock while signing or
/// verifying. Rotation swaps the pointer; configurations are never mutated.
#[derive(Debug)]
pub struct SharedSigningConfiguration {
    current: RwLock<Arc<SigningConfiguration>>,
}

impl SharedSigningConfiguration {
    pub fn new(config: SigningConfiguration) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Snapshot of the configuration new calls should use.
    pub fn current(&self) -> Arc<SigningConfiguration> {
        // The guarded value is a single pointer, so a poisoned lock is still consistent.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the configuration, returning the previous one.
    pub fn rotate(&self, config: SigningConfiguration) -> Arc<SigningConfiguration> {
        let next = Arc::new(config);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *guard, next);
        drop(guard);

        tracing::info!(
            issuer = %previous.issuer(),
            previous_algorithm = %previous.algorithm(),
            algorithm = %self.current().algorithm(),
            "Rotated signing configuration"
        );
        previous
    }

    /// Issue against the current configuration.
    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken, IssueError> {
        issuer::issue(principal, &self.current())
    }

    /// Verify against the current configuration.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> VerificationResult {
        verifier::verify(token, &self.current(), now)
    }
}

impl From<SigningConfiguration> for SharedSigningConfiguration {
    fn from(config: SigningConfiguration) -> Self {
        Self::new(config)
    }
}

//! Credential login delegated to an external authenticator.
//!
//! Verifying passwords and looking up roles belong to the authenticator; this
//! module only sequences input validation, authentication and issuance.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use error::AuthenticationError;
use serde::Deserialize;
use serde_json::Value;

use crate::config::SigningConfiguration;
use crate::issuer::{self, IssuedToken};
use crate::principal::Principal;

/// Login input.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reject empty user names or passwords before any lookup happens.
    pub fn validate(&self) -> Result<(), AuthenticationError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(AuthenticationError::MissingCredentials);
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Verifies credentials against a user store and resolves the principal.
#[allow(async_fn_in_trait)]
pub trait Authenticator: Send + Sync {
    /// Authenticate credentials, returning the principal with its roles.
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Principal, AuthenticationError>;
}

struct UserRecord {
    password: String,
    roles: BTreeSet<String>,
    extra_claims: BTreeMap<String, Value>,
}

/// In-memory user directory for testing and development
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: HashMap<String, UserRecord>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with the given roles.
    pub fn with_user<I, S>(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        roles: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.insert(
            username.into(),
            UserRecord {
                password: password.into(),
                roles: roles.into_iter().map(Into::into).collect(),
                extra_claims: BTreeMap::new(),
            },
        );
        self
    }

    /// Attach an extra claim to a registered user.
    pub fn with_user_claim(
        mut self,
        username: &str,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        if let Some(record) = self.users.get_mut(username) {
            record.extra_claims.insert(name.into(), value.into());
        }
        self
    }
}

impl Authenticator for InMemoryUserDirectory {
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Principal, AuthenticationError> {
        let record = self
            .users
            .get(&credentials.username)
            .filter(|record| record.password == credentials.password)
            .ok_or(AuthenticationError::InvalidCredentials)?;

        Ok(Principal {
            subject: credentials.username.clone(),
            roles: record.roles.clone(),
            extra_claims: record.extra_claims.clone(),
        })
    }
}

/// Validate credentials, authenticate them and issue a token for the principal.
pub async fn login<A>(
    authenticator: &A,
    credentials: &Credentials,
    config: &SigningConfiguration,
) -> error::Result<IssuedToken>
where
    A: Authenticator,
{
    credentials.validate()?;
    let principal = authenticator.authenticate(credentials).await?;
    Ok(issuer::issue(&principal, config)?)
}

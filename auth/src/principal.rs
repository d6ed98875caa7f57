//! Authenticated identity carried by a token.

use std::collections::{BTreeMap, BTreeSet};

use error::IssueError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claims;

/// An authenticated principal: subject, roles and any extra claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Subject identifier (user ID)
    pub subject: String,
    /// Role names
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Additional claims, keyed by claim name
    #[serde(default)]
    pub extra_claims: BTreeMap<String, Value>,
}

impl Principal {
    /// Create a principal with no roles or extra claims.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Add a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Add several roles.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Add an extra claim, replacing any previous value under the same name.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_claims.insert(name.into(), value.into());
        self
    }

    /// Check if the principal has the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Check the principal can be turned into a claim set.
    pub fn validate(&self) -> Result<(), IssueError> {
        if self.subject.is_empty() {
            return Err(IssueError::InvalidPrincipal("subject must not be empty".into()));
        }
        if let Some(name) = self.extra_claims.keys().find(|name| claims::is_reserved(name)) {
            return Err(IssueError::InvalidPrincipal(format!(
                "extra claim '{name}' collides with a registered claim"
            )));
        }
        Ok(())
    }
}

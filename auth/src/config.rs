//! Signing configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use error::ConfigError;
use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::keys::KeyMaterial;

/// Default token lifetime.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// Default allowance for clock drift when checking `nbf` / `exp`.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(30);

/// Immutable signing configuration shared by issuance and verification.
#[derive(Debug)]
pub struct SigningConfiguration {
    issuer: String,
    audience: String,
    key: KeyMaterial,
    lifetime: Duration,
    clock_skew: Duration,
    not_before: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

impl SigningConfiguration {
    /// Create a configuration with the default lifetime and clock skew.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>, key: KeyMaterial) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            key,
            lifetime: DEFAULT_LIFETIME,
            clock_skew: DEFAULT_CLOCK_SKEW,
            not_before: None,
            expires_at: None,
        }
    }

    /// Set the token lifetime.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the clock-skew tolerance.
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Pin the not-before time of every issued token.
    pub fn with_not_before(mut self, start: DateTime<Utc>) -> Self {
        self.not_before = Some(start);
        self
    }

    /// Pin the expiry of every issued token. Takes precedence over the lifetime.
    pub fn with_expires_at(mut self, end: DateTime<Utc>) -> Self {
        self.expires_at = Some(end);
        self
    }

    /// Build a configuration from plain settings, loading key material.
    pub fn from_settings(settings: &SigningSettings) -> Result<Self, ConfigError> {
        let issuer = required(&settings.issuer, "issuer")?;
        let audience = required(&settings.audience, "audience")?;
        let algorithm: Algorithm = settings.algorithm.parse()?;

        let key = if algorithm.is_symmetric() {
            // The secret is opaque bytes: no trimming.
            let secret = settings
                .secret
                .as_deref()
                .filter(|secret| !secret.is_empty())
                .ok_or(ConfigError::MissingSetting("secret"))?;
            KeyMaterial::hmac(algorithm, secret)?
        } else if let Some(path) = &settings.private_key_path {
            KeyMaterial::rsa_private_pem(algorithm, &read_pem(path)?)?
        } else if let Some(path) = &settings.public_key_path {
            KeyMaterial::rsa_public_pem(algorithm, &read_pem(path)?)?
        } else {
            return Err(ConfigError::MissingSetting("private_key_path"));
        };

        let mut config = Self::new(issuer, audience, key)
            .with_lifetime(settings.lifetime())
            .with_clock_skew(settings.clock_skew());
        if let Some(start) = settings.not_before {
            config = config.with_not_before(start);
        }
        if let Some(end) = settings.expires_at {
            config = config.with_expires_at(end);
        }

        tracing::info!(
            issuer = %config.issuer,
            audience = %config.audience,
            %algorithm,
            can_sign = config.key.can_sign(),
            "Loaded signing configuration"
        );
        Ok(config)
    }

    /// Issuer stamped into `iss` and required on verification.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Audience stamped into `aud` and required on verification.
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Key material used to sign and verify.
    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// Algorithm tokens are signed with and must declare.
    pub fn algorithm(&self) -> Algorithm {
        self.key.algorithm()
    }

    /// Token lifetime counted from `nbf`.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Allowed clock drift on the `nbf` and `exp` checks.
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Start-time override, if any.
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    /// End-time override, if any.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(ConfigError::MissingSetting(name))
}

fn read_pem(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path)
        .map_err(|e| ConfigError::KeyMaterial(format!("cannot read {}: {e}", path.display())))
}

/// Plain signing settings as loaded from external configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningSettings {
    /// Expected and stamped issuer
    pub issuer: Option<String>,
    /// Expected and stamped audience
    pub audience: Option<String>,
    /// JOSE algorithm name
    pub algorithm: String,
    /// Shared secret for HS* algorithms
    pub secret: Option<String>,
    /// PEM private key for RS* algorithms
    pub private_key_path: Option<PathBuf>,
    /// PEM public key for verification-only RS* deployments
    pub public_key_path: Option<PathBuf>,
    /// Token lifetime in seconds
    pub lifetime_secs: u64,
    /// Clock-skew tolerance in seconds
    pub clock_skew_secs: u64,
    /// Fixed not-before for issued tokens
    pub not_before: Option<DateTime<Utc>>,
    /// Fixed expiry for issued tokens
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            algorithm: Algorithm::default().as_str().to_string(),
            secret: None,
            private_key_path: None,
            public_key_path: None,
            lifetime_secs: DEFAULT_LIFETIME.as_secs(),
            clock_skew_secs: DEFAULT_CLOCK_SKEW.as_secs(),
            not_before: None,
            expires_at: None,
        }
    }
}

impl fmt::Debug for SigningSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSettings")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("algorithm", &self.algorithm)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .field("lifetime_secs", &self.lifetime_secs)
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("not_before", &self.not_before)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl SigningSettings {
    /// Create settings from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create settings from any `TOKEN_*` variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(issuer) = lookup("TOKEN_ISSUER") {
            settings.issuer = Some(issuer);
        }

        if let Some(audience) = lookup("TOKEN_AUDIENCE") {
            settings.audience = Some(audience);
        }

        if let Some(algorithm) = lookup("TOKEN_ALGORITHM") {
            settings.algorithm = algorithm;
        }

        if let Some(secret) = lookup("TOKEN_SECRET") {
            settings.secret = Some(secret);
        }

        if let Some(path) = lookup("TOKEN_PRIVATE_KEY_PATH") {
            settings.private_key_path = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("TOKEN_PUBLIC_KEY_PATH") {
            settings.public_key_path = Some(PathBuf::from(path));
        }

        if let Some(secs) = parse_var(&lookup, "TOKEN_LIFETIME_SECS") {
            settings.lifetime_secs = secs;
        }

        if let Some(secs) = parse_var(&lookup, "TOKEN_CLOCK_SKEW_SECS") {
            settings.clock_skew_secs = secs;
        }

        if let Some(start) = parse_var(&lookup, "TOKEN_NOT_BEFORE") {
            settings.not_before = Some(start);
        }

        if let Some(end) = parse_var(&lookup, "TOKEN_EXPIRES_AT") {
            settings.expires_at = Some(end);
        }

        settings
    }

    /// Get token lifetime as Duration
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    /// Get clock skew as Duration
    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.clock_skew_secs)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

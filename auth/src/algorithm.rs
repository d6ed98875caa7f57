//! Supported signing algorithms.

use std::fmt;
use std::str::FromStr;

use error::ConfigError;
use jwt::AlgorithmType;
use serde::{Deserialize, Serialize};

/// JOSE signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// HMAC with SHA-256
    #[serde(rename = "HS256")]
    Hs256,
    /// HMAC with SHA-384
    #[serde(rename = "HS384")]
    Hs384,
    /// HMAC with SHA-512
    #[serde(rename = "HS512")]
    Hs512,
    /// RSASSA-PKCS1-v1_5 with SHA-256
    #[serde(rename = "RS256")]
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384
    #[serde(rename = "RS384")]
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512
    #[serde(rename = "RS512")]
    Rs512,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Hs256
    }
}

impl Algorithm {
    /// JOSE `alg` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
        }
    }

    /// Whether the algorithm uses a shared secret.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::Hs256 | Self::Hs384 | Self::Hs512)
    }

    pub(crate) fn to_jwt(self) -> AlgorithmType {
        match self {
            Self::Hs256 => AlgorithmType::Hs256,
            Self::Hs384 => AlgorithmType::Hs384,
            Self::Hs512 => AlgorithmType::Hs512,
            Self::Rs256 => AlgorithmType::Rs256,
            Self::Rs384 => AlgorithmType::Rs384,
            Self::Rs512 => AlgorithmType::Rs512,
        }
    }
}

/// JOSE name of any header algorithm, including ones this crate never signs with.
pub(crate) fn header_name(algorithm: AlgorithmType) -> String {
    serde_json::to_value(algorithm)
        .ok()
        .and_then(|value| value.as_str().map(str::to_owned))
        .unwrap_or_else(|| format!("{algorithm:?}"))
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            "RS256" => Ok(Self::Rs256),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            _ => Err(ConfigError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

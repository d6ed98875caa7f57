//! Key material for signing and verifying tokens.
//!
//! HMAC keys go through the `jwt` crate's RustCrypto backend directly; RSA keys
//! are adapted onto the same `SigningAlgorithm` / `VerifyingAlgorithm` traits so
//! both kinds flow through one token pipeline.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use error::ConfigError;
use hmac::{Hmac, Mac};
use jwt::{AlgorithmType, SigningAlgorithm, VerifyingAlgorithm};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer as _, Verifier as _};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};

use crate::algorithm::Algorithm;

/// Smallest RSA modulus accepted, in bits.
pub const MIN_RSA_KEY_BITS: usize = 2048;

pub(crate) enum HmacKey {
    Hs256(Hmac<Sha256>),
    Hs384(Hmac<Sha384>),
    Hs512(Hmac<Sha512>),
}

pub(crate) enum RsaSigner {
    Rs256(SigningKey<Sha256>),
    Rs384(SigningKey<Sha384>),
    Rs512(SigningKey<Sha512>),
}

enum RsaVerifier {
    Rs256(VerifyingKey<Sha256>),
    Rs384(VerifyingKey<Sha384>),
    Rs512(VerifyingKey<Sha512>),
}

enum Inner {
    Hmac(HmacKey),
    Rsa {
        signer: Option<RsaSigner>,
        verifier: RsaVerifier,
    },
}

/// Key material bound to exactly one signing algorithm.
pub struct KeyMaterial {
    algorithm: Algorithm,
    inner: Inner,
}

impl KeyMaterial {
    /// Shared-secret key for an HS* algorithm.
    pub fn hmac(algorithm: Algorithm, secret: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(ConfigError::KeyMaterial("HMAC secret must not be empty".into()));
        }

        let invalid = |e: hmac::digest::InvalidLength| ConfigError::KeyMaterial(e.to_string());
        let (key, digest_len) = match algorithm {
            Algorithm::Hs256 => {
                let key = Hmac::new_from_slice(secret).map_err(invalid)?;
                (HmacKey::Hs256(key), 32)
            }
            Algorithm::Hs384 => {
                let key = Hmac::new_from_slice(secret).map_err(invalid)?;
                (HmacKey::Hs384(key), 48)
            }
            Algorithm::Hs512 => {
                let key = Hmac::new_from_slice(secret).map_err(invalid)?;
                (HmacKey::Hs512(key), 64)
            }
            other => {
                return Err(ConfigError::KeyMaterial(format!(
                    "{other} requires an RSA key, not a shared secret"
                )))
            }
        };

        if secret.len() < digest_len {
            tracing::warn!(
                %algorithm,
                secret_bytes = secret.len(),
                "HMAC secret is shorter than the digest output"
            );
        }

        Ok(Self {
            algorithm,
            inner: Inner::Hmac(key),
        })
    }

    /// RSA key pair from a PKCS#8 or PKCS#1 private key PEM.
    pub fn rsa_private_pem(algorithm: Algorithm, pem: &str) -> Result<Self, ConfigError> {
        let key = <RsaPrivateKey as DecodePrivateKey>::from_pkcs8_pem(pem)
            .or_else(|_| <RsaPrivateKey as DecodeRsaPrivateKey>::from_pkcs1_pem(pem))
            .map_err(|e| ConfigError::KeyMaterial(format!("unreadable RSA private key: {e}")))?;
        Self::from_rsa_private_key(algorithm, key)
    }

    /// Verification-only RSA key from an SPKI or PKCS#1 public key PEM.
    pub fn rsa_public_pem(algorithm: Algorithm, pem: &str) -> Result<Self, ConfigError> {
        let key = <RsaPublicKey as DecodePublicKey>::from_public_key_pem(pem)
            .or_else(|_| <RsaPublicKey as DecodeRsaPublicKey>::from_pkcs1_pem(pem))
            .map_err(|e| ConfigError::KeyMaterial(format!("unreadable RSA public key: {e}")))?;
        Self::from_rsa_public_key(algorithm, key)
    }

    /// RSA key pair that can both sign and verify.
    pub fn from_rsa_private_key(
        algorithm: Algorithm,
        key: RsaPrivateKey,
    ) -> Result<Self, ConfigError> {
        check_rsa(algorithm, key.size())?;
        let verifier = rsa_verifier(algorithm, key.to_public_key());
        let signer = match algorithm {
            Algorithm::Rs256 => RsaSigner::Rs256(SigningKey::new(key)),
            Algorithm::Rs384 => RsaSigner::Rs384(SigningKey::new(key)),
            _ => RsaSigner::Rs512(SigningKey::new(key)),
        };

        Ok(Self {
            algorithm,
            inner: Inner::Rsa {
                signer: Some(signer),
                verifier,
            },
        })
    }

    /// Verification-only RSA key.
    pub fn from_rsa_public_key(
        algorithm: Algorithm,
        key: RsaPublicKey,
    ) -> Result<Self, ConfigError> {
        check_rsa(algorithm, key.size())?;
        Ok(Self {
            algorithm,
            inner: Inner::Rsa {
                signer: None,
                verifier: rsa_verifier(algorithm, key),
            },
        })
    }

    /// Algorithm this key material is bound to.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Whether the key material can produce signatures.
    pub fn can_sign(&self) -> bool {
        match &self.inner {
            Inner::Hmac(_) => true,
            Inner::Rsa { signer, .. } => signer.is_some(),
        }
    }

    /// Signing view of the key, or `None` for verification-only material.
    pub(crate) fn signer(&self) -> Option<Signer<'_>> {
        match &self.inner {
            Inner::Hmac(key) => Some(Signer::Hmac(key)),
            Inner::Rsa { signer, .. } => signer.as_ref().map(Signer::Rsa),
        }
    }
}

fn check_rsa(algorithm: Algorithm, modulus_bytes: usize) -> Result<(), ConfigError> {
    if algorithm.is_symmetric() {
        return Err(ConfigError::KeyMaterial(format!(
            "{algorithm} requires a shared secret, not an RSA key"
        )));
    }
    let bits = modulus_bytes * 8;
    if bits < MIN_RSA_KEY_BITS {
        return Err(ConfigError::KeyMaterial(format!(
            "RSA modulus of {bits} bits is below the {MIN_RSA_KEY_BITS}-bit minimum"
        )));
    }
    Ok(())
}

fn rsa_verifier(algorithm: Algorithm, key: RsaPublicKey) -> RsaVerifier {
    match algorithm {
        Algorithm::Rs256 => RsaVerifier::Rs256(VerifyingKey::new(key)),
        Algorithm::Rs384 => RsaVerifier::Rs384(VerifyingKey::new(key)),
        _ => RsaVerifier::Rs512(VerifyingKey::new(key)),
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner {
            Inner::Hmac(_) => "hmac",
            Inner::Rsa { .. } => "rsa",
        };
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("kind", &kind)
            .field("can_sign", &self.can_sign())
            .finish_non_exhaustive()
    }
}

impl VerifyingAlgorithm for KeyMaterial {
    fn algorithm_type(&self) -> AlgorithmType {
        self.algorithm.to_jwt()
    }

    fn verify_bytes(
        &self,
        header: &str,
        claims: &str,
        signature: &[u8],
    ) -> Result<bool, jwt::Error> {
        match &self.inner {
            Inner::Hmac(HmacKey::Hs256(key)) => key.verify_bytes(header, claims, signature),
            Inner::Hmac(HmacKey::Hs384(key)) => key.verify_bytes(header, claims, signature),
            Inner::Hmac(HmacKey::Hs512(key)) => key.verify_bytes(header, claims, signature),
            Inner::Rsa { verifier, .. } => {
                let Ok(signature) = Signature::try_from(signature) else {
                    return Ok(false);
                };
                let message = signing_input(header, claims);
                let valid = match verifier {
                    RsaVerifier::Rs256(key) => key.verify(message.as_bytes(), &signature),
                    RsaVerifier::Rs384(key) => key.verify(message.as_bytes(), &signature),
                    RsaVerifier::Rs512(key) => key.verify(message.as_bytes(), &signature),
                };
                Ok(valid.is_ok())
            }
        }
    }
}

/// Borrowed signing half of a [`KeyMaterial`].
pub(crate) enum Signer<'a> {
    Hmac(&'a HmacKey),
    Rsa(&'a RsaSigner),
}

impl SigningAlgorithm for Signer<'_> {
    fn algorithm_type(&self) -> AlgorithmType {
        match self {
            Signer::Hmac(HmacKey::Hs256(_)) => AlgorithmType::Hs256,
            Signer::Hmac(HmacKey::Hs384(_)) => AlgorithmType::Hs384,
            Signer::Hmac(HmacKey::Hs512(_)) => AlgorithmType::Hs512,
            Signer::Rsa(RsaSigner::Rs256(_)) => AlgorithmType::Rs256,
            Signer::Rsa(RsaSigner::Rs384(_)) => AlgorithmType::Rs384,
            Signer::Rsa(RsaSigner::Rs512(_)) => AlgorithmType::Rs512,
        }
    }

    fn sign(&self, header: &str, claims: &str) -> Result<String, jwt::Error> {
        let rsa = match self {
            Signer::Hmac(HmacKey::Hs256(key)) => return key.sign(header, claims),
            Signer::Hmac(HmacKey::Hs384(key)) => return key.sign(header, claims),
            Signer::Hmac(HmacKey::Hs512(key)) => return key.sign(header, claims),
            Signer::Rsa(rsa) => rsa,
        };

        let message = signing_input(header, claims);
        let signature = match rsa {
            RsaSigner::Rs256(key) => key.try_sign(message.as_bytes()),
            RsaSigner::Rs384(key) => key.try_sign(message.as_bytes()),
            RsaSigner::Rs512(key) => key.try_sign(message.as_bytes()),
        }
        // jwt::Error has no variant for backend signing failures.
        .map_err(|_| jwt::Error::InvalidSignature)?;

        Ok(URL_SAFE_NO_PAD.encode(signature.to_vec()))
    }
}

fn signing_input(header: &str, claims: &str) -> String {
    format!("{header}.{claims}")
}

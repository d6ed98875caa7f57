//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::OnceLock;
use std::time::Duration;

use auth::{Algorithm, KeyMaterial, SigningConfiguration};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use rsa::rand_core::OsRng;
use rsa::RsaPrivateKey;
use serde_json::Value;

pub const SECRET: &str = "integration-secret-integration-secret";

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// `{issuer: "app", audience: "app-clients", lifetime: 3600s, skew: 0s}` over HS256.
pub fn hmac_config() -> SigningConfiguration {
    let key = KeyMaterial::hmac(Algorithm::Hs256, SECRET).unwrap();
    SigningConfiguration::new("app", "app-clients", key)
        .with_lifetime(Duration::from_secs(3600))
        .with_clock_skew(Duration::ZERO)
}

/// One 2048-bit RSA key per test binary; generation is slow.
pub fn rsa_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("key generation"))
}

pub fn rsa_config(algorithm: Algorithm) -> SigningConfiguration {
    let key = KeyMaterial::from_rsa_private_key(algorithm, rsa_private_key().clone()).unwrap();
    SigningConfiguration::new("app", "app-clients", key)
        .with_lifetime(Duration::from_secs(3600))
        .with_clock_skew(Duration::ZERO)
}

pub fn decode_segment(token: &str, index: usize) -> Value {
    let part = token.split('.').nth(index).expect("segment present");
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(part).expect("base64url")).expect("json")
}

/// Replace one segment of a compact token with raw bytes.
pub fn replace_segment(token: &str, index: usize, bytes: &[u8]) -> String {
    let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();
    parts[index] = URL_SAFE_NO_PAD.encode(bytes);
    parts.join(".")
}

pub fn signature_bytes(token: &str) -> Vec<u8> {
    let part = token.rsplit('.').next().expect("signature segment");
    URL_SAFE_NO_PAD.decode(part).expect("base64url")
}

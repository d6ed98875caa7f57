//! Token verification.
//!
//! A single deterministic pass: structure, algorithm, signature, claim shape,
//! issuer, audience, then the validity window. The first failing check is the
//! one reported.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use error::Rejection;
use jwt::{Header, Token, VerifyWithKey};
use serde::Serialize;
use serde_json::Value;

use crate::algorithm::header_name;
use crate::claims::TokenClaims;
use crate::config::SigningConfiguration;
use crate::principal::Principal;

/// A token that passed every check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedToken {
    /// Principal reconstructed from the claims
    pub principal: Principal,
    /// Unique token identifier (`jti`), when present
    pub token_id: Option<String>,
    pub issuer: String,
    pub audience: Vec<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub not_before: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a verification call.
pub type VerificationResult = Result<VerifiedToken, Rejection>;

/// Verify a compact token against the configuration at time `now`.
pub fn verify(
    token: &str,
    config: &SigningConfiguration,
    now: DateTime<Utc>,
) -> VerificationResult {
    let unverified: Token<Header, BTreeMap<String, Value>, _> =
        Token::parse_unverified(token).map_err(|e| Rejection::MalformedToken(e.to_string()))?;

    let expected = config.algorithm();
    let declared = unverified.header().algorithm;
    if declared != expected.to_jwt() {
        return Err(Rejection::AlgorithmMismatch {
            expected: expected.as_str().to_string(),
            found: header_name(declared),
        });
    }

    let verified: Token<Header, BTreeMap<String, Value>, _> = unverified
        .verify_with_key(config.key())
        .map_err(|_| Rejection::InvalidSignature)?;
    let claims = TokenClaims::try_from(verified.claims().clone())?;

    let issuer = match claims.issuer {
        Some(issuer) if issuer == config.issuer() => issuer,
        found => {
            return Err(Rejection::IssuerMismatch {
                expected: config.issuer().to_string(),
                found,
            })
        }
    };

    if !claims.audience.iter().any(|aud| aud == config.audience()) {
        return Err(Rejection::AudienceMismatch {
            expected: config.audience().to_string(),
            found: claims.audience,
        });
    }

    let now = now.timestamp();
    let skew_secs = config.clock_skew().as_secs();
    let skew = i64::try_from(skew_secs).unwrap_or(i64::MAX);

    let not_before = claims.not_before.timestamp();
    if now.saturating_add(skew) < not_before {
        return Err(Rejection::NotYetValid {
            not_before,
            now,
            skew_secs,
        });
    }

    let expires_at = claims.expires_at.timestamp();
    if now.saturating_sub(skew) > expires_at {
        return Err(Rejection::Expired {
            expires_at,
            now,
            skew_secs,
        });
    }

    Ok(VerifiedToken {
        principal: Principal {
            subject: claims.subject,
            roles: claims.roles,
            extra_claims: claims.extra,
        },
        token_id: claims.token_id,
        issuer,
        audience: claims.audience,
        issued_at: claims.issued_at,
        not_before: claims.not_before,
        expires_at: claims.expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Algorithm;
    use crate::issuer::issue_at;
    use crate::keys::KeyMaterial;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::TimeZone;
    use error::RejectionKind;
    use hmac::{Hmac, Mac};
    use serde_json::json;
    use sha2::Sha256;
    use std::time::Duration;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn config() -> SigningConfiguration {
        let key = KeyMaterial::hmac(Algorithm::Hs256, SECRET).unwrap();
        SigningConfiguration::new("app", "app-clients", key)
            .with_lifetime(Duration::from_secs(3600))
            .with_clock_skew(Duration::ZERO)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    /// Hand-assemble an HS256 token over arbitrary header and payload JSON.
    fn forge(header: Value, payload: Value, secret: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(header.to_string());
        let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{header}.{payload}").as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{header}.{payload}.{signature}")
    }

    fn hs256() -> Value {
        json!({ "alg": "HS256", "typ": "JWT" })
    }

    #[test]
    fn test_verify_accepts_issued_token() {
        let principal = Principal::new("alice").with_role("Admin");
        let issued = issue_at(&principal, &config(), at(1000)).unwrap();
        let verified = verify(issued.as_str(), &config(), at(1000)).unwrap();

        assert_eq!(verified.principal, principal);
        assert_eq!(verified.token_id.as_deref(), Some(issued.token_id.as_str()));
        assert_eq!(verified.issuer, "app");
        assert_eq!(verified.issued_at, Some(at(1000)));
        assert_eq!(verified.not_before, at(1000));
        assert_eq!(verified.expires_at, at(4600));
    }

    #[test]
    fn test_malformed_structure() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.sig"] {
            let err = verify(token, &config(), at(1000)).unwrap_err();
            assert_eq!(err.kind(), RejectionKind::MalformedToken, "{token:?}");
        }
    }

    #[test]
    fn test_algorithm_checked_before_signature() {
        let token = forge(
            json!({ "alg": "HS512", "typ": "JWT" }),
            json!({ "sub": "alice" }),
            "wrong-secret",
        );
        let err = verify(&token, &config(), at(1000)).unwrap_err();
        assert_eq!(
            err,
            Rejection::AlgorithmMismatch {
                expected: "HS256".into(),
                found: "HS512".into()
            }
        );
    }

    #[test]
    fn test_signature_checked_before_claims() {
        let token = forge(hs256(), json!({ "iss": "someone-else" }), "wrong-secret");
        let err = verify(&token, &config(), at(1000)).unwrap_err();
        assert_eq!(err, Rejection::InvalidSignature);
    }

    #[test]
    fn test_unrepresentable_date_is_malformed_before_issuer() {
        let token = forge(
            hs256(),
            json!({
                "iss": "other",
                "aud": "other",
                "sub": "alice",
                "nbf": 0,
                "exp": 10_000_000_000_000_i64
            }),
            SECRET,
        );
        let err = verify(&token, &config(), at(1000)).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::MalformedToken);
    }

    #[test]
    fn test_issuer_checked_before_audience() {
        let token = forge(
            hs256(),
            json!({ "iss": "other", "aud": "other", "sub": "alice", "nbf": 0, "exp": 10 }),
            SECRET,
        );
        let err = verify(&token, &config(), at(1000)).unwrap_err();
        assert_eq!(
            err,
            Rejection::IssuerMismatch {
                expected: "app".into(),
                found: Some("other".into())
            }
        );

        let token = forge(
            hs256(),
            json!({ "aud": "app-clients", "sub": "alice", "nbf": 0, "exp": 5000 }),
            SECRET,
        );
        let err = verify(&token, &config(), at(1000)).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::IssuerMismatch);
    }

    #[test]
    fn test_audience_checked_before_time() {
        let token = forge(
            hs256(),
            json!({ "iss": "app", "aud": ["x", "y"], "sub": "alice", "nbf": 0, "exp": 10 }),
            SECRET,
        );
        let err = verify(&token, &config(), at(1000)).unwrap_err();
        assert_eq!(
            err,
            Rejection::AudienceMismatch {
                expected: "app-clients".into(),
                found: vec!["x".into(), "y".into()]
            }
        );
    }

    #[test]
    fn test_not_yet_valid_respects_skew() {
        let issued = issue_at(
            &Principal::new("alice"),
            &config().with_not_before(at(2000)),
            at(1000),
        )
        .unwrap();

        let err = verify(issued.as_str(), &config(), at(1999)).unwrap_err();
        assert_eq!(
            err,
            Rejection::NotYetValid {
                not_before: 2000,
                now: 1999,
                skew_secs: 0
            }
        );

        let lenient = config().with_clock_skew(Duration::from_secs(1));
        assert!(verify(issued.as_str(), &lenient, at(1999)).is_ok());
    }

    #[test]
    fn test_third_party_token_with_audience_list() {
        let token = forge(
            hs256(),
            json!({
                "iss": "app",
                "aud": ["billing", "app-clients"],
                "sub": "svc-42",
                "iat": 1000,
                "exp": 2000,
                "role": ["reader", "writer"],
                "tenant": "acme"
            }),
            SECRET,
        );
        let verified = verify(&token, &config(), at(1500)).unwrap();

        assert_eq!(verified.principal.subject, "svc-42");
        assert!(verified.principal.has_role("reader"));
        assert!(verified.principal.has_role("writer"));
        assert_eq!(verified.principal.extra_claims["tenant"], "acme");
        assert_eq!(verified.not_before, at(1000));
        assert!(verified.token_id.is_none());
    }
}

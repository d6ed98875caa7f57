//! Token issuance.

use chrono::{DateTime, TimeZone, Utc};
use error::IssueError;
use jwt::header::HeaderType;
use jwt::{Header, SignWithKey, Token};
use serde::Serialize;
use uuid::Uuid;

use crate::claims::{self, Registration};
use crate::config::SigningConfiguration;
use crate::principal::Principal;

/// A signed compact token and the registered values stamped into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    token: String,
    /// Unique token identifier (`jti`)
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub not_before: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// The compact serialization.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn into_string(self) -> String {
        self.token
    }
}

impl From<IssuedToken> for String {
    fn from(issued: IssuedToken) -> Self {
        issued.token
    }
}

/// Issue a token for a principal, starting now.
pub fn issue(
    principal: &Principal,
    config: &SigningConfiguration,
) -> Result<IssuedToken, IssueError> {
    issue_at(principal, config, Utc::now())
}

/// Issue a token for a principal as if the current time were `now`.
pub fn issue_at(
    principal: &Principal,
    config: &SigningConfiguration,
    now: DateTime<Utc>,
) -> Result<IssuedToken, IssueError> {
    principal.validate()?;

    let issued_at = now.timestamp();
    let not_before = config.not_before().map_or(issued_at, |start| start.timestamp());
    let expires_at = match config.expires_at() {
        Some(end) => end.timestamp(),
        None => i64::try_from(config.lifetime().as_secs())
            .ok()
            .and_then(|secs| not_before.checked_add(secs))
            .unwrap_or(i64::MAX),
    };
    let invalid_window = || IssueError::InvalidValidityWindow {
        not_before,
        expires_at,
    };
    if expires_at <= not_before {
        return Err(invalid_window());
    }

    let signer = config.key().signer().ok_or_else(|| {
        IssueError::SigningFailure("key material is verification-only".to_string())
    })?;

    let token_id = Uuid::new_v4().to_string();
    let claims = claims::build(
        principal,
        &Registration {
            issuer: config.issuer(),
            audience: config.audience(),
            token_id: &token_id,
            issued_at,
            not_before,
            expires_at,
        },
    );

    let header = Header {
        algorithm: config.algorithm().to_jwt(),
        type_: Some(HeaderType::JsonWebToken),
        ..Default::default()
    };
    let signed = Token::new(header, claims)
        .sign_with_key(&signer)
        .map_err(|e| IssueError::SigningFailure(e.to_string()))?;

    let to_time = |secs: i64| Utc.timestamp_opt(secs, 0).single().ok_or(invalid_window());
    Ok(IssuedToken {
        token: signed.as_str().to_string(),
        token_id,
        issued_at: to_time(issued_at)?,
        not_before: to_time(not_before)?,
        expires_at: to_time(expires_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Algorithm;
    use crate::keys::KeyMaterial;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde_json::Value;
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

    fn segment(token: &str, index: usize) -> Value {
        let part = token.split('.').nth(index).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(part).unwrap()).unwrap()
    }

    #[test]
    fn test_issue_stamps_registered_claims() {
        let principal = Principal::new("alice").with_role("Admin");
        let issued = issue_at(&principal, &config(), at(1000)).unwrap();

        assert_eq!(issued.not_before.timestamp(), 1000);
        assert_eq!(issued.expires_at.timestamp(), 4600);

        let header = segment(issued.as_str(), 0);
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");

        let payload = segment(issued.as_str(), 1);
        assert_eq!(payload["iss"], "app");
        assert_eq!(payload["aud"], "app-clients");
        assert_eq!(payload["sub"], "alice");
        assert_eq!(payload["role"], "Admin");
        assert_eq!(payload["iat"], 1000);
        assert_eq!(payload["nbf"], 1000);
        assert_eq!(payload["exp"], 4600);
        assert_eq!(payload["jti"], issued.token_id.as_str());
    }

    #[test]
    fn test_token_ids_are_random_v4_uuids() {
        let principal = Principal::new("alice");
        let first = issue_at(&principal, &config(), at(1000)).unwrap();
        let second = issue_at(&principal, &config(), at(1000)).unwrap();

        assert_ne!(first.token_id, second.token_id);
        assert_ne!(first.as_str(), second.as_str());
        assert_eq!(Uuid::parse_str(&first.token_id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn test_empty_subject_is_invalid_principal() {
        let err = issue_at(&Principal::new(""), &config(), at(1000)).unwrap_err();
        assert!(matches!(err, IssueError::InvalidPrincipal(_)));
    }

    #[test]
    fn test_window_overrides_take_precedence() {
        let config = config().with_not_before(at(2000)).with_expires_at(at(2500));
        let issued = issue_at(&Principal::new("alice"), &config, at(1000)).unwrap();

        assert_eq!(issued.issued_at.timestamp(), 1000);
        assert_eq!(issued.not_before.timestamp(), 2000);
        assert_eq!(issued.expires_at.timestamp(), 2500);
    }

    #[test]
    fn test_start_override_shifts_lifetime() {
        let config = config().with_not_before(at(2000));
        let issued = issue_at(&Principal::new("alice"), &config, at(1000)).unwrap();
        assert_eq!(issued.expires_at.timestamp(), 5600);
    }

    #[test]
    fn test_empty_window_is_rejected() {
        let err = issue_at(
            &Principal::new("alice"),
            &config().with_lifetime(Duration::ZERO),
            at(1000),
        )
        .unwrap_err();
        assert_eq!(
            err,
            IssueError::InvalidValidityWindow {
                not_before: 1000,
                expires_at: 1000
            }
        );

        let config = config().with_expires_at(at(900));
        let err = issue_at(&Principal::new("alice"), &config, at(1000)).unwrap_err();
        assert!(matches!(err, IssueError::InvalidValidityWindow { .. }));
    }
}

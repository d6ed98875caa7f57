//! Claim-set construction and parsing.
//!
//! The payload is a flat, string-keyed JSON object. Registered claims follow
//! RFC 7519; roles travel under [`ROLE`]; everything else is an extra claim.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeZone, Utc};
use error::Rejection;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::principal::Principal;

pub const ISSUER: &str = "iss";
pub const AUDIENCE: &str = "aud";
pub const SUBJECT: &str = "sub";
pub const TOKEN_ID: &str = "jti";
pub const ISSUED_AT: &str = "iat";
pub const NOT_BEFORE: &str = "nbf";
pub const EXPIRES_AT: &str = "exp";
pub const ROLE: &str = "role";

const RESERVED: [&str; 8] = [
    ISSUER, AUDIENCE, SUBJECT, TOKEN_ID, ISSUED_AT, NOT_BEFORE, EXPIRES_AT, ROLE,
];

/// Check if a claim name is reserved for registered claims or roles.
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

pub(crate) type ClaimMap = BTreeMap<String, Value>;

/// Registered values stamped into a freshly issued token.
pub(crate) struct Registration<'a> {
    pub issuer: &'a str,
    pub audience: &'a str,
    pub token_id: &'a str,
    pub issued_at: i64,
    pub not_before: i64,
    pub expires_at: i64,
}

/// Build the payload for a principal.
pub(crate) fn build(principal: &Principal, registration: &Registration<'_>) -> ClaimMap {
    let mut claims = ClaimMap::new();
    for (name, value) in &principal.extra_claims {
        claims.insert(name.clone(), value.clone());
    }

    claims.insert(ISSUER.to_string(), json!(registration.issuer));
    claims.insert(AUDIENCE.to_string(), json!(registration.audience));
    claims.insert(SUBJECT.to_string(), json!(principal.subject));
    claims.insert(TOKEN_ID.to_string(), json!(registration.token_id));
    claims.insert(ISSUED_AT.to_string(), json!(registration.issued_at));
    claims.insert(NOT_BEFORE.to_string(), json!(registration.not_before));
    claims.insert(EXPIRES_AT.to_string(), json!(registration.expires_at));

    let mut roles = principal.roles.iter();
    match (roles.next(), roles.next()) {
        (None, _) => {}
        (Some(role), None) => {
            claims.insert(ROLE.to_string(), json!(role));
        }
        _ => {
            claims.insert(ROLE.to_string(), json!(principal.roles));
        }
    }

    claims
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

/// Payload of a token whose signature has been checked.
#[derive(Debug)]
pub(crate) struct TokenClaims {
    pub issuer: Option<String>,
    pub audience: Vec<String>,
    pub subject: String,
    pub token_id: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub not_before: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub roles: BTreeSet<String>,
    pub extra: ClaimMap,
}

impl TryFrom<ClaimMap> for TokenClaims {
    type Error = Rejection;

    fn try_from(mut claims: ClaimMap) -> Result<Self, Rejection> {
        let issuer = take_string(&mut claims, ISSUER)?;
        let audience = take_list(&mut claims, AUDIENCE)?;
        let subject = take_string(&mut claims, SUBJECT)?
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| malformed("missing subject"))?;
        let token_id = take_string(&mut claims, TOKEN_ID)?;
        let issued_at = take_date(&mut claims, ISSUED_AT)?;
        let not_before = take_date(&mut claims, NOT_BEFORE)?
            .or(issued_at)
            .ok_or_else(|| malformed("missing nbf and iat"))?;
        let expires_at =
            take_date(&mut claims, EXPIRES_AT)?.ok_or_else(|| malformed("missing exp"))?;
        let roles = take_list(&mut claims, ROLE)?.into_iter().collect();

        Ok(Self {
            issuer,
            audience,
            subject,
            token_id,
            issued_at,
            not_before,
            expires_at,
            roles,
            extra: claims,
        })
    }
}

fn malformed(reason: impl Into<String>) -> Rejection {
    Rejection::MalformedToken(reason.into())
}

fn take_string(claims: &mut ClaimMap, name: &str) -> Result<Option<String>, Rejection> {
    match claims.remove(name) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(malformed(format!("claim '{name}' must be a string"))),
    }
}

fn take_list(claims: &mut ClaimMap, name: &str) -> Result<Vec<String>, Rejection> {
    match claims.remove(name) {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value::<OneOrMany>(value)
            .map(OneOrMany::into_vec)
            .map_err(|_| malformed(format!("claim '{name}' must be a string or list of strings"))),
    }
}

/// Numeric date claim, which must also be a representable point in time.
fn take_date(claims: &mut ClaimMap, name: &str) -> Result<Option<DateTime<Utc>>, Rejection> {
    let Some(value) = claims.remove(name) else {
        return Ok(None);
    };
    let secs = value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
        .ok_or_else(|| malformed(format!("claim '{name}' must be a numeric date")))?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(Some)
        .ok_or_else(|| malformed(format!("claim '{name}' is out of range")))
}

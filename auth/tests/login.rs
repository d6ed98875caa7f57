//! Login flow through the authenticator interface.

mod common;

use auth::{
    login, verify, AuthenticationError, Authenticator, Credentials, ErrorResponse,
    InMemoryUserDirectory, Principal, TokenError,
};
use chrono::Utc;
use common::hmac_config;

fn directory() -> InMemoryUserDirectory {
    InMemoryUserDirectory::new()
        .with_user("alice", "correct horse", ["Admin", "Auditor"])
        .with_user("bob", "battery staple", Vec::<String>::new())
        .with_user_claim("alice", "department", "finance")
}

#[tokio::test]
async fn test_login_issues_token_with_directory_roles() {
    let config = hmac_config();
    let issued = login(&directory(), &Credentials::new("alice", "correct horse"), &config)
        .await
        .expect("login succeeds");

    let verified = verify(issued.as_str(), &config, Utc::now()).unwrap();
    assert_eq!(verified.principal.subject, "alice");
    assert!(verified.principal.has_role("Admin"));
    assert!(verified.principal.has_role("Auditor"));
    assert_eq!(verified.principal.extra_claims["department"], "finance");
}

#[tokio::test]
async fn test_login_does_not_invent_roles() {
    let config = hmac_config();
    let issued = login(&directory(), &Credentials::new("bob", "battery staple"), &config)
        .await
        .unwrap();

    let verified = verify(issued.as_str(), &config, Utc::now()).unwrap();
    assert!(verified.principal.roles.is_empty());
}

#[tokio::test]
async fn test_login_rejects_missing_credentials_before_lookup() {
    struct Unreachable;

    impl Authenticator for Unreachable {
        async fn authenticate(&self, _: &Credentials) -> Result<Principal, AuthenticationError> {
            panic!("authenticator must not be consulted");
        }
    }

    let err = login(&Unreachable, &Credentials::new("alice", ""), &hmac_config())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TokenError::Authentication(AuthenticationError::MissingCredentials)
    ));
    assert_eq!(ErrorResponse::from(&err).status, 400);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let err = login(&directory(), &Credentials::new("alice", "wrong"), &hmac_config())
        .await
        .unwrap_err();

    let response = ErrorResponse::from(&err);
    assert_eq!(response.code, "AUTH_INVALID_CREDENTIALS");
    assert_eq!(response.status, 401);
}

#[tokio::test]
async fn test_directory_errors_surface_unchanged() {
    struct Offline;

    impl Authenticator for Offline {
        async fn authenticate(&self, _: &Credentials) -> Result<Principal, AuthenticationError> {
            Err(AuthenticationError::Directory("connection refused".into()))
        }
    }

    let err = login(&Offline, &Credentials::new("alice", "pw"), &hmac_config())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TokenError::Authentication(AuthenticationError::Directory(_))
    ));
}

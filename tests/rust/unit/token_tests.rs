use chrono::Utc;

use smart_kuku::auth::{AuthError, TokenKind, TokenService};
use smart_kuku::config::ServerConfig;
use smart_kuku::models::accounts::{Role, User};

fn expert() -> User {
    let mut user = User::new("amani", "amani@example.com", Utc::now());
    user.id = 12;
    user.role = Role::Expert;
    user
}

#[test]
fn claims_carry_the_account() {
    let tokens = TokenService::from_config(&ServerConfig::default());
    let pair = tokens.issue_pair(&expert()).unwrap();
    let claims = tokens.verify(&pair.refresh, TokenKind::Refresh).unwrap();
    assert_eq!(claims.user_id, 12);
    assert_eq!(claims.username, "amani");
    assert_eq!(claims.role, Role::Expert);
    assert!(claims.exp > claims.iat);
}

#[test]
fn other_secret_is_rejected() {
    let issuer = TokenService::new("first-secret-0123456789", 3600, 86400);
    let verifier = TokenService::new("second-secret-0123456789", 3600, 86400);
    let token = issuer.issue_access(&expert()).unwrap();
    assert!(matches!(
        verifier.verify(&token, TokenKind::Access),
        Err(AuthError::InvalidToken(_))
    ));
}

#[test]
fn every_token_is_unique() {
    let tokens = TokenService::from_config(&ServerConfig::default());
    let first = tokens.issue_access(&expert()).unwrap();
    let second = tokens.issue_access(&expert()).unwrap();
    assert_ne!(first, second);
}

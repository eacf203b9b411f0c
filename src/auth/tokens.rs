//! HS256 access and refresh tokens.
//!
//! Both kinds share the claim set and differ in `token_type` and lifetime.
//! An access token is rejected where a refresh token is expected and the
//! other way round.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::config::ServerConfig;
use crate::models::accounts::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenKind,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.access_token_ttl_secs,
            config.refresh_token_ttl_secs,
        )
    }

    fn issue(&self, user: &User, kind: TokenKind) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            token_type: kind,
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            iat: now,
            exp: now + ttl,
            jti: uuid::Uuid::new_v4().simple().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn issue_access(&self, user: &User) -> Result<String, AuthError> {
        self.issue(user, TokenKind::Access)
    }

    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(user, TokenKind::Access)?,
            refresh: self.issue(user, TokenKind::Refresh)?,
        })
    }

    /// Verify signature, expiry and kind.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if claims.token_type != kind {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SECRET: &str = "unit-test-secret-0123456789";

    fn user() -> User {
        let mut user = User::new("wanjiku", "wanjiku@example.com", Utc::now());
        user.id = 7;
        user
    }

    #[test]
    fn issue_and_verify_pair() {
        let svc = TokenService::new(SECRET, 3600, 86400);
        let pair = svc.issue_pair(&user()).unwrap();
        let claims = svc.verify(&pair.access, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "wanjiku");
        assert_eq!(claims.role, Role::Farmer);
        assert!(claims.exp > claims.iat);

        let refresh = svc.verify(&pair.refresh, TokenKind::Refresh).unwrap();
        assert_ne!(refresh.jti, claims.jti);
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let svc = TokenService::new(SECRET, 3600, 86400);
        let pair = svc.issue_pair(&user()).unwrap();
        assert_eq!(
            svc.verify(&pair.refresh, TokenKind::Access).unwrap_err(),
            AuthError::WrongTokenType
        );
        assert_eq!(
            svc.verify(&pair.access, TokenKind::Refresh).unwrap_err(),
            AuthError::WrongTokenType
        );
    }

    #[test]
    fn wrong_secret_rejected() {
        let issuer = TokenService::new(SECRET, 3600, 86400);
        let verifier = TokenService::new("another-secret-9876543210", 3600, 86400);
        let token = issuer.issue_access(&user()).unwrap();
        assert!(matches!(
            verifier.verify(&token, TokenKind::Access),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_rejected() {
        // Expired two minutes ago, past the default leeway
        let svc = TokenService::new(SECRET, -120, -120);
        let token = svc.issue_access(&user()).unwrap();
        assert!(svc.verify(&token, TokenKind::Access).is_err());
    }
}

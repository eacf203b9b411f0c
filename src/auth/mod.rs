//! Password hashing and signed access/refresh tokens.

mod password;
mod tokens;

pub use password::{hash_password, verify_password};
pub use tokens::{Claims, TokenKind, TokenPair, TokenService};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    #[error("User account is disabled.")]
    InactiveUser,

    #[error("Token is invalid or expired")]
    InvalidToken(String),

    #[error("Token has wrong type")]
    WrongTokenType,

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

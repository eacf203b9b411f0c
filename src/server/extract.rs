//! Request extractors: the authenticated caller and JSON bodies with API-shaped rejections.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;

use super::errors::{ApiError, NOT_AUTHENTICATED};
use super::AppState;
use crate::auth::TokenKind;
use crate::models::accounts::{Farmer, User};

/// The user behind the bearer access token, with their farmer profile if any.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub farmer: Option<Farmer>,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    pub fn farmer_id(&self) -> Option<i64> {
        self.farmer.as_ref().map(|f| f.id)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    /// The caller's farmer profile, or 403 for accounts without one.
    pub fn require_farmer(&self) -> Result<&Farmer, ApiError> {
        self.farmer
            .as_ref()
            .ok_or_else(|| ApiError::Forbidden("User is not a farmer".to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized(NOT_AUTHENTICATED.to_string()))?;
        let claims = state.tokens.verify(token, TokenKind::Access)?;

        let caller = state
            .store
            .read(|t| {
                let user = t.users.get(claims.user_id).filter(|u| u.is_active)?.clone();
                let farmer = t.farmer_for_user(user.id).cloned();
                Some(Caller { user, farmer })
            })
            .await;
        caller.ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))
    }
}

/// `Json<T>` whose rejection is a 400 with a `detail` message.
#[derive(Debug)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::models::validation::{FieldErrors, NON_FIELD_ERRORS};
use crate::setup::SetupError;
use crate::store::StoreError;
use crate::subscriptions::SubscriptionError;

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Every failure a handler can return, rendered as a JSON body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Not found.")]
    NotFound,

    #[error("Method \"{0}\" not allowed.")]
    MethodNotAllowed(&'static str),

    #[error(transparent)]
    Subscription(SubscriptionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn forbidden() -> Self {
        ApiError::Forbidden(PERMISSION_DENIED.to_string())
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(FieldErrors::single(field, message))
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        ApiError::field(NON_FIELD_ERRORS, message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Subscription(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_REQUEST)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::Subscription(e) => json!({ "detail": e.to_string(), "code": e.code() }),
            ApiError::Internal(message) => {
                log::error!("Internal server error: {}", message);
                json!({ "detail": "Internal server error" })
            }
            other => json!({ "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => ApiError::NotFound,
            StoreError::Protected { .. } => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(e: SubscriptionError) -> Self {
        match e {
            SubscriptionError::Store(store) => store.into(),
            other => ApiError::Subscription(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials | AuthError::InactiveUser => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::InvalidToken(reason) => {
                log::debug!("Rejected token: {}", reason);
                ApiError::Unauthorized("Token is invalid or expired".to_string())
            }
            AuthError::WrongTokenType => {
                ApiError::Unauthorized("Given token not valid for any token type".to_string())
            }
            AuthError::Signing(_) | AuthError::Hash(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<SetupError> for ApiError {
    fn from(e: SetupError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(SubscriptionError::PaymentRequired).status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ApiError::from(SubscriptionError::UpgradeRequired("x".into())).status().as_u16(),
            426
        );
        assert_eq!(
            ApiError::from(StoreError::NotFound { kind: "farm", id: 1 }).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AuthError::WrongTokenType).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}

use thiserror::Error;

use crate::store::StoreError;

/// Failures of subscription business rules.
///
/// Each variant carries the machine-readable `code` returned to clients next
/// to the message, and the HTTP status it maps to.
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("{0}")]
    Rule(String),

    #[error("{0}")]
    LimitExceeded(String),

    #[error("This subscription is not active")]
    Inactive,

    #[error("{0}")]
    ResourceNotAvailable(String),

    #[error("Payment is required to access this resource")]
    PaymentRequired,

    #[error("{0}")]
    UpgradeRequired(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SubscriptionError {
    pub fn rule(message: impl Into<String>) -> Self {
        SubscriptionError::Rule(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            SubscriptionError::Rule(_) => "subscription_error",
            SubscriptionError::LimitExceeded(_) => "subscription_limit_exceeded",
            SubscriptionError::Inactive => "subscription_inactive",
            SubscriptionError::ResourceNotAvailable(_) => "resource_not_available",
            SubscriptionError::PaymentRequired => "payment_required",
            SubscriptionError::UpgradeRequired(_) => "upgrade_required",
            SubscriptionError::Store(StoreError::NotFound { .. }) => "not_found",
            SubscriptionError::Store(_) => "error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            SubscriptionError::PaymentRequired => 402,
            SubscriptionError::UpgradeRequired(_) => 426,
            SubscriptionError::Store(StoreError::NotFound { .. }) => 404,
            SubscriptionError::Store(StoreError::Protected { .. }) => 400,
            SubscriptionError::Store(_) => 500,
            _ => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses() {
        let cases = [
            (SubscriptionError::rule("x"), "subscription_error", 400),
            (SubscriptionError::LimitExceeded("x".into()), "subscription_limit_exceeded", 400),
            (SubscriptionError::Inactive, "subscription_inactive", 400),
            (SubscriptionError::PaymentRequired, "payment_required", 402),
            (SubscriptionError::UpgradeRequired("x".into()), "upgrade_required", 426),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status_code(), status);
        }
    }
}

//! Subscription business rules on top of the store.

mod errors;
pub mod service;

pub use errors::SubscriptionError;
pub use service::{
    active_subscription_for, allocate_resource, available_resources, can_add_resource,
    cancel_subscription, check_subscription_status, create_subscription, release_allocation,
    sort_resources, upgrade_subscription, utilization, NewSubscription, StatusReport, Usage,
    Utilization,
};

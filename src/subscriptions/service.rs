//! Subscription lifecycle: creation, resource allocation within plan limits,
//! tier upgrades, cancellation and the periodic status sweep.
//!
//! Every function works on [`Tables`] so that callers run it inside a single
//! [`Store::write`](crate::store::Store::write) and the whole operation is
//! committed or discarded as one.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use super::errors::SubscriptionError;
use crate::models::money::Money;
use crate::models::subscriptions::{
    Allocation, FarmerSubscription, Payment, PaymentStatus, Resource, SubscriptionStatus,
    SubscriptionType, Tier,
};
use crate::store::{StoreError, Tables};

/// Length of one billing period.
pub const PERIOD_DAYS: u64 = 30;
/// Auto-renewing subscriptions are renewed this many days before they end.
pub const RENEWAL_WINDOW_DAYS: u64 = 3;
/// Pending subscriptions are suspended once a payment is this many days overdue.
pub const PAYMENT_GRACE_DAYS: u64 = 7;
pub const MAX_DURATION_MONTHS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub used: u32,
    pub limit: u32,
    pub available: u32,
}

impl Usage {
    fn new(used: u32, limit: u32) -> Self {
        Self {
            used,
            limit,
            available: limit.saturating_sub(used),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Utilization {
    pub hardware: Usage,
    pub software: Usage,
}

fn plan<'a>(t: &'a Tables, sub: &FarmerSubscription) -> Option<&'a SubscriptionType> {
    sub.subscription_type.and_then(|id| t.subscription_types.get(id))
}

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

fn sub_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Active allocations counted per class against the plan limits.
pub fn utilization(t: &Tables, sub: &FarmerSubscription) -> Utilization {
    let (mut hardware, mut software) = (0u32, 0u32);
    for allocation in t.allocations.iter() {
        if allocation.subscription != sub.id || !allocation.status {
            continue;
        }
        match t.resources.get(allocation.resource) {
            Some(r) if r.resource_type.is_hardware() => hardware += 1,
            Some(_) => software += 1,
            None => {}
        }
    }
    let (hw_limit, sw_limit) = plan(t, sub)
        .map(|p| (p.max_hardware_nodes, p.max_software_services))
        .unwrap_or((0, 0));
    Utilization {
        hardware: Usage::new(hardware, hw_limit),
        software: Usage::new(software, sw_limit),
    }
}

/// Basic resources always fit; others need a free slot of their class.
pub fn can_add_resource(t: &Tables, sub: &FarmerSubscription, resource: &Resource) -> bool {
    if resource.is_basic {
        return true;
    }
    let usage = utilization(t, sub);
    if resource.resource_type.is_hardware() {
        usage.hardware.available > 0
    } else {
        usage.software.available > 0
    }
}

/// Basic resources plus those actively allocated to `sub`, ordered by type then name.
pub fn available_resources<'a>(t: &'a Tables, sub: &FarmerSubscription) -> Vec<&'a Resource> {
    let mut resources: Vec<&Resource> = t
        .resources
        .iter()
        .filter(|r| {
            r.is_basic
                || t.allocations
                    .any(|a| a.subscription == sub.id && a.resource == r.id && a.status)
        })
        .collect();
    sort_resources(&mut resources);
    resources
}

pub fn sort_resources(resources: &mut [&Resource]) {
    resources.sort_by(|a, b| {
        a.resource_type
            .cmp(&b.resource_type)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// The farmer's current subscription, latest start date first.
pub fn active_subscription_for(
    t: &Tables,
    farmer_id: i64,
    today: NaiveDate,
) -> Option<&FarmerSubscription> {
    t.subscriptions
        .iter()
        .filter(|s| s.farmer == Some(farmer_id) && s.is_active_on(today))
        .max_by_key(|s| (s.start_date, s.id))
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub farmer: i64,
    pub subscription_type: i64,
    pub duration_months: u32,
    pub auto_renew: bool,
}

/// Start a subscription, replacing whatever the farmer currently has.
///
/// Existing ACTIVE subscriptions of the farmer are cancelled, the new one runs
/// `30 * duration_months` days from today and receives every basic resource.
pub fn create_subscription(
    t: &mut Tables,
    request: NewSubscription,
    now: DateTime<Utc>,
) -> Result<FarmerSubscription, SubscriptionError> {
    if !(1..=MAX_DURATION_MONTHS).contains(&request.duration_months) {
        return Err(SubscriptionError::rule(format!(
            "Duration must be between 1 and {} months",
            MAX_DURATION_MONTHS
        )));
    }
    t.farmers.require(request.farmer)?;
    let plan_name = t
        .subscription_types
        .get(request.subscription_type)
        .map(|p| p.name.clone())
        .ok_or_else(|| SubscriptionError::rule("Invalid subscription type"))?;

    for existing in t.subscriptions.iter_mut() {
        if existing.farmer == Some(request.farmer) && existing.status == SubscriptionStatus::Active {
            existing.status = SubscriptionStatus::Cancelled;
            existing.updated_at = now;
        }
    }

    let today = now.date_naive();
    let subscription = t.insert(FarmerSubscription {
        id: 0,
        farmer: Some(request.farmer),
        subscription_type: Some(request.subscription_type),
        start_date: today,
        end_date: Some(add_days(
            today,
            PERIOD_DAYS * u64::from(request.duration_months),
        )),
        status: SubscriptionStatus::Active,
        auto_renew: request.auto_renew,
        notes: String::new(),
        created_at: now,
        updated_at: now,
    });

    let basics: Vec<i64> = t
        .resources
        .iter()
        .filter(|r| r.is_basic)
        .map(|r| r.id)
        .collect();
    for resource in basics {
        insert_allocation(t, subscription.id, resource, 1, now);
    }

    log::info!(
        "Farmer {} subscribed to {} (subscription {}, until {:?})",
        request.farmer,
        plan_name,
        subscription.id,
        subscription.end_date
    );
    Ok(subscription)
}

fn insert_allocation(
    t: &mut Tables,
    subscription: i64,
    resource: i64,
    quantity: u32,
    now: DateTime<Utc>,
) -> Allocation {
    t.insert(Allocation {
        id: 0,
        subscription,
        resource,
        quantity,
        status: true,
        allocated_at: now,
        updated_at: now,
    })
}

fn ensure_usable(sub: &FarmerSubscription, today: NaiveDate) -> Result<(), SubscriptionError> {
    match sub.status {
        SubscriptionStatus::Pending | SubscriptionStatus::Suspended => {
            Err(SubscriptionError::PaymentRequired)
        }
        _ if !sub.is_active_on(today) => Err(SubscriptionError::Inactive),
        _ => Ok(()),
    }
}

/// Allocate `resource_id` to a subscription, enforcing plan limits.
pub fn allocate_resource(
    t: &mut Tables,
    subscription_id: i64,
    resource_id: i64,
    quantity: u32,
    now: DateTime<Utc>,
) -> Result<Allocation, SubscriptionError> {
    let sub = t.subscriptions.require(subscription_id)?.clone();
    ensure_usable(&sub, now.date_naive())?;

    let resource = t
        .resources
        .get(resource_id)
        .cloned()
        .ok_or_else(|| {
            SubscriptionError::ResourceNotAvailable("The requested resource is not available".into())
        })?;
    if !resource.status {
        return Err(SubscriptionError::ResourceNotAvailable(format!(
            "{} is currently unavailable",
            resource.name
        )));
    }
    if quantity == 0 {
        return Err(SubscriptionError::rule("Quantity must be at least 1"));
    }
    if t
        .allocations
        .any(|a| a.subscription == sub.id && a.resource == resource.id)
    {
        return Err(SubscriptionError::rule(
            "Resource already added to this subscription",
        ));
    }
    if !can_add_resource(t, &sub, &resource) {
        let usage = utilization(t, &sub);
        let limit = if resource.resource_type.is_hardware() {
            usage.hardware.limit
        } else {
            usage.software.limit
        };
        return Err(SubscriptionError::LimitExceeded(format!(
            "Maximum {} {} resources allowed",
            limit,
            resource.resource_type.display().to_lowercase()
        )));
    }

    let allocation = insert_allocation(t, sub.id, resource.id, quantity, now);
    log::info!(
        "Allocated resource {} to subscription {}",
        resource.name,
        sub.id
    );
    Ok(allocation)
}

/// Remove an allocation belonging to `subscription_id`.
pub fn release_allocation(
    t: &mut Tables,
    subscription_id: i64,
    allocation_id: i64,
) -> Result<(), SubscriptionError> {
    match t.allocations.get(allocation_id) {
        Some(a) if a.subscription == subscription_id => {
            t.allocations.remove(allocation_id);
            Ok(())
        }
        _ => Err(StoreError::not_found::<Allocation>(allocation_id).into()),
    }
}

/// Move an ACTIVE subscription to a plan of a strictly higher tier.
///
/// A new subscription is started for one period and the old one is cancelled.
/// Non-basic allocations move over while they fit the new plan. The unused part
/// of the old plan (at least one day) is credited in the new subscription's notes.
pub fn upgrade_subscription(
    t: &mut Tables,
    subscription_id: i64,
    new_type_id: i64,
    now: DateTime<Utc>,
) -> Result<FarmerSubscription, SubscriptionError> {
    let old = t.subscriptions.require(subscription_id)?.clone();
    let new_plan = t
        .subscription_types
        .get(new_type_id)
        .cloned()
        .ok_or_else(|| SubscriptionError::rule("Invalid subscription type"))?;

    let current_plan = plan(t, &old).cloned();
    let current_tier = current_plan.as_ref().map(|p| p.tier).unwrap_or(Tier::Individual);
    if new_plan.tier <= current_tier {
        return Err(SubscriptionError::rule(
            "New subscription type must be of a higher tier",
        ));
    }
    if old.status != SubscriptionStatus::Active {
        return Err(SubscriptionError::Inactive);
    }

    let today = now.date_naive();
    let remaining_days = old
        .end_date
        .map(|end| (end - today).num_days())
        .unwrap_or(0)
        .max(1);
    let old_cost = current_plan.as_ref().map(|p| p.cost).unwrap_or(Money::ZERO);
    let credit = old_cost.prorate(remaining_days, PERIOD_DAYS as i64);

    let mut upgraded = t.insert(FarmerSubscription {
        id: 0,
        farmer: old.farmer,
        subscription_type: Some(new_plan.id),
        start_date: today,
        end_date: Some(add_days(today, PERIOD_DAYS)),
        status: SubscriptionStatus::Active,
        auto_renew: true,
        notes: String::new(),
        created_at: now,
        updated_at: now,
    });

    let carried: Vec<(i64, u32)> = t
        .allocations
        .iter()
        .filter(|a| a.subscription == old.id && a.status)
        .map(|a| (a.resource, a.quantity))
        .collect();
    let mut skipped = Vec::new();
    for (resource_id, quantity) in carried {
        let Some(resource) = t.resources.get(resource_id).cloned() else {
            continue;
        };
        if resource.is_basic {
            continue;
        }
        if can_add_resource(t, &upgraded, &resource) {
            insert_allocation(t, upgraded.id, resource_id, quantity, now);
        } else {
            skipped.push(resource.name);
        }
    }

    upgraded.notes = format!(
        "Upgraded from {} with prorated credit of {} for {} remaining day(s)",
        current_plan.as_ref().map(|p| p.name.as_str()).unwrap_or("no plan"),
        credit,
        remaining_days
    );
    if !skipped.is_empty() {
        upgraded.notes.push_str(&format!(
            ". Not carried over: {}",
            skipped.join(", ")
        ));
    }
    let upgraded = t.subscriptions.replace(upgraded.id, upgraded)?;

    let previous = t.subscriptions.require_mut(old.id)?;
    previous.status = SubscriptionStatus::Cancelled;
    previous.notes = format!("Upgraded to {}", new_plan.name);
    previous.updated_at = now;

    log::info!(
        "Subscription {} upgraded to {} as subscription {} (credit {})",
        old.id,
        new_plan.name,
        upgraded.id,
        credit
    );
    Ok(upgraded)
}

/// Stop auto-renewal; the subscription keeps running until its end date.
pub fn cancel_subscription(
    t: &mut Tables,
    subscription_id: i64,
    now: DateTime<Utc>,
) -> Result<FarmerSubscription, SubscriptionError> {
    let sub = t.subscriptions.require_mut(subscription_id)?;
    if sub.status != SubscriptionStatus::Active {
        return Err(SubscriptionError::rule(
            "Only active subscriptions can be cancelled",
        ));
    }
    sub.auto_renew = false;
    sub.updated_at = now;
    log::info!("Subscription {} will not renew", subscription_id);
    Ok(sub.clone())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub expired: usize,
    pub suspended: usize,
    pub renewed: usize,
}

/// Periodic sweep: expire finished subscriptions, suspend ones with overdue
/// payments and renew auto-renewing ones that are about to end.
pub fn check_subscription_status(t: &mut Tables, now: DateTime<Utc>) -> StatusReport {
    let today = now.date_naive();
    let mut report = StatusReport::default();

    for sub in t.subscriptions.iter_mut() {
        if sub.status == SubscriptionStatus::Active && sub.end_date.is_some_and(|end| end < today) {
            sub.status = SubscriptionStatus::Expired;
            sub.updated_at = now;
            report.expired += 1;
        }
    }

    let overdue_before = sub_days(today, PAYMENT_GRACE_DAYS);
    let overdue: Vec<i64> = t
        .subscriptions
        .iter()
        .filter(|s| s.status == SubscriptionStatus::Pending)
        .filter(|s| {
            t.payments.any(|p| {
                p.subscription == Some(s.id)
                    && p.status == PaymentStatus::Pending
                    && p.due_date.is_some_and(|due| due < overdue_before)
            })
        })
        .map(|s| s.id)
        .collect();
    for id in overdue {
        if let Some(sub) = t.subscriptions.get_mut(id) {
            sub.status = SubscriptionStatus::Suspended;
            sub.updated_at = now;
            report.suspended += 1;
        }
    }

    let renew_until = add_days(today, RENEWAL_WINDOW_DAYS);
    let due: Vec<(i64, NaiveDate, Money)> = t
        .subscriptions
        .iter()
        .filter(|s| s.status == SubscriptionStatus::Active && s.auto_renew)
        .filter_map(|s| {
            let end = s.end_date?;
            (end >= today && end <= renew_until)
                .then(|| (s.id, end, plan(t, s).map(|p| p.cost).unwrap_or(Money::ZERO)))
        })
        .collect();
    for (id, end, cost) in due {
        t.insert(Payment {
            id: 0,
            subscription: Some(id),
            amount: cost,
            payment_date: now,
            due_date: Some(end),
            status: PaymentStatus::Completed,
            transaction_id: None,
            receipt: None,
            notes: "Automatic renewal".to_string(),
            created_at: now,
            updated_at: now,
        });
        if let Some(sub) = t.subscriptions.get_mut(id) {
            sub.end_date = Some(add_days(end, PERIOD_DAYS));
            sub.updated_at = now;
            report.renewed += 1;
        }
    }

    if report != StatusReport::default() {
        log::info!(
            "Subscription check: {} expired, {} suspended, {} renewed",
            report.expired,
            report.suspended,
            report.renewed
        );
    }
    report
}

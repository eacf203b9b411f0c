//! Plans, resources, farmer subscriptions with their allocations, payments and
//! the caller's subscription status.
//!
//! Lifecycle rules live in [`crate::subscriptions`]; the handlers here resolve
//! who may touch which subscription and shape the responses.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::accounts::render_farmer;
use super::{extend, is_other, row_id};
use crate::models::subscriptions::{
    Allocation, FarmerSubscription, Payment, PaymentInput, Resource, ResourceInput,
    SubscriptionStatus, SubscriptionType, SubscriptionTypeInput,
};
use crate::models::validation::{exists, not_blank, unique, FieldErrors};
use crate::server::crud::{Crud, Ctx, Params};
use crate::server::errors::ApiError;
use crate::server::extract::{Caller, Payload};
use crate::server::AppState;
use crate::store::Tables;
use crate::subscriptions::{self as service, sort_resources, NewSubscription};

fn render_plan(plan: &SubscriptionType, t: &Tables) -> Value {
    let active: Vec<&FarmerSubscription> = t
        .subscriptions
        .iter()
        .filter(|s| s.subscription_type == Some(plan.id) && s.status == SubscriptionStatus::Active)
        .collect();
    let total_revenue = plan.cost * active.len() as u32;
    let average_usage = if active.is_empty() {
        0.0
    } else {
        let total: f64 = active
            .iter()
            .map(|s| {
                let usage = service::utilization(t, s);
                let limit = usage.hardware.limit + usage.software.limit;
                if limit == 0 {
                    0.0
                } else {
                    f64::from(usage.hardware.used + usage.software.used) * 100.0 / f64::from(limit)
                }
            })
            .sum();
        (total / active.len() as f64 * 10.0).round() / 10.0
    };
    extend(
        serde_json::to_value(plan).unwrap_or(Value::Null),
        json!({
            "id": plan.id,
            "tier_display": plan.tier.display(),
            "active_subscriptions_count": active.len(),
            "total_revenue": total_revenue.as_f64(),
            "average_usage": average_usage,
        }),
    )
}

fn render_resource(resource: &Resource, t: &Tables) -> Value {
    let subscriptions_using = t.allocations.count(|a| {
        a.resource == resource.id
            && t
                .subscriptions
                .get(a.subscription)
                .is_some_and(|s| s.status == SubscriptionStatus::Active)
    });
    let total_allocations: u32 = t
        .allocations
        .iter()
        .filter(|a| a.resource == resource.id)
        .map(|a| a.quantity)
        .sum();
    extend(
        serde_json::to_value(resource).unwrap_or(Value::Null),
        json!({
            "id": resource.id,
            "resource_type_display": resource.resource_type.display(),
            "category_display": resource.category.display(),
            "status_display": resource.status_label(),
            "subscriptions_using_count": subscriptions_using,
            "total_allocations": total_allocations,
        }),
    )
}

fn render_allocation(allocation: &Allocation, t: &Tables) -> Value {
    json!({
        "id": allocation.id,
        "farmerSubscriptionResourceID": allocation.id,
        "resourceID": allocation.resource,
        "resource_details": t.resources.get(allocation.resource).map(|r| render_resource(r, t)),
        "quantity": allocation.quantity,
        "status": allocation.status,
        "allocated_at": allocation.allocated_at,
    })
}

fn render_subscription(sub: &FarmerSubscription, t: &Tables, today: NaiveDate) -> Value {
    json!({
        "id": sub.id,
        "farmerSubscriptionID": sub.id,
        "farmer": sub.farmer.and_then(|id| t.farmers.get(id)).map(|f| render_farmer(f, t, today)),
        "subscription_type": sub
            .subscription_type
            .and_then(|id| t.subscription_types.get(id))
            .map(|p| render_plan(p, t)),
        "start_date": sub.start_date,
        "end_date": sub.end_date,
        "status": sub.status,
        "status_display": sub.status.display(),
        "auto_renew": sub.auto_renew,
        "created_at": sub.created_at,
    })
}

fn render_subscription_detail(sub: &FarmerSubscription, t: &Tables, today: NaiveDate) -> Value {
    let resources: Vec<Value> = service::available_resources(t, sub)
        .into_iter()
        .map(|r| render_resource(r, t))
        .collect();
    extend(
        render_subscription(sub, t, today),
        json!({
            "notes": sub.notes,
            "resources": resources,
            "utilization": service::utilization(t, sub),
            "updated_at": sub.updated_at,
        }),
    )
}

/// Administrators see every subscription, farmers their own, everyone else none.
fn owns(caller: &Caller, sub: &FarmerSubscription) -> bool {
    caller.is_admin() || (caller.farmer_id().is_some() && sub.farmer == caller.farmer_id())
}

fn visible_subscription<'a>(
    t: &'a Tables,
    caller: &Caller,
    id: i64,
) -> Result<&'a FarmerSubscription, ApiError> {
    t.subscriptions
        .get(id)
        .filter(|s| owns(caller, s))
        .ok_or(ApiError::NotFound)
}

impl Crud for SubscriptionType {
    type Input = SubscriptionTypeInput;
    const ADMIN_WRITE: bool = true;

    fn to_input(&self) -> SubscriptionTypeInput {
        SubscriptionType::to_input(self)
    }

    fn build(input: SubscriptionTypeInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        not_blank(&mut errors, "name", &input.name);
        unique(
            &mut errors,
            "name",
            ctx.tables
                .subscription_types
                .any(|p| p.name == input.name && is_other(p, current)),
            "subscription type",
        );
        errors.into_result()?;
        Ok(SubscriptionType {
            id: row_id(current),
            name: input.name,
            tier: input.tier,
            farm_size: input.farm_size,
            cost: input.cost,
            max_hardware_nodes: input.max_hardware_nodes,
            max_software_services: input.max_software_services,
            includes_predictions: input.includes_predictions,
            includes_analytics: input.includes_analytics,
            description: input.description,
        })
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by_key(|p| (p.tier, p.id));
    }

    fn render(&self, ctx: &Ctx) -> Value {
        render_plan(self, ctx.tables)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Compare an enum against a query value using its wire name.
fn same_choice<T: serde::Serialize>(choice: T, wanted: &str) -> bool {
    serde_json::to_value(choice)
        .ok()
        .and_then(|v| v.as_str().map(|s| s.eq_ignore_ascii_case(wanted)))
        .unwrap_or(false)
}

impl Crud for Resource {
    type Input = ResourceInput;
    const ADMIN_WRITE: bool = true;

    fn to_input(&self) -> ResourceInput {
        Resource::to_input(self)
    }

    fn build(input: ResourceInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        not_blank(&mut errors, "name", &input.name);
        unique(
            &mut errors,
            "name",
            ctx.tables
                .resources
                .any(|r| r.name == input.name && is_other(r, current)),
            "resource",
        );
        errors.into_result()?;
        Ok(Resource {
            id: row_id(current),
            name: input.name,
            resource_type: input.resource_type,
            category: input.category,
            unit_cost: input.unit_cost,
            status: input.status,
            is_basic: input.is_basic,
            description: input.description,
            created_at: current.map_or(ctx.now, |c| c.created_at),
            updated_at: ctx.now,
        })
    }

    fn visible(&self, ctx: &Ctx) -> bool {
        self.status || ctx.caller.is_admin()
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        if let Some(wanted) = params.get("resource_type") {
            if !same_choice(self.resource_type, wanted) {
                return false;
            }
        }
        if let Some(wanted) = params.get("category") {
            if !same_choice(self.category, wanted) {
                return false;
            }
        }
        if let Some(wanted) = params.get("is_basic") {
            if parse_flag(wanted) != Some(self.is_basic) {
                return false;
            }
        }
        match params.get("search").map(|s| s.trim().to_lowercase()) {
            Some(term) if !term.is_empty() => {
                self.name.to_lowercase().contains(&term)
                    || self.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }

    fn sort(rows: &mut Vec<&Self>) {
        sort_resources(rows);
    }

    fn render(&self, ctx: &Ctx) -> Value {
        render_resource(self, ctx.tables)
    }
}

/// Resources the calling farmer can use right now.
pub async fn my_resources(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<Value>>, ApiError> {
    let farmer = caller.require_farmer()?.id;
    let today = Utc::now().date_naive();
    let resources = state
        .store
        .read(|t| {
            let resources = match service::active_subscription_for(t, farmer, today) {
                Some(sub) => service::available_resources(t, sub),
                None => {
                    let mut basic: Vec<&Resource> =
                        t.resources.iter().filter(|r| r.is_basic && r.status).collect();
                    sort_resources(&mut basic);
                    basic
                }
            };
            resources.into_iter().map(|r| render_resource(r, t)).collect()
        })
        .await;
    Ok(Json(resources))
}

pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Json<Vec<Value>> {
    let today = Utc::now().date_naive();
    let rows = state
        .store
        .read(|t| {
            t.subscriptions
                .iter()
                .filter(|s| owns(&caller, s))
                .map(|s| render_subscription(s, t, today))
                .collect()
        })
        .await;
    Json(rows)
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    #[serde(default)]
    pub subscription_type_id: Option<i64>,
    #[serde(default)]
    pub farmer_id: Option<i64>,
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 12, message = "Duration must be between 1 and 12 months"))]
    pub duration_months: u32,
    #[serde(default = "yes")]
    pub auto_renew: bool,
}

pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Payload(request): Payload<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    request.validate()?;
    let subscription_type = request
        .subscription_type_id
        .ok_or_else(|| ApiError::field("subscription_type_id", "This field is required."))?;

    let now = Utc::now();
    let detail = state
        .store
        .write(|t| -> Result<Value, ApiError> {
            let farmer = match (request.farmer_id, caller.farmer_id()) {
                (Some(id), _) => {
                    let mut errors = FieldErrors::new();
                    exists(&mut errors, "farmer_id", id, t.farmers.contains(id));
                    errors.into_result()?;
                    id
                }
                (None, Some(own)) => own,
                (None, None) => {
                    return Err(ApiError::non_field(
                        "User is not a farmer and no farmer specified",
                    ))
                }
            };
            if Some(farmer) != caller.farmer_id() && !caller.is_admin() {
                return Err(ApiError::non_field(
                    "Only admins can create subscriptions for other farmers",
                ));
            }
            let sub = service::create_subscription(
                t,
                NewSubscription {
                    farmer,
                    subscription_type,
                    duration_months: request.duration_months,
                    auto_renew: request.auto_renew,
                },
                now,
            )?;
            Ok(render_subscription_detail(&sub, t, now.date_naive()))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let today = Utc::now().date_naive();
    state
        .store
        .read(|t| {
            visible_subscription(t, &caller, id).map(|s| Json(render_subscription_detail(s, t, today)))
        })
        .await
}

pub async fn subscription_utilization(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<service::Utilization>, ApiError> {
    state
        .store
        .read(|t| visible_subscription(t, &caller, id).map(|s| Json(service::utilization(t, s))))
        .await
}

#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    #[serde(default)]
    pub new_subscription_type_id: Option<i64>,
}

pub async fn upgrade_subscription(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Payload(request): Payload<UpgradeRequest>,
) -> Result<Json<Value>, ApiError> {
    let new_type = request
        .new_subscription_type_id
        .ok_or_else(|| ApiError::field("new_subscription_type_id", "This field is required."))?;
    let now = Utc::now();
    let detail = state
        .store
        .write(|t| {
            visible_subscription(t, &caller, id)?;
            let upgraded = service::upgrade_subscription(t, id, new_type, now)?;
            Ok::<_, ApiError>(render_subscription_detail(&upgraded, t, now.date_naive()))
        })
        .await?;
    Ok(Json(detail))
}

pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    state
        .store
        .write(|t| {
            visible_subscription(t, &caller, id)?;
            service::cancel_subscription(t, id, now)?;
            Ok::<_, ApiError>(())
        })
        .await?;
    Ok(Json(json!({
        "detail": "Subscription will be cancelled at the end of the billing period"
    })))
}

/// The subscription behind a nested allocation route; 403 for non-owners.
fn owned_subscription<'a>(
    t: &'a Tables,
    caller: &Caller,
    id: i64,
) -> Result<&'a FarmerSubscription, ApiError> {
    let sub = t.subscriptions.get(id).ok_or(ApiError::NotFound)?;
    if owns(caller, sub) {
        Ok(sub)
    } else {
        Err(ApiError::forbidden())
    }
}

pub async fn list_allocations(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Value>>, ApiError> {
    state
        .store
        .read(|t| {
            owned_subscription(t, &caller, id)?;
            Ok(Json(
                t.allocations
                    .iter()
                    .filter(|a| a.subscription == id)
                    .map(|a| render_allocation(a, t))
                    .collect(),
            ))
        })
        .await
}

#[derive(Debug, Deserialize)]
pub struct AllocationRequest {
    #[serde(rename = "resourceID", default)]
    pub resource: Option<i64>,
    #[serde(default = "one")]
    pub quantity: u32,
}

pub async fn add_allocation(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    Payload(request): Payload<AllocationRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let resource = request
        .resource
        .ok_or_else(|| ApiError::field("resourceID", "Resource is required"))?;
    let now = Utc::now();
    let rendered = state
        .store
        .write(|t| {
            owned_subscription(t, &caller, id)?;
            let allocation = service::allocate_resource(t, id, resource, request.quantity, now)?;
            Ok::<_, ApiError>(render_allocation(&allocation, t))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(rendered)))
}

pub async fn remove_allocation(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((id, allocation)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .write(|t| {
            owned_subscription(t, &caller, id)?;
            service::release_allocation(t, id, allocation)?;
            Ok::<_, ApiError>(())
        })
        .await?;
    log::info!("Released allocation {} of subscription {}", allocation, id);
    Ok(StatusCode::NO_CONTENT)
}

impl Crud for Payment {
    type Input = PaymentInput;

    fn to_input(&self) -> PaymentInput {
        Payment::to_input(self)
    }

    fn build(input: PaymentInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        match input.subscription {
            Some(id) => {
                let found = t.subscriptions.get(id).is_some_and(|s| owns(ctx.caller, s));
                exists(&mut errors, "farmerSubscriptionID", id, found);
            }
            None if !ctx.caller.is_admin() => {
                errors.add("farmerSubscriptionID", "This field is required.");
            }
            None => {}
        }
        let transaction_id = input
            .transaction_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(tx) = &transaction_id {
            unique(
                &mut errors,
                "transaction_id",
                t.payments
                    .any(|p| p.transaction_id.as_ref() == Some(tx) && is_other(p, current)),
                "payment",
            );
        }
        if input.amount.is_negative() {
            errors.add("amount", "Ensure this value is greater than or equal to 0.");
        }
        errors.into_result()?;
        Ok(Payment {
            id: row_id(current),
            subscription: input.subscription,
            amount: input.amount,
            payment_date: current.map_or(ctx.now, |c| c.payment_date),
            due_date: input.due_date,
            status: input.status,
            transaction_id,
            receipt: input.receipt,
            notes: input.notes,
            created_at: current.map_or(ctx.now, |c| c.created_at),
            updated_at: ctx.now,
        })
    }

    fn visible(&self, ctx: &Ctx) -> bool {
        ctx.caller.is_admin()
            || self
                .subscription
                .and_then(|id| ctx.tables.subscriptions.get(id))
                .is_some_and(|s| ctx.caller.farmer_id().is_some() && s.farmer == ctx.caller.farmer_id())
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by(|a, b| b.payment_date.cmp(&a.payment_date).then(b.id.cmp(&a.id)));
    }

    fn render(&self, _ctx: &Ctx) -> Value {
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "id": self.id,
                "status_display": self.status.display(),
            }),
        )
    }
}

/// The caller's active subscription with its utilization, or the plans on offer.
pub async fn subscription_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Value>, ApiError> {
    let farmer = caller.require_farmer()?.id;
    let today = Utc::now().date_naive();
    let body = state
        .store
        .read(|t| match service::active_subscription_for(t, farmer, today) {
            Some(sub) => json!({
                "has_active_subscription": true,
                "subscription": render_subscription_detail(sub, t, today),
                "utilization": service::utilization(t, sub),
            }),
            None => {
                let mut plans: Vec<&SubscriptionType> = t.subscription_types.iter().collect();
                plans.sort_by_key(|p| (p.tier, p.id));
                json!({
                    "has_active_subscription": false,
                    "message": "No active subscription found",
                    "available_subscriptions": plans
                        .into_iter()
                        .map(|p| render_plan(p, t))
                        .collect::<Vec<_>>(),
                })
            }
        })
        .await;
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscriptions::{ResourceCategory, ResourceType};

    #[test]
    fn flags_and_choices() {
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
        assert!(same_choice(ResourceType::Hardware, "hardware"));
        assert!(same_choice(ResourceCategory::Thermal, "THERMAL"));
        assert!(!same_choice(ResourceType::Software, "ANALYTICS"));
    }

    #[test]
    fn plan_renders_revenue_from_active_subscriptions() {
        let now = Utc::now();
        let mut t = Tables::default();
        crate::setup::seed::seed_subscriptions(&mut t, now);
        let pro = t.subscription_types.find(|p| p.name == "Pro").unwrap().clone();
        let farmer = t.insert(crate::models::Farmer {
            id: 0,
            user: 1,
            farmer_name: "Neema".into(),
            address: String::new(),
            email: String::new(),
            phone: String::new(),
            created_date: now.date_naive(),
        });
        service::create_subscription(
            &mut t,
            NewSubscription {
                farmer: farmer.id,
                subscription_type: pro.id,
                duration_months: 1,
                auto_renew: true,
            },
            now,
        )
        .unwrap();

        let rendered = render_plan(&pro, &t);
        assert_eq!(rendered["id"], pro.id);
        assert_eq!(rendered["tier_display"], pro.tier.display());
        assert_eq!(rendered["active_subscriptions_count"], 1);
        assert_eq!(rendered["total_revenue"], pro.cost.as_f64());
    }
}

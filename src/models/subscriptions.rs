//! Subscription plans, billable resources, farmer subscriptions, their
//! resource allocations and payments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::money::Money;
use crate::impl_record;

/// Plan tier, ordered from smallest to largest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    #[default]
    Individual,
    Normal,
    Premium,
}

impl Tier {
    pub fn display(self) -> &'static str {
        match self {
            Tier::Individual => "Individual/Small",
            Tier::Normal => "Normal/Medium",
            Tier::Premium => "Premium/Large",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionType {
    #[serde(rename = "subscriptionTypeID")]
    pub id: i64,
    pub name: String,
    pub tier: Tier,
    pub farm_size: String,
    pub cost: Money,
    pub max_hardware_nodes: u32,
    pub max_software_services: u32,
    pub includes_predictions: bool,
    pub includes_analytics: bool,
    pub description: String,
}

impl_record!(SubscriptionType, "subscription type");

fn default_farm_size() -> String {
    "Small".to_string()
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubscriptionTypeInput {
    #[serde(default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub name: String,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default = "default_farm_size")]
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub farm_size: String,
    #[serde(default)]
    pub cost: Money,
    #[serde(default = "one")]
    pub max_hardware_nodes: u32,
    #[serde(default = "one")]
    pub max_software_services: u32,
    #[serde(default)]
    pub includes_predictions: bool,
    #[serde(default)]
    pub includes_analytics: bool,
    #[serde(default)]
    pub description: String,
}

impl SubscriptionType {
    pub fn to_input(&self) -> SubscriptionTypeInput {
        SubscriptionTypeInput {
            name: self.name.clone(),
            tier: self.tier,
            farm_size: self.farm_size.clone(),
            cost: self.cost,
            max_hardware_nodes: self.max_hardware_nodes,
            max_software_services: self.max_software_services,
            includes_predictions: self.includes_predictions,
            includes_analytics: self.includes_analytics,
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    #[default]
    Hardware,
    Software,
    Prediction,
    Analytics,
}

impl ResourceType {
    pub fn display(self) -> &'static str {
        match self {
            ResourceType::Hardware => "Hardware Node",
            ResourceType::Software => "Software Service",
            ResourceType::Prediction => "Prediction Service",
            ResourceType::Analytics => "Analytics Service",
        }
    }

    /// Hardware counts against the node limit; everything else against the
    /// software service limit.
    pub fn is_hardware(self) -> bool {
        self == ResourceType::Hardware
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceCategory {
    Feeding,
    Thermal,
    Watering,
    Weighting,
    Dusting,
    Prediction,
    Analytics,
    #[default]
    Inventory,
}

impl ResourceCategory {
    pub fn display(self) -> &'static str {
        match self {
            ResourceCategory::Feeding => "Feeding Node",
            ResourceCategory::Thermal => "Thermal Node",
            ResourceCategory::Watering => "Watering Node",
            ResourceCategory::Weighting => "Weighting Node",
            ResourceCategory::Dusting => "Dusting Node",
            ResourceCategory::Prediction => "Prediction Service",
            ResourceCategory::Analytics => "Analytics Service",
            ResourceCategory::Inventory => "Inventory Management",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "resourceID")]
    pub id: i64,
    pub name: String,
    pub resource_type: ResourceType,
    pub category: ResourceCategory,
    pub unit_cost: Money,
    /// Offered at all; unavailable resources cannot be allocated
    pub status: bool,
    /// Granted to every subscription without counting against limits
    pub is_basic: bool,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Resource, "resource");

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResourceInput {
    #[serde(default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub name: String,
    #[serde(default)]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub category: ResourceCategory,
    #[serde(default)]
    pub unit_cost: Money,
    #[serde(default = "default_true")]
    pub status: bool,
    #[serde(default)]
    pub is_basic: bool,
    #[serde(default)]
    pub description: String,
}

impl Resource {
    pub fn to_input(&self) -> ResourceInput {
        ResourceInput {
            name: self.name.clone(),
            resource_type: self.resource_type,
            category: self.category,
            unit_cost: self.unit_cost,
            status: self.status,
            is_basic: self.is_basic,
            description: self.description.clone(),
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.status {
            "Available"
        } else {
            "Unavailable"
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionStatus {
    Active,
    #[default]
    Pending,
    Suspended,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn display(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "Active",
            SubscriptionStatus::Pending => "Pending Payment",
            SubscriptionStatus::Suspended => "Suspended",
            SubscriptionStatus::Cancelled => "Cancelled",
            SubscriptionStatus::Expired => "Expired",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmerSubscription {
    #[serde(rename = "farmerSubscriptionID")]
    pub id: i64,
    #[serde(rename = "farmerID")]
    pub farmer: Option<i64>,
    #[serde(rename = "subscription_typeID")]
    pub subscription_type: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: SubscriptionStatus,
    pub auto_renew: bool,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(FarmerSubscription, "subscription");

impl FarmerSubscription {
    /// ACTIVE and not past its end date.
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date.is_none_or(|end| end >= today)
    }
}

/// A resource allocated to a subscription; unique per (subscription, resource).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    #[serde(rename = "farmerSubscriptionResourceID")]
    pub id: i64,
    #[serde(rename = "farmerSubscriptionID")]
    pub subscription: i64,
    #[serde(rename = "resourceID")]
    pub resource: i64,
    pub quantity: u32,
    pub status: bool,
    pub allocated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Allocation, "subscription resource");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn display(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "paymentID")]
    pub id: i64,
    #[serde(rename = "farmerSubscriptionID")]
    pub subscription: Option<i64>,
    pub amount: Money,
    pub payment_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    /// Stored path of an uploaded receipt
    pub receipt: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Payment, "payment");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PaymentInput {
    #[serde(rename = "farmerSubscriptionID", default)]
    pub subscription: Option<i64>,
    #[serde(default)]
    pub amount: Money,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl Payment {
    pub fn to_input(&self) -> PaymentInput {
        PaymentInput {
            subscription: self.subscription,
            amount: self.amount,
            due_date: self.due_date,
            status: self.status,
            transaction_id: self.transaction_id.clone(),
            receipt: self.receipt.clone(),
            notes: self.notes.clone(),
        }
    }
}

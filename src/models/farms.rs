use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::impl_record;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farm {
    #[serde(rename = "farmID")]
    pub id: i64,
    #[serde(rename = "farmName")]
    pub farm_name: String,
    pub location: String,
    /// Free text such as "5 acres"
    #[serde(rename = "farmSize")]
    pub farm_size: String,
}

impl_record!(Farm, "farm");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FarmInput {
    #[serde(rename = "farmName", default)]
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub farm_name: String,
    #[serde(default)]
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub location: String,
    #[serde(rename = "farmSize", default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub farm_size: String,
}

impl Farm {
    pub fn to_input(&self) -> FarmInput {
        FarmInput {
            farm_name: self.farm_name.clone(),
            location: self.location.clone(),
            farm_size: self.farm_size.clone(),
        }
    }
}

static SIZE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.?\d*").unwrap());

/// First number appearing in a free-text farm size ("2.5 ha" -> 2.5).
pub fn size_number(size: &str) -> Option<f64> {
    SIZE_NUMBER
        .find(size)
        .and_then(|m| m.as_str().trim_end_matches('.').parse().ok())
}

/// Summarise the sizes of several farms the way the farmer profile shows them:
/// `"7.5 (from: 5 acres, 2.5 acres)"` when numbers can be read, otherwise the
/// joined texts, `"0"` when there are no farms.
pub fn summarize_sizes<'a>(sizes: impl IntoIterator<Item = &'a str>) -> String {
    let parts: Vec<&str> = sizes
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        return "0".to_string();
    }
    let total: f64 = parts.iter().filter_map(|s| size_number(s)).sum();
    if total > 0.0 {
        format!("{} (from: {})", total, parts.join(", "))
    } else {
        parts.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipRole {
    Owner,
    Manager,
    Worker,
}

impl MembershipRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MembershipRole::Owner => "OWNER",
            MembershipRole::Manager => "MANAGER",
            MembershipRole::Worker => "WORKER",
        }
    }
}

/// Links a farmer to a farm with a per-farm role; unique per (farmer, farm).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmMembership {
    pub id: i64,
    pub farmer: i64,
    pub farm: i64,
    pub role: MembershipRole,
    pub joined_at: DateTime<Utc>,
}

impl_record!(FarmMembership, "farm membership");

pub const DEFAULT_CELL_NO: &str = "none";
pub const DEFAULT_DEVICE_PICTURE: &str = "device_default.png";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "deviceID")]
    pub id: i64,
    #[serde(rename = "farmID")]
    pub farm: i64,
    /// Hardware identifier, unique across devices
    pub device_id: String,
    pub name: String,
    pub cell_no: String,
    pub picture: String,
    pub status: bool,
}

impl_record!(Device, "device");

fn default_cell_no() -> String {
    DEFAULT_CELL_NO.to_string()
}

fn default_picture() -> String {
    DEFAULT_DEVICE_PICTURE.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeviceInput {
    #[serde(rename = "farmID", default)]
    pub farm: i64,
    #[serde(default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub device_id: String,
    #[serde(default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub name: String,
    #[serde(default = "default_cell_no")]
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub cell_no: String,
    #[serde(default = "default_picture")]
    pub picture: String,
    #[serde(default = "default_true")]
    pub status: bool,
}

impl Device {
    pub fn to_input(&self) -> DeviceInput {
        DeviceInput {
            farm: self.farm,
            device_id: self.device_id.clone(),
            name: self.name.clone(),
            cell_no: self.cell_no.clone(),
            picture: self.picture.clone(),
            status: self.status,
        }
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::impl_record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    #[default]
    Farmer,
    Accountant,
    Expert,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Farmer, Role::Accountant, Role::Expert];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Farmer => "FARMER",
            Role::Accountant => "ACCOUNTANT",
            Role::Expert => "EXPERT",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Farmer => "Farmer",
            Role::Accountant => "Accountant",
            Role::Expert => "Expert",
        }
    }

    pub fn choices() -> String {
        Role::ALL
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("Invalid role. Must be one of: {}", Role::choices()))
    }
}

/// An account able to log in.
///
/// The password hash is part of the snapshot but never of an API response;
/// handlers render users through their own view type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    pub is_active: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    pub profile_image: String,
    pub date_joined: DateTime<Utc>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub password_hash: String,
}

impl_record!(User, "user");

pub const DEFAULT_PROFILE_IMAGE: &str = "default.png";

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::default(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            profile_image: DEFAULT_PROFILE_IMAGE.to_string(),
            date_joined: now,
            last_login: None,
            password_hash: String::new(),
        }
    }

    /// Staff or superuser. The ADMIN role on its own grants nothing.
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn has_usable_password(&self) -> bool {
        !self.password_hash.is_empty()
    }
}

/// Farmer profile, at most one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farmer {
    #[serde(rename = "farmerID")]
    pub id: i64,
    pub user: i64,
    #[serde(rename = "farmerName")]
    pub farmer_name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub created_date: NaiveDate,
}

impl_record!(Farmer, "farmer");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FarmerInput {
    /// Only administrators may attach the profile to another user.
    #[serde(default)]
    pub user: Option<i64>,
    #[serde(rename = "farmerName", default)]
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub farmer_name: String,
    #[serde(default)]
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub address: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub phone: String,
}

impl Farmer {
    pub fn to_input(&self) -> FarmerInput {
        FarmerInput {
            user: Some(self.user),
            farmer_name: self.farmer_name.clone(),
            address: self.address.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

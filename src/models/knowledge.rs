//! Clinical knowledge base: health conditions, recommendations and the
//! exceptions between them, detected anomalies and the medications
//! prescribed for each anomaly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::impl_record;

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientHealth {
    pub id: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(PatientHealth, "patient health condition");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PatientHealthInput {
    #[serde(default)]
    #[validate(length(max = 100, message = "Description is too long (max 100 characters)."))]
    pub description: String,
}

/// Vital sign a recommendation addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecoType {
    Temperature,
    Spo2,
    Heart,
    Respiration,
    Pressure,
    #[default]
    Other,
}

impl RecoType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoType::Temperature => "Temperature",
            RecoType::Spo2 => "Spo2",
            RecoType::Heart => "Heart",
            RecoType::Respiration => "Respiration",
            RecoType::Pressure => "Pressure",
            RecoType::Other => "Other",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            RecoType::Spo2 => "Blood Oxygen",
            RecoType::Heart => "Heart Rate",
            RecoType::Pressure => "Blood Pressure",
            other => other.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CareContext {
    Home,
    Hospital,
    Ambulatory,
    #[default]
    Any,
}

impl CareContext {
    pub fn as_str(self) -> &'static str {
        match self {
            CareContext::Home => "Home",
            CareContext::Hospital => "Hospital",
            CareContext::Ambulatory => "Ambulatory",
            CareContext::Any => "Any",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: i64,
    pub description: String,
    pub reco_type: RecoType,
    pub context: CareContext,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Recommendation, "recommendation");

impl Recommendation {
    /// `"<type>: <description>"`, as shown in listings.
    pub fn label(&self) -> String {
        format!("{}: {}", self.reco_type.display(), self.description)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RecommendationInput {
    #[serde(default)]
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub description: String,
    pub reco_type: RecoType,
    #[serde(default)]
    pub context: CareContext,
}

/// A recommendation that must not be applied to patients with `health`.
/// Unique per (recommendation, health).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionDisease {
    pub id: i64,
    #[serde(rename = "recommendation_id")]
    pub recommendation: i64,
    #[serde(rename = "patient_health_id")]
    pub health: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(ExceptionDisease, "disease exception");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ExceptionDiseaseInput {
    #[serde(rename = "recommendation_id", default)]
    pub recommendation: i64,
    #[serde(rename = "patient_health_id", alias = "health", default)]
    pub health: i64,
}

/// Detection references from each monitoring channel. `status` is true
/// while the anomaly is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: i64,
    pub hr_id: i64,
    pub sp_id: i64,
    pub pr_id: i64,
    pub bt_id: i64,
    pub resp_id: i64,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Anomaly, "anomaly");

impl Anomaly {
    pub fn references(&self) -> [(&'static str, i64); 5] {
        [
            ("hr_id", self.hr_id),
            ("sp_id", self.sp_id),
            ("pr_id", self.pr_id),
            ("bt_id", self.bt_id),
            ("resp_id", self.resp_id),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AnomalyInput {
    #[serde(default)]
    pub hr_id: i64,
    #[serde(default)]
    pub sp_id: i64,
    #[serde(default)]
    pub pr_id: i64,
    #[serde(default)]
    pub bt_id: i64,
    #[serde(default)]
    pub resp_id: i64,
    #[serde(default = "yes")]
    pub status: bool,
}

/// A treatment step for an anomaly. Unique per (anomaly, recommendation);
/// sequence numbers start at 1 and are assigned on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: i64,
    #[serde(rename = "anomaly_id")]
    pub diagnosis: i64,
    #[serde(rename = "recommendation_id")]
    pub recommendation: i64,
    #[serde(rename = "user_id")]
    pub user: i64,
    pub sequence_no: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Medication, "medication");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MedicationInput {
    #[serde(rename = "anomaly_id", alias = "diagnosis", default)]
    pub diagnosis: i64,
    #[serde(rename = "recommendation_id", default)]
    pub recommendation: i64,
    #[serde(default)]
    pub sequence_no: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

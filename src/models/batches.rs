//! Flocks and their day-to-day schedule, activity and feeding records.
//!
//! Field spellings such as `quanitity` and `batchAcitivtyCost` are kept as
//! existing clients send them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::impl_record;

/// `batch_status` value of a flock still on the farm.
pub const BATCH_ACTIVE: i64 = 1;

fn one() -> i64 {
    1
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    #[serde(rename = "batchID")]
    pub id: i64,
    #[serde(rename = "farmID")]
    pub farm: Option<i64>,
    #[serde(rename = "breedID")]
    pub breed: Option<i64>,
    #[serde(rename = "arriveDate")]
    pub arrive_date: NaiveDate,
    #[serde(rename = "initAge")]
    pub init_age: i64,
    #[serde(rename = "harvestAge")]
    pub harvest_age: i64,
    #[serde(rename = "quanitity")]
    pub quantity: i64,
    #[serde(rename = "initWeight")]
    pub init_weight: i64,
    pub batch_status: i64,
}

impl_record!(Batch, "batch");

impl Batch {
    pub fn is_active(&self) -> bool {
        self.batch_status == BATCH_ACTIVE
    }

    pub fn label(&self) -> String {
        format!("BATCH/{}", self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_ages"))]
pub struct BatchInput {
    #[serde(rename = "farmID", default)]
    pub farm: Option<i64>,
    #[serde(rename = "breedID", default)]
    pub breed: Option<i64>,
    #[serde(rename = "arriveDate", default = "epoch")]
    pub arrive_date: NaiveDate,
    #[serde(rename = "initAge", default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub init_age: i64,
    #[serde(rename = "harvestAge", default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub harvest_age: i64,
    #[serde(rename = "quanitity", default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub quantity: i64,
    #[serde(rename = "initWeight", default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub init_weight: i64,
    #[serde(default = "one")]
    pub batch_status: i64,
}

fn validate_ages(input: &BatchInput) -> Result<(), validator::ValidationError> {
    if input.harvest_age > 0 && input.harvest_age < input.init_age {
        let mut err = validator::ValidationError::new("ages");
        err.message = Some("Harvest age cannot be lower than the initial age.".into());
        return Err(err);
    }
    Ok(())
}

impl Batch {
    pub fn to_input(&self) -> BatchInput {
        BatchInput {
            farm: self.farm,
            breed: self.breed,
            arrive_date: self.arrive_date,
            init_age: self.init_age,
            harvest_age: self.harvest_age,
            quantity: self.quantity,
            init_weight: self.init_weight,
            batch_status: self.batch_status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySchedule {
    #[serde(rename = "activityID")]
    pub id: i64,
    #[serde(rename = "batchID")]
    pub batch: Option<i64>,
    #[serde(rename = "activityName")]
    pub activity_name: String,
    #[serde(rename = "activityDescription")]
    pub activity_description: String,
    #[serde(rename = "activityDay")]
    pub activity_day: String,
    pub activity_status: i64,
    pub activity_frequency: i64,
}

impl_record!(ActivitySchedule, "activity schedule");

fn default_activity_name() -> String {
    "Default Activity".to_string()
}

fn default_activity_description() -> String {
    "No description".to_string()
}

fn default_activity_day() -> String {
    "Day".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ActivityScheduleInput {
    #[serde(rename = "batchID", default)]
    pub batch: Option<i64>,
    #[serde(rename = "activityName", default = "default_activity_name")]
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub activity_name: String,
    #[serde(rename = "activityDescription", default = "default_activity_description")]
    #[validate(length(max = 300, message = "Ensure this field has no more than 300 characters."))]
    pub activity_description: String,
    #[serde(rename = "activityDay", default = "default_activity_day")]
    #[validate(length(max = 10, message = "Ensure this field has no more than 10 characters."))]
    pub activity_day: String,
    #[serde(default = "one")]
    pub activity_status: i64,
    #[serde(default = "one")]
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub activity_frequency: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchActivity {
    #[serde(rename = "batchActivityID")]
    pub id: i64,
    #[serde(rename = "batchID")]
    pub batch: Option<i64>,
    #[serde(rename = "breedActivityID")]
    pub breed_activity: Option<i64>,
    #[serde(rename = "batchActivityName")]
    pub name: String,
    #[serde(rename = "batchActivityDate")]
    pub date: NaiveDate,
    #[serde(rename = "batchActivityDetails")]
    pub details: String,
    #[serde(rename = "batchAcitivtyCost")]
    pub cost: i64,
}

impl_record!(BatchActivity, "batch activity");

fn default_batch_activity_name() -> String {
    "Default Batch Activity".to_string()
}

fn default_details() -> String {
    "No details".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchActivityInput {
    #[serde(rename = "batchID", default)]
    pub batch: Option<i64>,
    #[serde(rename = "breedActivityID", default)]
    pub breed_activity: Option<i64>,
    #[serde(rename = "batchActivityName", default = "default_batch_activity_name")]
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub name: String,
    #[serde(rename = "batchActivityDate", default = "epoch")]
    pub date: NaiveDate,
    #[serde(rename = "batchActivityDetails", default = "default_details")]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub details: String,
    #[serde(rename = "batchAcitivtyCost", default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFeeding {
    #[serde(rename = "batchFeedingID")]
    pub id: i64,
    #[serde(rename = "batchID")]
    pub batch: Option<i64>,
    #[serde(rename = "feedingDate")]
    pub feeding_date: NaiveDate,
    #[serde(rename = "feedingAmount")]
    pub feeding_amount: i64,
    pub status: i64,
}

impl_record!(BatchFeeding, "batch feeding");

/// `feedingDate` defaults to the day the record is created.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchFeedingInput {
    #[serde(rename = "batchID", default)]
    pub batch: Option<i64>,
    #[serde(rename = "feedingDate", default)]
    pub feeding_date: Option<NaiveDate>,
    #[serde(rename = "feedingAmount", default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub feeding_amount: i64,
    #[serde(default = "one")]
    pub status: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_input_defaults_and_legacy_names() {
        let input: BatchInput = serde_json::from_str(r#"{"farmID": 2, "quanitity": 500}"#).unwrap();
        assert_eq!(input.farm, Some(2));
        assert_eq!(input.quantity, 500);
        assert_eq!(input.arrive_date, NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());
        assert_eq!(input.batch_status, BATCH_ACTIVE);
    }

    #[test]
    fn harvest_before_arrival_age_is_rejected() {
        let input: BatchInput =
            serde_json::from_str(r#"{"initAge": 10, "harvestAge": 5}"#).unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn batch_activity_cost_keeps_spelling() {
        let activity = BatchActivity {
            id: 1,
            batch: Some(3),
            breed_activity: None,
            name: "Vaccination".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            details: "Newcastle".to_string(),
            cost: 1200,
        };
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["batchAcitivtyCost"], 1200);
        assert!(json["breedActivityID"].is_null());
    }
}

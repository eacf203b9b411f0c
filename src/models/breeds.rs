//! Breed reference data: types, breeds and the per-age activity, condition,
//! feeding and growth targets attached to a breed.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::impl_record;

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedType {
    #[serde(rename = "breed_typeID")]
    pub id: i64,
    #[serde(rename = "breedType")]
    pub breed_type: String,
}

impl_record!(BreedType, "breed type");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BreedTypeInput {
    #[serde(rename = "breedType", default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub breed_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breed {
    #[serde(rename = "breedID")]
    pub id: i64,
    #[serde(rename = "breedName")]
    pub breed_name: String,
    #[serde(rename = "breed_typeID")]
    pub breed_type: i64,
    pub preedphoto: String,
}

impl_record!(Breed, "breed");

pub const DEFAULT_BREED_PHOTO: &str = "preedphoto.png";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BreedInput {
    #[serde(rename = "breedName", default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub breed_name: String,
    #[serde(rename = "breed_typeID", default)]
    pub breed_type: i64,
    /// Blank or missing falls back to the default photo
    #[serde(default)]
    pub preedphoto: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityType {
    #[serde(rename = "activityTypeID")]
    pub id: i64,
    #[serde(rename = "activityType")]
    pub activity_type: String,
}

impl_record!(ActivityType, "activity type");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ActivityTypeInput {
    #[serde(rename = "activityType", default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub activity_type: String,
}

/// Activity due at a given age for a breed; unique per (breed, type, age).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedActivity {
    #[serde(rename = "breedActivityID")]
    pub id: i64,
    #[serde(rename = "breedID")]
    pub breed: i64,
    #[serde(rename = "activityTypeID")]
    pub activity_type: i64,
    pub age: i64,
    pub breed_activity_status: i64,
}

impl_record!(BreedActivity, "breed activity");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BreedActivityInput {
    #[serde(rename = "breedID", default)]
    pub breed: i64,
    #[serde(rename = "activityTypeID", default)]
    pub activity_type: i64,
    #[serde(default)]
    pub age: i64,
    #[serde(default = "one")]
    pub breed_activity_status: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionType {
    #[serde(rename = "condition_typeID")]
    pub id: i64,
    #[serde(rename = "conditionName")]
    pub condition_name: String,
    pub condition_unit: String,
}

impl_record!(ConditionType, "condition type");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ConditionTypeInput {
    #[serde(rename = "conditionName", alias = "name", default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub condition_name: String,
    #[serde(alias = "unit", default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub condition_unit: String,
}

/// Acceptable environmental range for a breed; unique per (breed, condition type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedCondition {
    #[serde(rename = "breed_conditionID")]
    pub id: i64,
    #[serde(rename = "breedID")]
    pub breed: i64,
    #[serde(rename = "condition_typeID")]
    pub condition_type: i64,
    #[serde(rename = "condictionMin")]
    pub condition_min: i64,
    #[serde(rename = "conditionMax")]
    pub condition_max: i64,
    pub condition_status: i64,
}

impl_record!(BreedCondition, "breed condition");

impl BreedCondition {
    pub fn range_label(&self) -> String {
        format!("{} - {}", self.condition_min, self.condition_max)
    }

    pub fn status_label(&self) -> &'static str {
        if self.condition_status == 1 {
            "Active"
        } else {
            "Inactive"
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_condition_range"))]
pub struct BreedConditionInput {
    #[serde(rename = "breedID", default)]
    pub breed: i64,
    #[serde(rename = "condition_typeID", default)]
    pub condition_type: i64,
    #[serde(rename = "condictionMin", default)]
    pub condition_min: i64,
    #[serde(rename = "conditionMax", default)]
    pub condition_max: i64,
    #[serde(default = "one")]
    pub condition_status: i64,
}

fn validate_condition_range(input: &BreedConditionInput) -> Result<(), validator::ValidationError> {
    if input.condition_min > input.condition_max {
        let mut err = validator::ValidationError::new("condition_range");
        err.message = Some("Minimum value cannot be greater than maximum value.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodType {
    #[serde(rename = "foodTypeID")]
    pub id: i64,
    #[serde(rename = "foodName")]
    pub food_name: String,
}

impl_record!(FoodType, "food type");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FoodTypeInput {
    #[serde(rename = "foodName", default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub food_name: String,
}

/// Feed ration for a breed at an age; unique per (breed, food type, age).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedFeeding {
    #[serde(rename = "breedFeedingID")]
    pub id: i64,
    #[serde(rename = "breedID")]
    pub breed: i64,
    #[serde(rename = "foodTypeID")]
    pub food_type: i64,
    pub age: i64,
    pub quantity: i64,
    pub frequency: i64,
    pub breed_feed_status: i64,
}

impl_record!(BreedFeeding, "breed feeding");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BreedFeedingInput {
    #[serde(rename = "breedID", default)]
    pub breed: i64,
    #[serde(rename = "foodTypeID", default)]
    pub food_type: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub age: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub quantity: i64,
    #[serde(default = "one")]
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub frequency: i64,
    #[serde(default = "one")]
    pub breed_feed_status: i64,
}

/// Minimum expected weight at an age; unique per (breed, age).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedGrowth {
    #[serde(rename = "breedGrowthID")]
    pub id: i64,
    #[serde(rename = "breedID")]
    pub breed: i64,
    pub age: i64,
    #[serde(rename = "minWeight")]
    pub min_weight: i64,
}

impl_record!(BreedGrowth, "breed growth");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BreedGrowthInput {
    #[serde(rename = "breedID", default)]
    pub breed: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub age: i64,
    #[serde(rename = "minWeight", default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub min_weight: i64,
}

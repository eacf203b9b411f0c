//! Breed reference data. Types, breeds and the lookup tables are maintained by
//! administrators; the per-age targets are editable by any signed-in user.

use serde_json::{json, Value};

use crate::models::breeds::{
    ActivityType, ActivityTypeInput, Breed, BreedActivity, BreedActivityInput, BreedCondition,
    BreedConditionInput, BreedFeeding, BreedFeedingInput, BreedGrowth, BreedGrowthInput,
    BreedInput, BreedType, BreedTypeInput, ConditionType, ConditionTypeInput, FoodType,
    FoodTypeInput, DEFAULT_BREED_PHOTO,
};
use crate::models::validation::{exists, not_blank, unique, FieldErrors, NON_FIELD_ERRORS};
use super::{extend, filter_by, is_other, row_id};
use crate::server::crud::{Crud, Ctx, Params};
use crate::server::errors::ApiError;

impl Crud for BreedType {
    type Input = BreedTypeInput;
    const ADMIN_WRITE: bool = true;

    fn to_input(&self) -> BreedTypeInput {
        BreedTypeInput {
            breed_type: self.breed_type.clone(),
        }
    }

    fn build(input: BreedTypeInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        not_blank(&mut errors, "breedType", &input.breed_type);
        unique(
            &mut errors,
            "breedType",
            ctx.tables
                .breed_types
                .any(|b| b.breed_type == input.breed_type && is_other(b, current)),
            "breed type",
        );
        errors.into_result()?;
        Ok(BreedType {
            id: row_id(current),
            breed_type: input.breed_type,
        })
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        let breeds: Vec<i64> = t
            .breeds
            .iter()
            .filter(|b| b.breed_type == self.id)
            .map(|b| b.id)
            .collect();
        let total_activities = t
            .breed_activities
            .count(|a| breeds.contains(&a.breed));
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "breeds_count": breeds.len(),
                "total_activities": total_activities,
            }),
        )
    }
}

impl Crud for Breed {
    type Input = BreedInput;
    const ADMIN_WRITE: bool = true;

    fn to_input(&self) -> BreedInput {
        BreedInput {
            breed_name: self.breed_name.clone(),
            breed_type: self.breed_type,
            preedphoto: Some(self.preedphoto.clone()),
        }
    }

    fn build(input: BreedInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        not_blank(&mut errors, "breedName", &input.breed_name);
        unique(
            &mut errors,
            "breedName",
            t.breeds
                .any(|b| b.breed_name == input.breed_name && is_other(b, current)),
            "breed",
        );
        exists(
            &mut errors,
            "breed_typeID",
            input.breed_type,
            t.breed_types.contains(input.breed_type),
        );
        errors.into_result()?;
        let preedphoto = input
            .preedphoto
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BREED_PHOTO.to_string());
        Ok(Breed {
            id: row_id(current),
            breed_name: input.breed_name,
            breed_type: input.breed_type,
            preedphoto,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        filter_by(params, "breed_type", self.breed_type)
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "type_detail": t.breed_types.get(self.breed_type),
                "activities_count": t.breed_activities.count(|a| a.breed == self.id),
                "conditions_count": t.breed_conditions.count(|c| c.breed == self.id),
                "feeding_schedules_count": t.breed_feedings.count(|f| f.breed == self.id),
                "growth_records_count": t.breed_growths.count(|g| g.breed == self.id),
            }),
        )
    }
}

impl Crud for ActivityType {
    type Input = ActivityTypeInput;
    const ADMIN_WRITE: bool = true;

    fn to_input(&self) -> ActivityTypeInput {
        ActivityTypeInput {
            activity_type: self.activity_type.clone(),
        }
    }

    fn build(input: ActivityTypeInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        not_blank(&mut errors, "activityType", &input.activity_type);
        unique(
            &mut errors,
            "activityType",
            ctx.tables
                .activity_types
                .any(|a| a.activity_type == input.activity_type && is_other(a, current)),
            "activity type",
        );
        errors.into_result()?;
        Ok(ActivityType {
            id: row_id(current),
            activity_type: input.activity_type,
        })
    }
}

impl Crud for BreedActivity {
    type Input = BreedActivityInput;

    fn to_input(&self) -> BreedActivityInput {
        BreedActivityInput {
            breed: self.breed,
            activity_type: self.activity_type,
            age: self.age,
            breed_activity_status: self.breed_activity_status,
        }
    }

    fn build(input: BreedActivityInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        exists(&mut errors, "breedID", input.breed, t.breeds.contains(input.breed));
        exists(
            &mut errors,
            "activityTypeID",
            input.activity_type,
            t.activity_types.contains(input.activity_type),
        );
        if t.breed_activities.any(|a| {
            a.breed == input.breed
                && a.activity_type == input.activity_type
                && a.age == input.age
                && is_other(a, current)
        }) {
            errors.add(
                NON_FIELD_ERRORS,
                "The fields breedID, activityTypeID, age must make a unique set.",
            );
        }
        errors.into_result()?;
        Ok(BreedActivity {
            id: row_id(current),
            breed: input.breed,
            activity_type: input.activity_type,
            age: input.age,
            breed_activity_status: input.breed_activity_status,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        filter_by(params, "breed", self.breed)
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by_key(|a| (a.breed, a.age, a.id));
    }
}

impl Crud for ConditionType {
    type Input = ConditionTypeInput;
    const ADMIN_WRITE: bool = true;

    fn to_input(&self) -> ConditionTypeInput {
        ConditionTypeInput {
            condition_name: self.condition_name.clone(),
            condition_unit: self.condition_unit.clone(),
        }
    }

    fn build(input: ConditionTypeInput, current: Option<&Self>, _ctx: &Ctx) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        not_blank(&mut errors, "conditionName", &input.condition_name);
        not_blank(&mut errors, "condition_unit", &input.condition_unit);
        errors.into_result()?;
        Ok(ConditionType {
            id: row_id(current),
            condition_name: input.condition_name,
            condition_unit: input.condition_unit,
        })
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "name": self.condition_name,
                "unit": self.condition_unit,
                "breed_conditions_count": t.breed_conditions.count(|c| c.condition_type == self.id),
                "active_conditions_count": t
                    .breed_conditions
                    .count(|c| c.condition_type == self.id && c.condition_status == 1),
            }),
        )
    }
}

impl Crud for BreedCondition {
    type Input = BreedConditionInput;

    fn to_input(&self) -> BreedConditionInput {
        BreedConditionInput {
            breed: self.breed,
            condition_type: self.condition_type,
            condition_min: self.condition_min,
            condition_max: self.condition_max,
            condition_status: self.condition_status,
        }
    }

    fn build(input: BreedConditionInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        exists(&mut errors, "breedID", input.breed, t.breeds.contains(input.breed));
        exists(
            &mut errors,
            "condition_typeID",
            input.condition_type,
            t.condition_types.contains(input.condition_type),
        );
        if t.breed_conditions.any(|c| {
            c.breed == input.breed && c.condition_type == input.condition_type && is_other(c, current)
        }) {
            errors.add(
                NON_FIELD_ERRORS,
                "The fields breedID, condition_typeID must make a unique set.",
            );
        }
        errors.into_result()?;
        Ok(BreedCondition {
            id: row_id(current),
            breed: input.breed,
            condition_type: input.condition_type,
            condition_min: input.condition_min,
            condition_max: input.condition_max,
            condition_status: input.condition_status,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        filter_by(params, "breed", self.breed)
    }

    fn render(&self, _ctx: &Ctx) -> Value {
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "condition_range": self.range_label(),
                "status_display": self.status_label(),
            }),
        )
    }
}

impl Crud for FoodType {
    type Input = FoodTypeInput;
    const ADMIN_WRITE: bool = true;

    fn to_input(&self) -> FoodTypeInput {
        FoodTypeInput {
            food_name: self.food_name.clone(),
        }
    }

    fn build(input: FoodTypeInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        not_blank(&mut errors, "foodName", &input.food_name);
        unique(
            &mut errors,
            "foodName",
            ctx.tables
                .food_types
                .any(|f| f.food_name == input.food_name && is_other(f, current)),
            "food type",
        );
        errors.into_result()?;
        Ok(FoodType {
            id: row_id(current),
            food_name: input.food_name,
        })
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        let mut breeds: Vec<i64> = t
            .breed_feedings
            .iter()
            .filter(|f| f.food_type == self.id)
            .map(|f| f.breed)
            .collect();
        let schedules = breeds.len();
        breeds.sort_unstable();
        breeds.dedup();
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "feeding_schedules_count": schedules,
                "breeds_using_count": breeds.len(),
            }),
        )
    }
}

impl Crud for BreedFeeding {
    type Input = BreedFeedingInput;

    fn to_input(&self) -> BreedFeedingInput {
        BreedFeedingInput {
            breed: self.breed,
            food_type: self.food_type,
            age: self.age,
            quantity: self.quantity,
            frequency: self.frequency,
            breed_feed_status: self.breed_feed_status,
        }
    }

    fn build(input: BreedFeedingInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        exists(&mut errors, "breedID", input.breed, t.breeds.contains(input.breed));
        exists(
            &mut errors,
            "foodTypeID",
            input.food_type,
            t.food_types.contains(input.food_type),
        );
        if t.breed_feedings.any(|f| {
            f.breed == input.breed
                && f.food_type == input.food_type
                && f.age == input.age
                && is_other(f, current)
        }) {
            errors.add(
                NON_FIELD_ERRORS,
                "The fields breedID, foodTypeID, age must make a unique set.",
            );
        }
        errors.into_result()?;
        Ok(BreedFeeding {
            id: row_id(current),
            breed: input.breed,
            food_type: input.food_type,
            age: input.age,
            quantity: input.quantity,
            frequency: input.frequency,
            breed_feed_status: input.breed_feed_status,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        filter_by(params, "breed", self.breed)
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by_key(|f| (f.breed, f.age, f.id));
    }
}

impl Crud for BreedGrowth {
    type Input = BreedGrowthInput;

    fn to_input(&self) -> BreedGrowthInput {
        BreedGrowthInput {
            breed: self.breed,
            age: self.age,
            min_weight: self.min_weight,
        }
    }

    fn build(input: BreedGrowthInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        exists(&mut errors, "breedID", input.breed, t.breeds.contains(input.breed));
        if t
            .breed_growths
            .any(|g| g.breed == input.breed && g.age == input.age && is_other(g, current))
        {
            errors.add(NON_FIELD_ERRORS, "The fields breedID, age must make a unique set.");
        }
        errors.into_result()?;
        Ok(BreedGrowth {
            id: row_id(current),
            breed: input.breed,
            age: input.age,
            min_weight: input.min_weight,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        filter_by(params, "breed", self.breed)
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by_key(|g| (g.breed, g.age));
    }
}

//! Flock batches and the activities, schedules and feedings recorded against them.

use serde_json::{json, Value};

use super::{extend, filter_by, optional_filter, row_id};
use crate::models::batches::{
    ActivitySchedule, ActivityScheduleInput, Batch, BatchActivity, BatchActivityInput,
    BatchFeeding, BatchFeedingInput, BatchInput,
};
use crate::models::validation::{exists, FieldErrors};
use crate::server::crud::{Crud, Ctx, Params};
use crate::server::errors::ApiError;
use crate::store::Tables;

fn check_batch(t: &Tables, batch: Option<i64>, errors: &mut FieldErrors) {
    if let Some(id) = batch {
        exists(errors, "batchID", id, t.batches.contains(id));
    }
}

fn batch_summary(t: &Tables, batch: Option<i64>) -> Value {
    batch
        .and_then(|id| t.batches.get(id))
        .map(|b| json!({"batchID": b.id, "label": b.label(), "batch_status": b.batch_status}))
        .unwrap_or(Value::Null)
}

impl Crud for Batch {
    type Input = BatchInput;

    fn to_input(&self) -> BatchInput {
        Batch::to_input(self)
    }

    fn build(input: BatchInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        if let Some(farm) = input.farm {
            exists(&mut errors, "farmID", farm, t.farms.contains(farm));
        }
        if let Some(breed) = input.breed {
            exists(&mut errors, "breedID", breed, t.breeds.contains(breed));
        }
        errors.into_result()?;
        Ok(Batch {
            id: row_id(current),
            farm: input.farm,
            breed: input.breed,
            arrive_date: input.arrive_date,
            init_age: input.init_age,
            harvest_age: input.harvest_age,
            quantity: input.quantity,
            init_weight: input.init_weight,
            batch_status: input.batch_status,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        optional_filter(params, "farm", self.farm) && optional_filter(params, "breed", self.breed)
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        let farm = self.farm.and_then(|id| t.farms.get(id)).map(|f| {
            json!({"farmID": f.id, "farmName": f.farm_name, "location": f.location})
        });
        let breed = self.breed.and_then(|id| t.breeds.get(id)).map(|b| {
            json!({
                "breedID": b.id,
                "breedName": b.breed_name,
                "preedphoto": b.preedphoto,
                "type_detail": t.breed_types.get(b.breed_type),
            })
        });
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "farm_detail": farm,
                "breed_detail": breed,
                "activities_count": t.batch_activities.count(|a| a.batch == Some(self.id)),
                "feedings_count": t.batch_feedings.count(|f| f.batch == Some(self.id)),
            }),
        )
    }
}

impl Crud for ActivitySchedule {
    type Input = ActivityScheduleInput;

    fn to_input(&self) -> ActivityScheduleInput {
        ActivityScheduleInput {
            batch: self.batch,
            activity_name: self.activity_name.clone(),
            activity_description: self.activity_description.clone(),
            activity_day: self.activity_day.clone(),
            activity_status: self.activity_status,
            activity_frequency: self.activity_frequency,
        }
    }

    fn build(input: ActivityScheduleInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        check_batch(ctx.tables, input.batch, &mut errors);
        errors.into_result()?;
        Ok(ActivitySchedule {
            id: row_id(current),
            batch: input.batch,
            activity_name: input.activity_name,
            activity_description: input.activity_description,
            activity_day: input.activity_day,
            activity_status: input.activity_status,
            activity_frequency: input.activity_frequency,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        optional_filter(params, "batch", self.batch)
    }

    fn render(&self, ctx: &Ctx) -> Value {
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({ "batch_detail": batch_summary(ctx.tables, self.batch) }),
        )
    }
}

impl Crud for BatchActivity {
    type Input = BatchActivityInput;

    fn to_input(&self) -> BatchActivityInput {
        BatchActivityInput {
            batch: self.batch,
            breed_activity: self.breed_activity,
            name: self.name.clone(),
            date: self.date,
            details: self.details.clone(),
            cost: self.cost,
        }
    }

    fn build(input: BatchActivityInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        check_batch(t, input.batch, &mut errors);
        if let Some(id) = input.breed_activity {
            exists(&mut errors, "breedActivityID", id, t.breed_activities.contains(id));
        }
        errors.into_result()?;
        Ok(BatchActivity {
            id: row_id(current),
            batch: input.batch,
            breed_activity: input.breed_activity,
            name: input.name,
            date: input.date,
            details: input.details,
            cost: input.cost,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        optional_filter(params, "batch", self.batch)
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        let breed_activity = self
            .breed_activity
            .and_then(|id| t.breed_activities.get(id))
            .map(|a| {
                json!({
                    "breedActivityID": a.id,
                    "age": a.age,
                    "activityType": t.activity_types.get(a.activity_type).map(|x| x.activity_type.as_str()),
                })
            });
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "batch_detail": batch_summary(t, self.batch),
                "breed_activity_detail": breed_activity,
            }),
        )
    }
}

impl Crud for BatchFeeding {
    type Input = BatchFeedingInput;

    fn to_input(&self) -> BatchFeedingInput {
        BatchFeedingInput {
            batch: self.batch,
            feeding_date: Some(self.feeding_date),
            feeding_amount: self.feeding_amount,
            status: self.status,
        }
    }

    fn build(input: BatchFeedingInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        check_batch(ctx.tables, input.batch, &mut errors);
        errors.into_result()?;
        let feeding_date = input
            .feeding_date
            .or(current.map(|c| c.feeding_date))
            .unwrap_or_else(|| ctx.now.date_naive());
        Ok(BatchFeeding {
            id: row_id(current),
            batch: input.batch,
            feeding_date,
            feeding_amount: input.feeding_amount,
            status: input.status,
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        optional_filter(params, "batch", self.batch) && filter_by(params, "status", self.status)
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by(|a, b| b.feeding_date.cmp(&a.feeding_date).then(a.id.cmp(&b.id)));
    }
}

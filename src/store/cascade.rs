//! Deletion with the same dependency rules as the relational schema:
//! dependants are removed along with their parent, except where a row is
//! protected while something still points at it.

use super::{Record, StoreError, Stored, Tables};
use crate::models::accounts::{Farmer, User};
use crate::models::batches::{ActivitySchedule, Batch, BatchActivity, BatchFeeding};
use crate::models::breeds::{
    ActivityType, Breed, BreedActivity, BreedCondition, BreedFeeding, BreedGrowth, BreedType,
    ConditionType, FoodType,
};
use crate::models::farms::{Device, Farm, FarmMembership};
use crate::models::knowledge::{
    Anomaly, ExceptionDisease, Medication, PatientHealth, Recommendation,
};
use crate::models::sensors::{Reading, SensorType};
use crate::models::subscriptions::{
    Allocation, FarmerSubscription, Payment, Resource, SubscriptionType,
};

pub trait Deletable: Stored {
    /// Remove the row with `id` and its dependants.
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        remove::<Self>(tables, id)
    }
}

fn remove<T: Stored>(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
    T::table_mut(tables)
        .remove(id)
        .map(|_| ())
        .ok_or_else(|| StoreError::not_found::<T>(id))
}

fn ensure_exists<T: Stored>(tables: &Tables, id: i64) -> Result<(), StoreError> {
    T::table(tables).require(id).map(|_| ())
}

fn delete_all<T: Deletable>(tables: &mut Tables, ids: Vec<i64>) -> Result<(), StoreError> {
    for id in ids {
        T::delete(tables, id)?;
    }
    Ok(())
}

fn ids_where<T: Stored>(tables: &Tables, mut pred: impl FnMut(&T) -> bool) -> Vec<i64> {
    T::table(tables)
        .iter()
        .filter(|row| pred(row))
        .map(|row| row.id())
        .collect()
}

impl Deletable for User {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<User>(tables, id)?;
        if tables.medications.any(|m| m.user == id) {
            return Err(StoreError::Protected {
                kind: User::KIND,
                id,
                referenced_by: "medications",
            });
        }
        let profiles = ids_where::<Farmer>(tables, |f| f.user == id);
        delete_all::<Farmer>(tables, profiles)?;
        remove::<User>(tables, id)
    }
}

impl Deletable for Farmer {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<Farmer>(tables, id)?;
        tables.memberships.remove_where(|m| m.farmer == id);
        let subscriptions = ids_where::<FarmerSubscription>(tables, |s| s.farmer == Some(id));
        delete_all::<FarmerSubscription>(tables, subscriptions)?;
        remove::<Farmer>(tables, id)
    }
}

impl Deletable for Farm {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<Farm>(tables, id)?;
        tables.memberships.remove_where(|m| m.farm == id);
        let devices = ids_where::<Device>(tables, |d| d.farm == id);
        delete_all::<Device>(tables, devices)?;
        let batches = ids_where::<Batch>(tables, |b| b.farm == Some(id));
        delete_all::<Batch>(tables, batches)?;
        remove::<Farm>(tables, id)
    }
}

impl Deletable for FarmMembership {}

impl Deletable for Device {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<Device>(tables, id)?;
        tables.readings.remove_where(|r| r.device == id);
        remove::<Device>(tables, id)
    }
}

impl Deletable for BreedType {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<BreedType>(tables, id)?;
        let breeds = ids_where::<Breed>(tables, |b| b.breed_type == id);
        delete_all::<Breed>(tables, breeds)?;
        remove::<BreedType>(tables, id)
    }
}

impl Deletable for Breed {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<Breed>(tables, id)?;
        let activities = ids_where::<BreedActivity>(tables, |a| a.breed == id);
        delete_all::<BreedActivity>(tables, activities)?;
        tables.breed_conditions.remove_where(|c| c.breed == id);
        tables.breed_feedings.remove_where(|f| f.breed == id);
        tables.breed_growths.remove_where(|g| g.breed == id);
        let batches = ids_where::<Batch>(tables, |b| b.breed == Some(id));
        delete_all::<Batch>(tables, batches)?;
        remove::<Breed>(tables, id)
    }
}

impl Deletable for ActivityType {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<ActivityType>(tables, id)?;
        let activities = ids_where::<BreedActivity>(tables, |a| a.activity_type == id);
        delete_all::<BreedActivity>(tables, activities)?;
        remove::<ActivityType>(tables, id)
    }
}

impl Deletable for BreedActivity {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<BreedActivity>(tables, id)?;
        tables
            .batch_activities
            .remove_where(|a| a.breed_activity == Some(id));
        remove::<BreedActivity>(tables, id)
    }
}

impl Deletable for ConditionType {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<ConditionType>(tables, id)?;
        tables.breed_conditions.remove_where(|c| c.condition_type == id);
        remove::<ConditionType>(tables, id)
    }
}

impl Deletable for BreedCondition {}

impl Deletable for FoodType {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<FoodType>(tables, id)?;
        tables.breed_feedings.remove_where(|f| f.food_type == id);
        remove::<FoodType>(tables, id)
    }
}

impl Deletable for BreedFeeding {}

impl Deletable for BreedGrowth {}

impl Deletable for Batch {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<Batch>(tables, id)?;
        tables.activity_schedules.remove_where(|s| s.batch == Some(id));
        tables.batch_activities.remove_where(|a| a.batch == Some(id));
        tables.batch_feedings.remove_where(|f| f.batch == Some(id));
        remove::<Batch>(tables, id)
    }
}

impl Deletable for ActivitySchedule {}

impl Deletable for BatchActivity {}

impl Deletable for BatchFeeding {}

impl Deletable for SensorType {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<SensorType>(tables, id)?;
        if tables.readings.any(|r| r.sensor_type == id) {
            return Err(StoreError::Protected {
                kind: SensorType::KIND,
                id,
                referenced_by: "readings",
            });
        }
        remove::<SensorType>(tables, id)
    }
}

impl Deletable for Reading {}

impl Deletable for SubscriptionType {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<SubscriptionType>(tables, id)?;
        if tables
            .subscriptions
            .any(|s| s.subscription_type == Some(id))
        {
            return Err(StoreError::Protected {
                kind: SubscriptionType::KIND,
                id,
                referenced_by: "farmer subscriptions",
            });
        }
        remove::<SubscriptionType>(tables, id)
    }
}

impl Deletable for Resource {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<Resource>(tables, id)?;
        if tables.allocations.any(|a| a.resource == id) {
            return Err(StoreError::Protected {
                kind: Resource::KIND,
                id,
                referenced_by: "subscription allocations",
            });
        }
        remove::<Resource>(tables, id)
    }
}

impl Deletable for FarmerSubscription {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<FarmerSubscription>(tables, id)?;
        tables.allocations.remove_where(|a| a.subscription == id);
        tables.payments.remove_where(|p| p.subscription == Some(id));
        remove::<FarmerSubscription>(tables, id)
    }
}

impl Deletable for Allocation {}

impl Deletable for Payment {}

impl Deletable for PatientHealth {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<PatientHealth>(tables, id)?;
        tables.exception_diseases.remove_where(|e| e.health == id);
        remove::<PatientHealth>(tables, id)
    }
}

impl Deletable for Recommendation {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<Recommendation>(tables, id)?;
        if tables.medications.any(|m| m.recommendation == id) {
            return Err(StoreError::Protected {
                kind: Recommendation::KIND,
                id,
                referenced_by: "medications",
            });
        }
        tables.exception_diseases.remove_where(|e| e.recommendation == id);
        remove::<Recommendation>(tables, id)
    }
}

impl Deletable for ExceptionDisease {}

impl Deletable for Anomaly {
    fn delete(tables: &mut Tables, id: i64) -> Result<(), StoreError> {
        ensure_exists::<Anomaly>(tables, id)?;
        tables.medications.remove_where(|m| m.diagnosis == id);
        remove::<Anomaly>(tables, id)
    }
}

impl Deletable for Medication {}

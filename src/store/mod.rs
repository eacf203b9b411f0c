//! In-memory record store with JSON snapshot persistence.
//!
//! Every table lives behind one `RwLock`. Writers get a draft copy of all
//! tables; the draft replaces the live tables only when the closure succeeds
//! and the snapshot (if any) was written, so a failed operation never leaves
//! partial changes behind.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::RwLock;

mod cascade;
pub mod snapshot;
mod table;

pub use cascade::Deletable;
pub use table::{Record, Table};

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

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Snapshot {path} is not valid: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Snapshot version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("No {kind} with id {id}")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Cannot delete {kind} {id}: it is still referenced by {referenced_by}")]
    Protected {
        kind: &'static str,
        id: i64,
        referenced_by: &'static str,
    },
}

impl StoreError {
    pub fn not_found<T: Record>(id: i64) -> Self {
        StoreError::NotFound { kind: T::KIND, id }
    }
}

/// Gives generic code access to the table holding `Self`.
pub trait Stored: Record {
    fn table(tables: &Tables) -> &Table<Self>;
    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;
}

macro_rules! tables {
    ($($field:ident: $ty:ty),* $(,)?) => {
        /// Every table of the application.
        #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        pub struct Tables {
            $(pub $field: Table<$ty>,)*
        }

        $(
            impl Stored for $ty {
                fn table(tables: &Tables) -> &Table<Self> {
                    &tables.$field
                }

                fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
                    &mut tables.$field
                }
            }
        )*
    };
}

tables! {
    users: User,
    farmers: Farmer,
    farms: Farm,
    memberships: FarmMembership,
    devices: Device,
    breed_types: BreedType,
    breeds: Breed,
    activity_types: ActivityType,
    breed_activities: BreedActivity,
    condition_types: ConditionType,
    breed_conditions: BreedCondition,
    food_types: FoodType,
    breed_feedings: BreedFeeding,
    breed_growths: BreedGrowth,
    batches: Batch,
    activity_schedules: ActivitySchedule,
    batch_activities: BatchActivity,
    batch_feedings: BatchFeeding,
    sensor_types: SensorType,
    readings: Reading,
    subscription_types: SubscriptionType,
    resources: Resource,
    subscriptions: FarmerSubscription,
    allocations: Allocation,
    payments: Payment,
    patient_healths: PatientHealth,
    recommendations: Recommendation,
    exception_diseases: ExceptionDisease,
    anomalies: Anomaly,
    medications: Medication,
}

impl Tables {
    pub fn of<T: Stored>(&self) -> &Table<T> {
        T::table(self)
    }

    pub fn of_mut<T: Stored>(&mut self) -> &mut Table<T> {
        T::table_mut(self)
    }

    pub fn get<T: Stored>(&self, id: i64) -> Option<&T> {
        T::table(self).get(id)
    }

    pub fn require<T: Stored>(&self, id: i64) -> Result<&T, StoreError> {
        T::table(self).require(id)
    }

    pub fn insert<T: Stored>(&mut self, row: T) -> T {
        T::table_mut(self).insert(row)
    }

    /// Delete a row together with everything that depends on it.
    pub fn delete<T: Deletable>(&mut self, id: i64) -> Result<(), StoreError> {
        T::delete(self, id)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.find(|u| u.username == username)
    }

    pub fn farmer_for_user(&self, user_id: i64) -> Option<&Farmer> {
        self.farmers.find(|f| f.user == user_id)
    }

    pub fn membership(&self, farmer_id: i64, farm_id: i64) -> Option<&FarmMembership> {
        self.memberships
            .find(|m| m.farmer == farmer_id && m.farm == farm_id)
    }
}

/// Shared handle on the tables, optionally backed by a snapshot file.
#[derive(Debug)]
pub struct Store {
    tables: RwLock<Tables>,
    path: Option<PathBuf>,
}

impl Store {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::with_tables(Tables::default())
    }

    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
            path: None,
        }
    }

    /// Load the snapshot at `path`, starting empty if it does not exist yet.
    /// Writes are saved back to the same file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            snapshot::load(&path)?
        } else {
            log::info!("No snapshot at {}, starting with empty tables", path.display());
            Tables::default()
        };
        Ok(Self {
            tables: RwLock::new(tables),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let tables = self.tables.read().await;
        f(&tables)
    }

    /// Run `f` against a draft of the tables and commit it when `f` succeeds.
    pub async fn write<R, E>(&self, f: impl FnOnce(&mut Tables) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let mut tables = self.tables.write().await;
        let mut draft = tables.clone();
        let result = f(&mut draft)?;
        if let Some(path) = &self.path {
            draft = save_blocking(path.clone(), draft).await?;
        }
        *tables = draft;
        Ok(result)
    }

    /// Save the current tables to the snapshot file, if there is one.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let tables = self.tables.read().await;
        match &self.path {
            Some(path) => save_blocking(path.clone(), tables.clone()).await.map(|_| ()),
            None => Ok(()),
        }
    }
}

/// Write the snapshot on the blocking pool and hand the tables back.
async fn save_blocking(path: PathBuf, tables: Tables) -> Result<Tables, StoreError> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || snapshot::save(&path, &tables).map(|()| tables))
        .await
        .map_err(|e| StoreError::Io {
            path: target,
            source: std::io::Error::other(e),
        })?
}

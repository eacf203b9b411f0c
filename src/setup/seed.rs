//! Reference data for a fresh installation.
//!
//! Every row is looked up by its natural key first, so seeding an already
//! seeded store changes nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::auth::{hash_password, AuthError};
use crate::models::accounts::{Farmer, Role, User};
use crate::models::batches::Batch;
use crate::models::breeds::{
    ActivityType, Breed, BreedFeeding, BreedGrowth, BreedType, ConditionType, FoodType,
    DEFAULT_BREED_PHOTO,
};
use crate::models::farms::{
    Device, Farm, FarmMembership, MembershipRole, DEFAULT_DEVICE_PICTURE,
};
use crate::models::money::Money;
use crate::models::sensors::{Reading, SensorType};
use crate::models::subscriptions::{
    Resource, ResourceCategory, ResourceType, SubscriptionType, Tier,
};
use crate::store::{Record, Stored, Tables};

/// Rows created per kind; kinds that were already complete are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub created: BTreeMap<&'static str, usize>,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.created.values().sum()
    }

    /// Add the counts of `other` to this report.
    pub fn absorb(&mut self, other: SeedReport) {
        for (kind, n) in other.created {
            *self.created.entry(kind).or_default() += n;
        }
    }
}

struct Seeder<'a> {
    tables: &'a mut Tables,
    report: SeedReport,
}

impl Seeder<'_> {
    /// Return the id of the first row matching `existing`, inserting `row` otherwise.
    fn get_or_create<T: Stored>(&mut self, existing: impl Fn(&T) -> bool, row: impl FnOnce() -> T) -> i64 {
        if let Some(found) = self.tables.of::<T>().find(|r| existing(r)) {
            return found.id();
        }
        *self.report.created.entry(T::KIND).or_default() += 1;
        self.tables.insert(row()).id()
    }
}

fn plan(name: &str, tier: Tier, farm_size: &str, cost: i64, description: &str) -> SubscriptionType {
    SubscriptionType {
        id: 0,
        name: name.to_string(),
        tier,
        farm_size: farm_size.to_string(),
        cost: Money::from_units(cost),
        max_hardware_nodes: 1,
        max_software_services: 1,
        includes_predictions: tier == Tier::Premium,
        includes_analytics: tier > Tier::Individual,
        description: description.to_string(),
    }
}

fn resource(name: &str, resource_type: ResourceType, category: ResourceCategory, unit_cost: i64, now: DateTime<Utc>) -> Resource {
    Resource {
        id: 0,
        name: name.to_string(),
        resource_type,
        category,
        unit_cost: Money::from_units(unit_cost),
        status: true,
        is_basic: false,
        description: String::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn seed_subscriptions(t: &mut Tables, now: DateTime<Utc>) -> SeedReport {
    let mut s = Seeder { tables: t, report: SeedReport::default() };

    for (name, tier, size, cost, description) in [
        ("Starter", Tier::Individual, "Small", 0, "Free tier"),
        ("Pro", Tier::Normal, "Medium", 29900, "Pro features"),
        ("Enterprise", Tier::Premium, "Large", 99900, "All features"),
    ] {
        s.get_or_create(
            |p: &SubscriptionType| p.name == name,
            || plan(name, tier, size, cost, description),
        );
    }

    for (name, resource_type, category, cost) in [
        ("Smart Device", ResourceType::Hardware, ResourceCategory::Thermal, 150000),
        ("Advanced Analytics", ResourceType::Analytics, ResourceCategory::Analytics, 59000),
        ("Prediction Engine", ResourceType::Prediction, ResourceCategory::Prediction, 79000),
    ] {
        s.get_or_create(
            |r: &Resource| r.name == name,
            || resource(name, resource_type, category, cost, now),
        );
    }
    s.report
}

pub fn seed_sensors(t: &mut Tables) -> SeedReport {
    let mut s = Seeder { tables: t, report: SeedReport::default() };
    for (name, unit) in [("Temperature", "C"), ("Humidity", "%"), ("CO2", "ppm"), ("Ammonia", "ppm")] {
        s.get_or_create(
            |st: &SensorType| st.name == name,
            || SensorType { id: 0, name: name.to_string(), unit: unit.to_string() },
        );
    }
    s.report
}

pub fn seed_breeds(t: &mut Tables) -> SeedReport {
    let mut s = Seeder { tables: t, report: SeedReport::default() };

    for name in ["Broiler", "Kroiler"] {
        s.get_or_create(
            |b: &BreedType| b.breed_type == name,
            || BreedType { id: 0, breed_type: name.to_string() },
        );
    }
    let kroiler = s.get_or_create(
        |b: &BreedType| b.breed_type == "Kroiler",
        || BreedType { id: 0, breed_type: "Kroiler".to_string() },
    );

    for name in ["Feeding", "Vaccination"] {
        s.get_or_create(
            |a: &ActivityType| a.activity_type == name,
            || ActivityType { id: 0, activity_type: name.to_string() },
        );
    }
    for (name, unit) in [("Temperature", "C"), ("Humidity", "%")] {
        s.get_or_create(
            |c: &ConditionType| c.condition_name == name,
            || ConditionType { id: 0, condition_name: name.to_string(), condition_unit: unit.to_string() },
        );
    }
    let starter = s.get_or_create(
        |f: &FoodType| f.food_name == "Starter",
        || FoodType { id: 0, food_name: "Starter".to_string() },
    );
    s.get_or_create(
        |f: &FoodType| f.food_name == "Grower",
        || FoodType { id: 0, food_name: "Grower".to_string() },
    );

    let cobb = s.get_or_create(
        |b: &Breed| b.breed_name == "Cobb 500",
        || Breed {
            id: 0,
            breed_name: "Cobb 500".to_string(),
            breed_type: kroiler,
            preedphoto: DEFAULT_BREED_PHOTO.to_string(),
        },
    );
    // An existing Cobb 500 is moved under Kroiler
    if let Some(breed) = s.tables.breeds.get_mut(cobb) {
        breed.breed_type = kroiler;
    }

    for (age, quantity) in [(1, 25), (7, 45)] {
        s.get_or_create(
            |f: &BreedFeeding| f.breed == cobb && f.food_type == starter && f.age == age,
            || BreedFeeding {
                id: 0,
                breed: cobb,
                food_type: starter,
                age,
                quantity,
                frequency: 3,
                breed_feed_status: 1,
            },
        );
    }
    for (age, min_weight) in [(7, 180), (14, 420), (21, 750)] {
        s.get_or_create(
            |g: &BreedGrowth| g.breed == cobb && g.age == age,
            || BreedGrowth { id: 0, breed: cobb, age, min_weight },
        );
    }
    s.report
}

/// All reference data in one pass.
pub fn seed_all(t: &mut Tables, now: DateTime<Utc>) -> SeedReport {
    let mut report = SeedReport::default();
    for part in [seed_subscriptions(t, now), seed_sensors(t), seed_breeds(t)] {
        report.absorb(part);
    }
    log::info!("Seeded {} reference rows", report.total());
    report
}

pub const DEMO_USERNAME: &str = "demo_farmer";
pub const DEMO_PASSWORD: &str = "demo12345";
const DEMO_EMAIL: &str = "demo_farmer@example.com";
const DEMO_FARM: &str = "Demo Farm";
const DEMO_DEVICE: &str = "DEV-001";

/// Attach a farmer profile to `admin_username`, or to a `demo_farmer`
/// account created for the purpose when there is no such user.
pub fn seed_farmer(t: &mut Tables, admin_username: &str, now: DateTime<Utc>) -> Result<SeedReport, AuthError> {
    let mut s = Seeder { tables: t, report: SeedReport::default() };

    let existing = s
        .tables
        .user_by_username(admin_username)
        .or_else(|| s.tables.user_by_username(DEMO_USERNAME))
        .map(|u| u.id);
    let user = match existing {
        Some(id) => id,
        None => {
            let mut demo = User::new(DEMO_USERNAME, DEMO_EMAIL, now);
            demo.role = Role::Farmer;
            demo.password_hash = hash_password(DEMO_PASSWORD)?;
            s.get_or_create(|u: &User| u.username == DEMO_USERNAME, || demo)
        }
    };

    let email = s
        .tables
        .users
        .get(user)
        .map(|u| u.email.clone())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEMO_EMAIL.to_string());
    let farmer = s.get_or_create(
        |f: &Farmer| f.user == user,
        || Farmer {
            id: 0,
            user,
            farmer_name: "Demo Farmer".to_string(),
            address: "Demo Address".to_string(),
            email: email.clone(),
            phone: "+255700000000".to_string(),
            created_date: now.date_naive(),
        },
    );

    // An existing profile only gets its blank fields filled in
    if let Some(profile) = s.tables.farmers.get_mut(farmer) {
        for (field, default) in [
            (&mut profile.farmer_name, "Demo Farmer"),
            (&mut profile.address, "Demo Address"),
            (&mut profile.email, email.as_str()),
            (&mut profile.phone, "+255700000000"),
        ] {
            if field.trim().is_empty() {
                *field = default.to_string();
            }
        }
    }
    log::info!("Demo farmer {} is linked to user {}", farmer, user);
    Ok(s.report)
}

/// A demo farm owned by the first farmer, holding one batch of the first breed
/// that arrived today. Skipped until a farmer and a breed exist.
pub fn seed_batches(t: &mut Tables, now: DateTime<Utc>) -> SeedReport {
    let mut s = Seeder { tables: t, report: SeedReport::default() };
    let farmer = s.tables.farmers.iter().next().map(|f| f.id);
    let breed = s.tables.breeds.iter().next().map(|b| b.id);
    let (Some(farmer), Some(breed)) = (farmer, breed) else {
        log::warn!("Skipping demo batch: need at least one farmer and one breed");
        return s.report;
    };

    let owned: Vec<i64> = s
        .tables
        .memberships
        .iter()
        .filter(|m| m.farmer == farmer)
        .map(|m| m.farm)
        .collect();
    let farm = s.get_or_create(
        |f: &Farm| f.farm_name == DEMO_FARM && owned.contains(&f.id),
        || Farm {
            id: 0,
            farm_name: DEMO_FARM.to_string(),
            location: "HQ".to_string(),
            farm_size: "Small".to_string(),
        },
    );
    s.get_or_create(
        |m: &FarmMembership| m.farmer == farmer && m.farm == farm,
        || FarmMembership {
            id: 0,
            farmer,
            farm,
            role: MembershipRole::Owner,
            joined_at: now,
        },
    );

    let today = now.date_naive();
    s.get_or_create(
        |b: &Batch| b.farm == Some(farm) && b.breed == Some(breed) && b.arrive_date == today,
        || Batch {
            id: 0,
            farm: Some(farm),
            breed: Some(breed),
            arrive_date: today,
            init_age: 1,
            harvest_age: 42,
            quantity: 100,
            init_weight: 40,
            batch_status: 1,
        },
    );
    s.report
}

/// A demo device on the first farm with a few recent temperature and humidity
/// readings. Readings are only added while the device has none.
pub fn seed_devices_readings(t: &mut Tables, now: DateTime<Utc>) -> SeedReport {
    let mut s = Seeder { tables: t, report: SeedReport::default() };
    let Some(farm) = s.tables.farms.iter().next().map(|f| f.id) else {
        log::warn!("Skipping demo device: no farm found");
        return s.report;
    };

    let device = s.get_or_create(
        |d: &Device| d.device_id == DEMO_DEVICE,
        || Device {
            id: 0,
            farm,
            device_id: DEMO_DEVICE.to_string(),
            name: "Main Coop Sensor".to_string(),
            cell_no: "+255711111111".to_string(),
            picture: DEFAULT_DEVICE_PICTURE.to_string(),
            status: true,
        },
    );

    let sensor = |name: &str| s.tables.sensor_types.find(|st| st.name == name).map(|st| st.id);
    let (Some(temp), Some(humidity)) = (sensor("Temperature"), sensor("Humidity")) else {
        log::warn!("Skipping demo readings: seed the Temperature and Humidity sensor types first");
        return s.report;
    };
    if s.tables.readings.any(|r| r.device == device) {
        return s.report;
    }
    for (sensor_type, value, minutes_ago) in [
        (temp, 28.5, 15),
        (humidity, 62.0, 14),
        (temp, 29.0, 5),
        (humidity, 60.5, 4),
    ] {
        s.tables.insert(Reading {
            id: 0,
            device,
            sensor_type,
            value,
            timestamp: now - Duration::minutes(minutes_ago),
        });
        *s.report.created.entry(Reading::KIND).or_default() += 1;
    }
    s.report
}

/// Demo farmer, farm, batch, device and readings on top of the reference data.
pub fn seed_demo(t: &mut Tables, admin_username: &str, now: DateTime<Utc>) -> Result<SeedReport, AuthError> {
    let mut report = seed_farmer(t, admin_username, now)?;
    report.absorb(seed_batches(t, now));
    report.absorb(seed_devices_readings(t, now));
    log::info!("Seeded {} demo rows", report.total());
    Ok(report)
}

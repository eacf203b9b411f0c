//! Farms (scoped to the caller's memberships) and their devices.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::accounts::render_farmer;
use crate::models::farms::{Device, DeviceInput, Farm, FarmInput, FarmMembership, MembershipRole};
use crate::models::validation::{exists, not_blank, unique, FieldErrors};
use crate::server::crud::{Crud, Ctx};
use crate::server::errors::ApiError;
use crate::server::extract::Caller;
use crate::server::AppState;
use crate::store::Tables;

fn member_role(t: &Tables, caller: &Caller, farm_id: i64) -> Option<MembershipRole> {
    caller
        .farmer_id()
        .and_then(|farmer| t.membership(farmer, farm_id))
        .map(|m| m.role)
}

struct DeviceCounts {
    total: usize,
    active: usize,
}

fn device_counts(t: &Tables, farm_id: i64) -> DeviceCounts {
    DeviceCounts {
        total: t.devices.count(|d| d.farm == farm_id),
        active: t.devices.count(|d| d.farm == farm_id && d.status),
    }
}

fn farm_status(devices: &DeviceCounts, active_batches: usize) -> &'static str {
    if devices.total == 0 {
        "Setup Required"
    } else if devices.active == devices.total && active_batches > 0 {
        "Active"
    } else if devices.active > 0 {
        "Partial"
    } else {
        "Inactive"
    }
}

impl Crud for Farm {
    type Input = FarmInput;

    fn to_input(&self) -> FarmInput {
        Farm::to_input(self)
    }

    fn build(input: FarmInput, current: Option<&Self>, _ctx: &Ctx) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        not_blank(&mut errors, "farmName", &input.farm_name);
        if input.farm_size.trim().is_empty() {
            errors.add("farmSize", "Farm size is required.");
        }
        errors.into_result()?;
        Ok(Farm {
            id: current.map_or(0, |c| c.id),
            farm_name: input.farm_name,
            location: input.location,
            farm_size: input.farm_size,
        })
    }

    fn visible(&self, ctx: &Ctx) -> bool {
        member_role(ctx.tables, ctx.caller, self.id).is_some()
    }

    fn after_create(row: &Self, tables: &mut Tables, caller: &Caller, now: DateTime<Utc>) {
        if let Some(farmer) = caller.farmer_id() {
            tables.insert(FarmMembership {
                id: 0,
                farmer,
                farm: row.id,
                role: MembershipRole::Owner,
                joined_at: now,
            });
        }
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        let today = ctx.now.date_naive();
        let memberships: Vec<Value> = t
            .memberships
            .iter()
            .filter(|m| m.farm == self.id)
            .map(|m| {
                json!({
                    "id": m.id,
                    "farmer": t.farmers.get(m.farmer).map(|f| render_farmer(f, t, today)),
                    "role": m.role,
                    "joined_at": m.joined_at,
                })
            })
            .collect();
        let devices: Vec<Value> = t
            .devices
            .iter()
            .filter(|d| d.farm == self.id)
            .map(|d| {
                json!({
                    "deviceID": d.id,
                    "device_id": d.device_id,
                    "name": d.name,
                    "cell_no": d.cell_no,
                    "picture": d.picture,
                    "status": d.status,
                })
            })
            .collect();
        let counts = device_counts(t, self.id);
        let batches: Vec<_> = t.batches.iter().filter(|b| b.farm == Some(self.id)).collect();
        let active_batches = batches.iter().filter(|b| b.is_active()).count();
        let total_birds: i64 = batches.iter().filter(|b| b.is_active()).map(|b| b.quantity).sum();
        let last_activity = batches.iter().map(|b| b.arrive_date).max();

        json!({
            "farmID": self.id,
            "farmName": self.farm_name,
            "location": self.location,
            "farmSize": self.farm_size,
            "memberships": memberships,
            "devices": devices,
            "total_devices": counts.total,
            "active_devices": counts.active,
            "total_batches": batches.len(),
            "active_batches": active_batches,
            "total_birds": total_birds,
            "last_activity_date": last_activity,
            "farm_status": farm_status(&counts, active_batches),
            "myRole": member_role(t, ctx.caller, self.id),
        })
    }
}

/// Device counts of one farm plus the caller's role on it.
pub async fn farm_statistics(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .read(|t| {
            let role = member_role(t, &caller, id);
            if !t.farms.contains(id) || role.is_none() {
                return Err(ApiError::NotFound);
            }
            let counts = device_counts(t, id);
            Ok(Json(json!({
                "total_devices": counts.total,
                "active_devices": counts.active,
                "your_role": role,
            })))
        })
        .await
}

impl Crud for Device {
    type Input = DeviceInput;

    fn to_input(&self) -> DeviceInput {
        Device::to_input(self)
    }

    fn build(input: DeviceInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let device_id = input.device_id.trim().to_string();
        let mut errors = FieldErrors::new();
        if device_id.is_empty() {
            errors.add("device_id", "Device ID cannot be empty.");
        }
        unique(
            &mut errors,
            "device_id",
            t.devices
                .any(|d| d.device_id == device_id && Some(d.id) != current.map(|c| c.id)),
            "device",
        );
        exists(&mut errors, "farmID", input.farm, t.farms.contains(input.farm));
        not_blank(&mut errors, "name", &input.name);
        errors.into_result()?;

        Ok(Device {
            id: current.map_or(0, |c| c.id),
            farm: input.farm,
            device_id,
            name: input.name,
            cell_no: input.cell_no,
            picture: input.picture,
            status: input.status,
        })
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        let last_reading = t
            .readings
            .iter()
            .filter(|r| r.device == self.id)
            .max_by_key(|r| (r.timestamp, r.id))
            .map(|r| {
                json!({
                    "timestamp": r.timestamp,
                    "value": r.value,
                    "unit": t.sensor_types.get(r.sensor_type).map(|s| s.unit.as_str()),
                })
            });
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert(
                "farm_details".into(),
                t.farms
                    .get(self.farm)
                    .map(|f| json!({"farmID": f.id, "location": f.location, "farmName": f.farm_name}))
                    .unwrap_or(Value::Null),
            );
            map.insert("last_reading".into(), last_reading.unwrap_or(Value::Null));
            map.insert(
                "readings_count".into(),
                json!(t.readings.count(|r| r.device == self.id)),
            );
        }
        value
    }
}

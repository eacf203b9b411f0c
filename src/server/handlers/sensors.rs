//! Sensor types and device readings.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};

use super::{extend, filter_by, is_other, row_id};
use crate::models::sensors::{check_reading_value, Reading, ReadingInput, SensorType, SensorTypeInput};
use crate::models::validation::{exists, unique, FieldErrors};
use crate::server::crud::{Crud, Ctx, Params};
use crate::server::errors::ApiError;

impl Crud for SensorType {
    type Input = SensorTypeInput;
    const ADMIN_WRITE: bool = true;

    fn to_input(&self) -> SensorTypeInput {
        SensorTypeInput {
            name: self.name.clone(),
            unit: self.unit.clone(),
        }
    }

    fn build(input: SensorTypeInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let name = input.name.trim().to_string();
        let unit = input.unit.trim().to_string();
        let mut errors = FieldErrors::new();
        if name.is_empty() {
            errors.add("sensorTypeName", "Sensor type name cannot be empty.");
        }
        if unit.is_empty() {
            errors.add("measurementUnit", "Unit cannot be empty.");
        }
        unique(
            &mut errors,
            "sensorTypeName",
            ctx.tables
                .sensor_types
                .any(|s| s.name == name && is_other(s, current)),
            "sensor type",
        );
        errors.into_result()?;
        Ok(SensorType {
            id: row_id(current),
            name,
            unit,
        })
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        let readings: Vec<&Reading> = t.readings.iter().filter(|r| r.sensor_type == self.id).collect();
        let mut devices: Vec<i64> = readings
            .iter()
            .filter(|r| t.devices.get(r.device).is_some_and(|d| d.status))
            .map(|r| r.device)
            .collect();
        devices.sort_unstable();
        devices.dedup();
        let latest = readings.iter().map(|r| r.timestamp).max();
        let average = if readings.is_empty() {
            0.0
        } else {
            let sum: f64 = readings.iter().map(|r| r.value).sum();
            (sum / readings.len() as f64 * 100.0).round() / 100.0
        };
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "total_readings": readings.len(),
                "active_devices_count": devices.len(),
                "latest_reading_timestamp": latest,
                "avg_reading_value": average,
            }),
        )
    }
}

/// Accepts an RFC 3339 timestamp or a bare date (midnight UTC).
fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

fn within(params: &Params, timestamp: DateTime<Utc>) -> bool {
    let bound = |key: &str| params.get(key).map(|v| parse_instant(v));
    let after_start = match bound("from") {
        None => true,
        Some(from) => from.is_some_and(|from| timestamp >= from),
    };
    let before_end = match bound("to") {
        None => true,
        Some(to) => to.is_some_and(|to| timestamp <= to),
    };
    after_start && before_end
}

impl Crud for Reading {
    type Input = ReadingInput;

    fn to_input(&self) -> ReadingInput {
        ReadingInput {
            device: self.device,
            sensor_type: self.sensor_type,
            value: Some(self.value),
        }
    }

    fn build(input: ReadingInput, current: Option<&Self>, ctx: &Ctx) -> Result<Self, ApiError> {
        let t = ctx.tables;
        let mut errors = FieldErrors::new();
        exists(&mut errors, "deviceID", input.device, t.devices.contains(input.device));
        let sensor_type = t.sensor_types.get(input.sensor_type);
        exists(&mut errors, "sensor_typeID", input.sensor_type, sensor_type.is_some());
        let value = match input.value {
            Some(value) => value,
            None => {
                errors.add("value", "This field is required.");
                0.0
            }
        };
        if let (Some(sensor_type), Some(_)) = (sensor_type, input.value) {
            if let Err(message) = check_reading_value(sensor_type, value) {
                errors.add("value", message);
            }
        }
        errors.into_result()?;
        Ok(Reading {
            id: row_id(current),
            device: input.device,
            sensor_type: input.sensor_type,
            value,
            timestamp: current.map_or(ctx.now, |c| c.timestamp),
        })
    }

    fn matches(&self, params: &Params, _ctx: &Ctx) -> bool {
        filter_by(params, "device", self.device)
            && filter_by(params, "sensor_type", self.sensor_type)
            && within(params, self.timestamp)
    }

    fn sort(rows: &mut Vec<&Self>) {
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    }

    fn render(&self, ctx: &Ctx) -> Value {
        let t = ctx.tables;
        let device = t.devices.get(self.device).map(|d| {
            json!({
                "deviceID": d.id,
                "device_id": d.device_id,
                "name": d.name,
                "cell_no": d.cell_no,
                "picture": d.picture,
                "status": d.status,
            })
        });
        extend(
            serde_json::to_value(self).unwrap_or(Value::Null),
            json!({
                "device_detail": device,
                "sensor_type_detail": t.sensor_types.get(self.sensor_type).map(|s| s.render(ctx)),
            }),
        )
    }
}

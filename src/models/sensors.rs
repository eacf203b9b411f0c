use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::impl_record;

/// Bounds a temperature reading must fall within.
pub const TEMPERATURE_RANGE: (f64, f64) = (-50.0, 100.0);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorType {
    #[serde(rename = "sensorTypeID")]
    pub id: i64,
    #[serde(rename = "sensorTypeName")]
    pub name: String,
    #[serde(rename = "measurementUnit")]
    pub unit: String,
}

impl_record!(SensorType, "sensor type");

impl SensorType {
    pub fn is_temperature(&self) -> bool {
        self.name.to_lowercase().contains("temp")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SensorTypeInput {
    #[serde(rename = "sensorTypeName", default)]
    #[validate(length(max = 50, message = "Ensure this field has no more than 50 characters."))]
    pub name: String,
    #[serde(rename = "measurementUnit", default)]
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "readingID")]
    pub id: i64,
    #[serde(rename = "deviceID")]
    pub device: i64,
    #[serde(rename = "sensor_typeID")]
    pub sensor_type: i64,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl_record!(Reading, "reading");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ReadingInput {
    #[serde(rename = "deviceID", default)]
    pub device: i64,
    #[serde(rename = "sensor_typeID", default)]
    pub sensor_type: i64,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Check a value against the bounds of its sensor type.
pub fn check_reading_value(sensor_type: &SensorType, value: f64) -> Result<(), String> {
    let (min, max) = TEMPERATURE_RANGE;
    if !value.is_finite() {
        return Err("A valid number is required.".to_string());
    }
    if sensor_type.is_temperature() && (value < min || value > max) {
        return Err("Temperature value out of range (-50 to 100).".to_string());
    }
    Ok(())
}

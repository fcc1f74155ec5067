// Reading domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Numeric telemetry captured by the pond controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorMetrics {
    pub pv_voltage: f64,
    pub pv_current: f64,
    pub pv_power: f64,
    pub battery_voltage: f64,
    pub battery_current: f64,
    pub battery_percentage: f64,
    pub load_voltage: f64,
    pub load_current: f64,
    pub load_power: f64,
    pub water_temperature: f64,
    pub ph: f64,
    pub dissolved_oxygen: f64,
    pub turbidity: f64,
}

/// One snapshot of telemetry for a pond.
///
/// The timestamp is left empty by producers and assigned by the sender when
/// the reading is submitted. Stamping returns a new value rather than
/// mutating the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub code: String,
    #[serde(rename = "iduser", deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(flatten)]
    pub metrics: SensorMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Reading {
    pub fn new(code: String, user_id: String, metrics: SensorMetrics) -> Self {
        Self {
            code,
            user_id,
            metrics,
            timestamp: None,
        }
    }

    pub fn stamped(self, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(at),
            ..self
        }
    }
}

// The latest-reading endpoint has been seen returning numeric user ids.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

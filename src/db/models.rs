use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;

/// Id of the single incubator this deployment monitors.
pub const INCUBATOR_ID: i64 = 1;

/// Id of the singleton `notification_config` row.
pub const NOTIFICATION_CONFIG_ID: i64 = 1;

/// Password assigned on creation and on reset.
pub const DEFAULT_PASSWORD: &str = "123456789";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Mirrors the `components.kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Sensor,
    Actuator,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComponentKind::Sensor => "sensor",
            ComponentKind::Actuator => "actuator",
        })
    }
}

/// Quantity a threshold log refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    Temperature,
    Humidity,
}

impl Measurement {
    pub fn unit(self) -> &'static str {
        match self {
            Measurement::Temperature => "°C",
            Measurement::Humidity => "%",
        }
    }

    /// Capitalised name used at the start of alert messages.
    pub fn label(self) -> &'static str {
        match self {
            Measurement::Temperature => "Temperature",
            Measurement::Humidity => "Humidity",
        }
    }
}

/// Which side of a bound a reading fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Above,
    Below,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Condition::Above => "above",
            Condition::Below => "below",
        })
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub second_last_name: Option<String>,
    pub phone: String,
    pub email: String,
    /// Stored as plaintext, never serialised.
    pub password: String,
    pub active: bool,
    pub role_id: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Component {
    pub id: i64,
    pub name: String,
    pub kind: ComponentKind,
    pub active: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct IncubatorInfo {
    pub id: i64,
    pub current_temperature: f64,
    pub current_humidity: f64,
    pub sensor_ids: Json<Vec<i64>>,
    pub actuator_ids: Json<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct NotificationConfig {
    pub id: i64,
    pub incubator_id: i64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
}

impl NotificationConfig {
    /// `(min, max)` bounds configured for `measurement`.
    pub fn bounds(&self, measurement: Measurement) -> (f64, f64) {
        match measurement {
            Measurement::Temperature => (self.temperature_min, self.temperature_max),
            Measurement::Humidity => (self.humidity_min, self.humidity_max),
        }
    }
}

/// One row of `temperature_history` or `humidity_history`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct HistoryReading {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub value: f64,
    pub component_id: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct ActuatorAlert {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub component_id: i64,
    pub incubator_id: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct ThresholdLog {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub measurement: Measurement,
    pub value: f64,
    pub threshold: f64,
    pub condition: Condition,
    pub component_id: i64,
    pub incubator_id: i64,
}

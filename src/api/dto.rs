use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    alerts::{AlertSource, Severity},
    db::models::{ComponentKind, Condition, IncubatorInfo, Measurement, User},
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A user as exposed by the API. The password never leaves the server.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub second_last_name: Option<String>,
    pub phone: String,
    pub email: String,
    pub active: bool,
    pub role_id: i64,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            second_last_name: u.second_last_name,
            phone: u.phone,
            email: u.email,
            active: u.active,
            role_id: u.role_id,
        }
    }
}

/// Request body for `POST /users`.
///
/// Every field except `second_last_name` is required; they are optional here
/// so a missing one produces a 400 naming the field rather than a generic
/// deserialisation error.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub second_last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<i64>,
}

/// Request body for `PUT /users/{id}`. Absent fields are left unchanged; an
/// empty `second_last_name` clears it.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub second_last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
    pub role_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserCreatedResponse {
    pub message: String,
    pub user: UserDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PasswordResetResponse {
    pub message: String,
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Request body for `PUT /components/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateComponentRequest {
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Request body for `PUT /alerts/config`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AlertConfigRequest {
    /// °C, within [25, 35]
    pub temperature_min: f64,
    pub temperature_max: f64,
    /// %, within [60, 80]
    pub humidity_min: f64,
    pub humidity_max: f64,
}

/// Entry of `GET /alerts/active`: either a threshold log or an actuator
/// activation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActiveAlertDto {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub component_id: i64,
    pub component_name: String,
    pub severity: Severity,
    pub message: String,
    pub source: AlertSource,
}

/// Entry of `GET /alerts/history`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActuatorAlertDto {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub actuator_id: i64,
    pub actuator_name: String,
    pub severity: Severity,
    pub message: String,
}

/// Entry of `GET /alerts/thresholds`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThresholdAlertDto {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub measurement: Measurement,
    pub value: f64,
    pub threshold: f64,
    pub condition: Condition,
    pub component_id: i64,
    pub component_name: String,
    pub message: String,
}

/// Entry of `GET /alerts/notifications`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationDto {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub measurement: Measurement,
    pub value: f64,
    pub threshold: f64,
    pub condition: Condition,
    pub component_id: i64,
    pub incubator_id: i64,
    pub component_name: String,
    /// Absent when the component is unknown.
    pub component_kind: Option<ComponentKind>,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IncubatorInfoDto {
    pub id: i64,
    pub current_temperature: f64,
    pub current_humidity: f64,
    pub sensor_ids: Vec<i64>,
    pub actuator_ids: Vec<i64>,
}

impl From<IncubatorInfo> for IncubatorInfoDto {
    fn from(i: IncubatorInfo) -> Self {
        Self {
            id: i.id,
            current_temperature: i.current_temperature,
            current_humidity: i.current_humidity,
            sensor_ids: i.sensor_ids.0,
            actuator_ids: i.actuator_ids.0,
        }
    }
}

/// On/off state of the well-known devices.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SensorStatusDto {
    pub dht11_a: bool,
    pub dht11_b: bool,
    pub heater: bool,
    pub humidifier: bool,
    pub fan: bool,
}

pub mod alerts;
pub mod components;
pub mod dashboard;
pub mod ingest;
pub mod users;

#[cfg(test)]
mod test_support;

use std::collections::HashMap;

use sqlx::SqlitePool;
use utoipa::OpenApi;

use super::dto::{
    ActiveAlertDto, ActuatorAlertDto, AlertConfigRequest, CreateUserRequest, IncubatorInfoDto,
    MessageResponse, NotificationDto, PasswordResetResponse, SensorStatusDto, ThresholdAlertDto,
    UpdateComponentRequest, UpdateUserRequest, UserCreatedResponse, UserDto,
};
use crate::{
    alerts::{AlertSource, Severity},
    db::models::{
        ActuatorAlert, Component, ComponentKind, Condition, HistoryReading, Measurement,
        NotificationConfig, Role, ThresholdLog,
    },
    history::{ExportRow, HourlyPoint},
    ingest::{IngestOutcome, NewActuatorAlert, NewReadings},
};

/// Every component keyed by id. The table holds a handful of devices, so
/// handlers that need names load all of it.
pub(crate) async fn components_by_id(
    pool: &SqlitePool,
) -> Result<HashMap<i64, Component>, sqlx::Error> {
    let rows = sqlx::query_as::<_, Component>("SELECT id, name, kind, active FROM components")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|c| (c.id, c)).collect())
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        users::list_users,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::reset_password,
        components::list_roles,
        components::list_components,
        components::update_component,
        alerts::get_alert_config,
        alerts::save_alert_config,
        alerts::get_active_alerts,
        alerts::get_actuator_history,
        alerts::get_threshold_alerts,
        alerts::get_notifications,
        dashboard::get_current,
        dashboard::get_sensor_status,
        dashboard::get_historical,
        dashboard::export_data,
        ingest::post_readings,
        ingest::post_actuator_alert,
        health,
    ),
    components(schemas(
        UserDto,
        CreateUserRequest,
        UpdateUserRequest,
        UserCreatedResponse,
        MessageResponse,
        PasswordResetResponse,
        Role,
        Component,
        ComponentKind,
        UpdateComponentRequest,
        NotificationConfig,
        AlertConfigRequest,
        ActiveAlertDto,
        ActuatorAlertDto,
        ThresholdAlertDto,
        NotificationDto,
        Severity,
        AlertSource,
        Measurement,
        Condition,
        IncubatorInfoDto,
        SensorStatusDto,
        HourlyPoint,
        ExportRow,
        NewReadings,
        NewActuatorAlert,
        IngestOutcome,
        HistoryReading,
        ThresholdLog,
        ActuatorAlert,
    )),
    tags(
        (name = "users",      description = "User management"),
        (name = "components", description = "Roles and incubator components"),
        (name = "alerts",     description = "Threshold configuration and alert feeds"),
        (name = "dashboard",  description = "Current state, history and export"),
        (name = "ingest",     description = "Sensor gateway endpoints"),
        (name = "system",     description = "System endpoints"),
    ),
    info(
        title = "Incubator Monitor API",
        version = "0.1.0",
        description = "REST API for insect-rearing incubator monitoring"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use tracing::info;

use super::components_by_id;
use crate::{
    alerts::{self, AlertSource, Severity},
    api::{
        dto::{
            ActiveAlertDto, ActuatorAlertDto, AlertConfigRequest, NotificationDto,
            ThresholdAlertDto,
        },
        errors::{AppError, AppJson},
        AppState,
    },
    db::models::{ActuatorAlert, NotificationConfig, ThresholdLog, INCUBATOR_ID, NOTIFICATION_CONFIG_ID},
};

const THRESHOLD_LOG_COLUMNS: &str =
    "id, recorded_at, measurement, value, threshold, condition, component_id, incubator_id";

/// Number of entries returned by `/alerts/notifications`.
const NOTIFICATION_LIMIT: i64 = 50;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Fetch the threshold configuration. Also served as `/dashboard/config`.
#[utoipa::path(
    get,
    path = "/alerts/config",
    responses(
        (status = 200, description = "Current thresholds", body = NotificationConfig),
        (status = 404, description = "No configuration saved yet"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "alerts"
)]
pub async fn get_alert_config(
    State(state): State<AppState>,
) -> Result<Json<NotificationConfig>, AppError> {
    let config = sqlx::query_as::<_, NotificationConfig>(
        "SELECT id, incubator_id, temperature_min, temperature_max, humidity_min, humidity_max \
         FROM notification_config WHERE id = ?1",
    )
    .bind(NOTIFICATION_CONFIG_ID)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("notification config not found"))?;

    Ok(Json(config))
}

/// Create or replace the threshold configuration. Every violated bound is
/// reported in `details`.
#[utoipa::path(
    put,
    path = "/alerts/config",
    request_body = AlertConfigRequest,
    responses(
        (status = 200, description = "Saved thresholds", body = NotificationConfig),
        (status = 400, description = "Thresholds out of range"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "alerts"
)]
pub async fn save_alert_config(
    State(state): State<AppState>,
    AppJson(req): AppJson<AlertConfigRequest>,
) -> Result<Json<NotificationConfig>, AppError> {
    let config = NotificationConfig {
        id: NOTIFICATION_CONFIG_ID,
        incubator_id: INCUBATOR_ID,
        temperature_min: req.temperature_min,
        temperature_max: req.temperature_max,
        humidity_min: req.humidity_min,
        humidity_max: req.humidity_max,
    };
    alerts::validate_config(&config).map_err(AppError::Validation)?;

    sqlx::query(
        "INSERT INTO notification_config \
         (id, incubator_id, temperature_min, temperature_max, humidity_min, humidity_max) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT (id) DO UPDATE SET \
             incubator_id    = excluded.incubator_id, \
             temperature_min = excluded.temperature_min, \
             temperature_max = excluded.temperature_max, \
             humidity_min    = excluded.humidity_min, \
             humidity_max    = excluded.humidity_max",
    )
    .bind(config.id)
    .bind(config.incubator_id)
    .bind(config.temperature_min)
    .bind(config.temperature_max)
    .bind(config.humidity_min)
    .bind(config.humidity_max)
    .execute(&state.pool)
    .await?;

    info!(
        temperature_min = config.temperature_min,
        temperature_max = config.temperature_max,
        humidity_min = config.humidity_min,
        humidity_max = config.humidity_max,
        "Notification thresholds saved"
    );
    Ok(Json(config))
}

// ---------------------------------------------------------------------------
// Alert feeds
// ---------------------------------------------------------------------------

/// Threshold logs and actuator activations from the configured window,
/// newest first.
#[utoipa::path(
    get,
    path = "/alerts/active",
    responses(
        (status = 200, description = "Recent alerts", body = Vec<ActiveAlertDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "alerts"
)]
pub async fn get_active_alerts(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActiveAlertDto>>, AppError> {
    let window = state.settings.active_alert_window_hours;
    let since = Duration::try_hours(window)
        .and_then(|span| Utc::now().checked_sub_signed(span))
        .ok_or_else(|| anyhow::anyhow!("alert window of {window} hours is out of range"))?;

    let logs = sqlx::query_as::<_, ThresholdLog>(&format!(
        "SELECT {THRESHOLD_LOG_COLUMNS} FROM threshold_logs \
         WHERE recorded_at >= ?1 ORDER BY recorded_at DESC"
    ))
    .bind(since)
    .fetch_all(&state.pool)
    .await?;

    let activations = sqlx::query_as::<_, ActuatorAlert>(
        "SELECT id, recorded_at, component_id, incubator_id FROM actuator_alerts \
         WHERE recorded_at >= ?1 ORDER BY recorded_at DESC",
    )
    .bind(since)
    .fetch_all(&state.pool)
    .await?;

    let components = components_by_id(&state.pool).await?;
    let name_of = |id: i64| components.get(&id).map(|c| c.name.clone());

    let mut feed: Vec<ActiveAlertDto> = logs
        .iter()
        .map(|log| ActiveAlertDto {
            id: log.id.to_string(),
            recorded_at: log.recorded_at,
            component_id: log.component_id,
            component_name: name_of(log.component_id)
                .unwrap_or_else(|| "Unknown component".to_owned()),
            severity: alerts::severity(log),
            message: alerts::threshold_message(log),
            source: AlertSource::Sensor,
        })
        .chain(activations.iter().map(|a| {
            let name = name_of(a.component_id);
            ActiveAlertDto {
                id: a.id.to_string(),
                recorded_at: a.recorded_at,
                component_id: a.component_id,
                component_name: name.clone().unwrap_or_else(|| "Unknown actuator".to_owned()),
                severity: Severity::Warning,
                message: alerts::actuator_activated_message(name.as_deref().unwrap_or("actuator")),
                source: AlertSource::Actuator,
            }
        }))
        .collect();

    feed.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    Ok(Json(feed))
}

/// Every actuator activation of the incubator, newest first.
#[utoipa::path(
    get,
    path = "/alerts/history",
    responses(
        (status = 200, description = "Actuator activations", body = Vec<ActuatorAlertDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "alerts"
)]
pub async fn get_actuator_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActuatorAlertDto>>, AppError> {
    let rows = sqlx::query_as::<_, ActuatorAlert>(
        "SELECT id, recorded_at, component_id, incubator_id FROM actuator_alerts \
         WHERE incubator_id = ?1 ORDER BY recorded_at DESC",
    )
    .bind(INCUBATOR_ID)
    .fetch_all(&state.pool)
    .await?;

    let components = components_by_id(&state.pool).await?;

    let history = rows
        .into_iter()
        .map(|a| {
            let name = components
                .get(&a.component_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("Actuator {}", a.component_id));
            ActuatorAlertDto {
                id: a.id,
                recorded_at: a.recorded_at,
                actuator_id: a.component_id,
                message: alerts::actuator_activation_message(&name),
                actuator_name: name,
                severity: Severity::Warning,
            }
        })
        .collect();

    Ok(Json(history))
}

/// Every threshold log, newest first.
#[utoipa::path(
    get,
    path = "/alerts/thresholds",
    responses(
        (status = 200, description = "Threshold alerts", body = Vec<ThresholdAlertDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "alerts"
)]
pub async fn get_threshold_alerts(
    State(state): State<AppState>,
) -> Result<Json<Vec<ThresholdAlertDto>>, AppError> {
    let logs = sqlx::query_as::<_, ThresholdLog>(&format!(
        "SELECT {THRESHOLD_LOG_COLUMNS} FROM threshold_logs ORDER BY recorded_at DESC"
    ))
    .fetch_all(&state.pool)
    .await?;

    let components = components_by_id(&state.pool).await?;

    let entries = logs
        .into_iter()
        .map(|log| ThresholdAlertDto {
            message: alerts::threshold_message(&log),
            component_name: components
                .get(&log.component_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("Component {}", log.component_id)),
            id: log.id,
            recorded_at: log.recorded_at,
            measurement: log.measurement,
            value: log.value,
            threshold: log.threshold,
            condition: log.condition,
            component_id: log.component_id,
        })
        .collect();

    Ok(Json(entries))
}

/// The latest threshold logs with the component they came from.
#[utoipa::path(
    get,
    path = "/alerts/notifications",
    responses(
        (status = 200, description = "Latest 50 threshold logs", body = Vec<NotificationDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "alerts"
)]
pub async fn get_notifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<NotificationDto>>, AppError> {
    let logs = sqlx::query_as::<_, ThresholdLog>(&format!(
        "SELECT {THRESHOLD_LOG_COLUMNS} FROM threshold_logs ORDER BY recorded_at DESC LIMIT ?1"
    ))
    .bind(NOTIFICATION_LIMIT)
    .fetch_all(&state.pool)
    .await?;

    let components = components_by_id(&state.pool).await?;

    let notifications = logs
        .into_iter()
        .map(|log| {
            let component = components.get(&log.component_id);
            NotificationDto {
                id: log.id,
                recorded_at: log.recorded_at,
                measurement: log.measurement,
                value: log.value,
                threshold: log.threshold,
                condition: log.condition,
                component_id: log.component_id,
                incubator_id: log.incubator_id,
                component_name: component
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| "Unknown component".to_owned()),
                component_kind: component.map(|c| c.kind),
            }
        })
        .collect();

    Ok(Json(notifications))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

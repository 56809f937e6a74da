use axum::{extract::State, http::StatusCode, Json};

use crate::{
    api::{errors::{AppError, AppJson}, AppState},
    db::models::ActuatorAlert,
    ingest::{IngestOutcome, IngestService, NewActuatorAlert, NewReadings},
};

/// Store a sensor reading, refresh the incubator snapshot and log any
/// threshold the values cross.
#[utoipa::path(
    post,
    path = "/readings",
    request_body = NewReadings,
    responses(
        (status = 201, description = "Reading stored", body = IngestOutcome),
        (status = 400, description = "No value given, or the component is not a sensor"),
        (status = 404, description = "Unknown component"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "ingest"
)]
pub async fn post_readings(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewReadings>,
) -> Result<(StatusCode, Json<IngestOutcome>), AppError> {
    let outcome = IngestService::new(state.pool).record_readings(req).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Log an actuator activation.
#[utoipa::path(
    post,
    path = "/actuator-alerts",
    request_body = NewActuatorAlert,
    responses(
        (status = 201, description = "Activation stored", body = ActuatorAlert),
        (status = 400, description = "The component is not an actuator"),
        (status = 404, description = "Unknown component"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "ingest"
)]
pub async fn post_actuator_alert(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewActuatorAlert>,
) -> Result<(StatusCode, Json<ActuatorAlert>), AppError> {
    let alert = IngestService::new(state.pool).record_actuator_alert(req).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::components_by_id;
use crate::{
    api::{
        dto::{IncubatorInfoDto, SensorStatusDto},
        errors::AppError,
        AppState,
    },
    config::Slot,
    db::models::{HistoryReading, IncubatorInfo, Measurement, INCUBATOR_ID},
    history::{self, ExportRow, HourlyPoint, TimeRange},
};

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub range: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub range: Option<String>,
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Readings of one history table recorded at or after `from` and, when
/// given, at or before `to`, ascending.
async fn fetch_history(
    pool: &SqlitePool,
    measurement: Measurement,
    from: DateTime<Utc>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<HistoryReading>, sqlx::Error> {
    let table = match measurement {
        Measurement::Temperature => "temperature_history",
        Measurement::Humidity => "humidity_history",
    };
    sqlx::query_as::<_, HistoryReading>(&format!(
        "SELECT id, recorded_at, value, component_id FROM {table} \
         WHERE recorded_at >= ?1 AND (?2 IS NULL OR recorded_at <= ?2) \
         ORDER BY recorded_at ASC"
    ))
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Current temperature/humidity of the incubator and its component lists.
#[utoipa::path(
    get,
    path = "/dashboard/current",
    responses(
        (status = 200, description = "Incubator snapshot", body = IncubatorInfoDto),
        (status = 404, description = "The incubator has not reported yet"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "dashboard"
)]
pub async fn get_current(State(state): State<AppState>) -> Result<Json<IncubatorInfoDto>, AppError> {
    let info = sqlx::query_as::<_, IncubatorInfo>(
        "SELECT id, current_temperature, current_humidity, sensor_ids, actuator_ids \
         FROM incubator_info WHERE id = ?1",
    )
    .bind(INCUBATOR_ID)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("incubator information not found"))?;

    Ok(Json(info.into()))
}

/// On/off state of the well-known devices. A slot whose component is missing
/// or of the wrong kind reports `false`.
#[utoipa::path(
    get,
    path = "/dashboard/sensors",
    responses(
        (status = 200, description = "Device status", body = SensorStatusDto),
        (status = 500, description = "Internal server error"),
    ),
    tag = "dashboard"
)]
pub async fn get_sensor_status(
    State(state): State<AppState>,
) -> Result<Json<SensorStatusDto>, AppError> {
    let components = components_by_id(&state.pool).await?;
    let status_of = |slot: Slot| {
        state
            .settings
            .component_slots
            .get(&slot)
            .and_then(|id| components.get(id))
            .filter(|c| c.kind == slot.expected_kind())
            .is_some_and(|c| c.active)
    };

    Ok(Json(SensorStatusDto {
        dht11_a: status_of(Slot::Dht11A),
        dht11_b: status_of(Slot::Dht11B),
        heater: status_of(Slot::Heater),
        humidifier: status_of(Slot::Humidifier),
        fan: status_of(Slot::Fan),
    }))
}

/// Hourly averages of temperature and humidity over the selected window
/// (`24h`, `7d` or `30d`; anything else means `24h`).
#[utoipa::path(
    get,
    path = "/dashboard/historical",
    params(
        ("range" = Option<String>, Query, description = "24h | 7d | 30d"),
    ),
    responses(
        (status = 200, description = "Hourly averages, ascending", body = Vec<HourlyPoint>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "dashboard"
)]
pub async fn get_historical(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<HourlyPoint>>, AppError> {
    let range = TimeRange::parse_or_default(params.range.as_deref());
    let now = Utc::now();
    let from = range.start(now);

    let (temperatures, humidities) = tokio::try_join!(
        fetch_history(&state.pool, Measurement::Temperature, from, Some(now)),
        fetch_history(&state.pool, Measurement::Humidity, from, Some(now)),
    )?;
    debug!(
        range = range.as_str(),
        temperatures = temperatures.len(),
        humidities = humidities.len(),
        "Loaded history"
    );

    Ok(Json(history::hourly_averages(range, &temperatures, &humidities)))
}

/// Download readings since the start of the window as CSV or JSON.
#[utoipa::path(
    get,
    path = "/dashboard/export",
    params(
        ("range"  = Option<String>, Query, description = "24h | 7d | 30d"),
        ("format" = Option<String>, Query, description = "csv | json (default)"),
    ),
    responses(
        (status = 200, description = "Readings merged per timestamp, ascending", body = Vec<ExportRow>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "dashboard"
)]
pub async fn export_data(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, AppError> {
    let range = TimeRange::parse_or_default(params.range.as_deref());
    let from = range.start(Utc::now());

    let (temperatures, humidities) = tokio::try_join!(
        fetch_history(&state.pool, Measurement::Temperature, from, None),
        fetch_history(&state.pool, Measurement::Humidity, from, None),
    )?;
    let rows = history::combine_by_timestamp(&temperatures, &humidities);

    let filename = format!("incubator_data_{}", range.as_str());
    let as_csv = params.format.as_deref() == Some("csv");
    info!(range = range.as_str(), rows = rows.len(), csv = as_csv, "Exporting history");

    let response = if as_csv {
        (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}.csv\""),
                ),
            ],
            history::to_csv(&rows),
        )
            .into_response()
    } else {
        (
            [(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}.json\""),
            )],
            Json(rows),
        )
            .into_response()
    };
    Ok(response)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::Value;
    use sqlx::SqlitePool;

    use super::super::test_support::{insert_history, test_server, test_server_with};
    use crate::{api::ApiSettings, config::Slot, history::truncate_to_hour};

    // -----------------------------------------------------------------------
    // GET /dashboard/current
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn current_missing_is_not_found(pool: SqlitePool) {
        let server = test_server(pool);
        server
            .get("/dashboard/current")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn current_returns_snapshot(pool: SqlitePool) {
        sqlx::query(
            "INSERT INTO incubator_info \
             (id, current_temperature, current_humidity, sensor_ids, actuator_ids) \
             VALUES (1, 27.5, 68.0, '[1,2]', '[3,4,5]')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let server = test_server(pool);
        let resp = server.get("/dashboard/current").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["current_temperature"], 27.5);
        assert_eq!(body["current_humidity"], 68.0);
        assert_eq!(body["sensor_ids"], serde_json::json!([1, 2]));
        assert_eq!(body["actuator_ids"], serde_json::json!([3, 4, 5]));
    }

    // -----------------------------------------------------------------------
    // GET /dashboard/sensors
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn sensor_status_reflects_component_flags(pool: SqlitePool) {
        sqlx::query("UPDATE components SET active = 1 WHERE id = 5")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE components SET active = 0 WHERE id = 2")
            .execute(&pool)
            .await
            .unwrap();

        let server = test_server(pool);
        let body: Value = server.get("/dashboard/sensors").await.json();
        assert_eq!(body["dht11_a"], true);
        assert_eq!(body["dht11_b"], false);
        assert_eq!(body["heater"], true);
        assert_eq!(body["humidifier"], false);
        assert_eq!(body["fan"], false);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn sensor_status_ignores_missing_or_mismatched_components(pool: SqlitePool) {
        let mut settings = ApiSettings::default();
        // A sensor in an actuator slot, and a slot pointing nowhere.
        settings.component_slots.insert(Slot::Heater, 1);
        settings.component_slots.insert(Slot::Dht11B, 404);

        let server = test_server_with(pool, settings);
        let body: Value = server.get("/dashboard/sensors").await.json();
        assert_eq!(body["dht11_a"], true);
        assert_eq!(body["dht11_b"], false);
        assert_eq!(body["heater"], false);
    }

    // -----------------------------------------------------------------------
    // GET /dashboard/historical
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn historical_empty_returns_empty_array(pool: SqlitePool) {
        let server = test_server(pool);
        let body: Value = server.get("/dashboard/historical").await.json();
        assert_eq!(body, serde_json::json!([]));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn historical_averages_per_hour(pool: SqlitePool) {
        let base = truncate_to_hour(Utc::now()) - Duration::hours(3);
        insert_history(&pool, "temperature_history", base + Duration::minutes(5), 26.0, 1).await;
        insert_history(&pool, "temperature_history", base + Duration::minutes(20), 28.0, 2).await;
        insert_history(&pool, "humidity_history", base + Duration::minutes(30), 70.0, 1).await;
        insert_history(&pool, "humidity_history", base + Duration::minutes(45), 75.0, 2).await;
        insert_history(&pool, "temperature_history", base + Duration::minutes(70), 30.0, 1).await;

        let server = test_server(pool);
        let resp = server
            .get("/dashboard/historical")
            .add_query_param("range", "24h")
            .await;
        resp.assert_status_ok();

        let body: Vec<Value> = resp.json();
        assert_eq!(body.len(), 2);

        assert_eq!(body[0]["temperature"], 27.0);
        assert_eq!(body[0]["humidity"], 72.5);
        assert_eq!(body[0]["temperature_count"], 2);
        assert_eq!(body[0]["humidity_count"], 2);
        assert_eq!(body[0]["time"], base.format("%H:00").to_string());

        assert_eq!(body[1]["temperature"], 30.0);
        assert!(body[1]["humidity"].is_null());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn historical_respects_window(pool: SqlitePool) {
        let now = Utc::now();
        insert_history(&pool, "temperature_history", now - Duration::hours(2), 27.0, 1).await;
        insert_history(&pool, "temperature_history", now - Duration::days(3), 26.0, 1).await;
        insert_history(&pool, "temperature_history", now - Duration::days(20), 25.0, 1).await;
        insert_history(&pool, "temperature_history", now + Duration::hours(2), 29.0, 1).await;

        let server = test_server(pool);
        let day: Vec<Value> = server.get("/dashboard/historical").await.json();
        assert_eq!(day.len(), 1);

        let week: Vec<Value> = server
            .get("/dashboard/historical")
            .add_query_param("range", "7d")
            .await
            .json();
        assert_eq!(week.len(), 2);
        assert_eq!(week[0]["temperature"], 26.0);

        let month: Vec<Value> = server
            .get("/dashboard/historical")
            .add_query_param("range", "30d")
            .await
            .json();
        assert_eq!(month.len(), 3);
    }

    // -----------------------------------------------------------------------
    // GET /dashboard/export
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn export_json_is_attachment(pool: SqlitePool) {
        let ts = truncate_to_hour(Utc::now()) - Duration::hours(2);
        insert_history(&pool, "temperature_history", ts, 27.0, 1).await;
        insert_history(&pool, "temperature_history", ts, 28.0, 2).await;
        insert_history(&pool, "humidity_history", ts, 70.0, 1).await;

        let server = test_server(pool);
        let resp = server.get("/dashboard/export").await;
        resp.assert_status_ok();
        assert_eq!(
            resp.header("content-disposition"),
            "attachment; filename=\"incubator_data_24h.json\""
        );

        let body: Vec<Value> = resp.json();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["temperature"], 27.5);
        assert_eq!(body[0]["humidity"], 70.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn export_unknown_format_is_json(pool: SqlitePool) {
        let ts = truncate_to_hour(Utc::now()) - Duration::hours(1);
        insert_history(&pool, "temperature_history", ts, 27.0, 1).await;

        let server = test_server(pool);
        let resp = server
            .get("/dashboard/export")
            .add_query_param("format", "xml")
            .await;
        resp.assert_status_ok();
        assert_eq!(
            resp.header("content-disposition"),
            "attachment; filename=\"incubator_data_24h.json\""
        );

        let body: Vec<Value> = resp.json();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["temperature"], 27.0);
        assert_eq!(body[0]["humidity"], Value::Null);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn export_csv_renders_rows(pool: SqlitePool) {
        let ts = truncate_to_hour(Utc::now()) - Duration::hours(2);
        insert_history(&pool, "temperature_history", ts, 27.5, 1).await;
        insert_history(&pool, "humidity_history", ts, 70.0, 1).await;
        insert_history(&pool, "humidity_history", ts + Duration::seconds(30), 71.25, 2).await;

        let server = test_server(pool);
        let resp = server
            .get("/dashboard/export")
            .add_query_param("range", "7d")
            .add_query_param("format", "csv")
            .await;
        resp.assert_status_ok();
        assert!(resp
            .header("content-type")
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
        assert_eq!(
            resp.header("content-disposition"),
            "attachment; filename=\"incubator_data_7d.csv\""
        );

        let text = resp.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Date,Time,Temperature (°C),Humidity (%)");
        assert_eq!(
            lines[1],
            format!("{},{},27.5,70", ts.format("%d/%m/%Y"), ts.format("%H:%M:%S"))
        );
        assert!(lines[2].ends_with(",,71.25"));
    }
}

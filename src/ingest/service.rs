use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    alerts,
    db::models::{
        ActuatorAlert, Component, ComponentKind, HistoryReading, IncubatorInfo, Measurement,
        NotificationConfig, ThresholdLog, INCUBATOR_ID, NOTIFICATION_CONFIG_ID,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("reading must carry a temperature or a humidity value")]
    NoValues,
    #[error("component {0} not found")]
    UnknownComponent(i64),
    #[error("component {id} is not a {expected}")]
    WrongKind { id: i64, expected: ComponentKind },
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Request body for `POST /readings`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewReadings {
    pub component_id: i64,
    /// °C
    pub temperature: Option<f64>,
    /// %
    pub humidity: Option<f64>,
    /// Defaults to the time the request is received.
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Request body for `POST /actuator-alerts`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewActuatorAlert {
    pub component_id: i64,
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestOutcome {
    pub temperature: Option<HistoryReading>,
    pub humidity: Option<HistoryReading>,
    /// Threshold logs written because a value crossed a configured bound.
    pub threshold_logs: Vec<ThresholdLog>,
}

#[derive(Clone)]
pub struct IngestService {
    pool: SqlitePool,
}

impl IngestService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends the reading to the history tables, refreshes the incubator
    /// snapshot, and logs every threshold the values cross. All writes land
    /// in a single transaction.
    pub async fn record_readings(&self, req: NewReadings) -> Result<IngestOutcome, IngestError> {
        if req.temperature.is_none() && req.humidity.is_none() {
            return Err(IngestError::NoValues);
        }

        let mut tx = begin_write(&self.pool).await?;
        expect_component(&mut tx, req.component_id, ComponentKind::Sensor).await?;

        let recorded_at = req.recorded_at.unwrap_or_else(Utc::now);
        let config = sqlx::query_as::<_, NotificationConfig>(
            "SELECT id, incubator_id, temperature_min, temperature_max, humidity_min, humidity_max \
             FROM notification_config WHERE id = ?1",
        )
        .bind(NOTIFICATION_CONFIG_ID)
        .fetch_optional(&mut *tx)
        .await?;

        let mut outcome = IngestOutcome {
            temperature: None,
            humidity: None,
            threshold_logs: Vec::new(),
        };

        for (measurement, value) in [
            (Measurement::Temperature, req.temperature),
            (Measurement::Humidity, req.humidity),
        ] {
            let Some(value) = value else { continue };

            let reading = HistoryReading {
                id: Uuid::new_v4(),
                recorded_at,
                value,
                component_id: req.component_id,
            };
            insert_history(&mut tx, measurement, &reading).await?;

            if let Some((condition, threshold)) =
                config.as_ref().and_then(|c| alerts::breach(c, measurement, value))
            {
                let log = ThresholdLog {
                    id: Uuid::new_v4(),
                    recorded_at,
                    measurement,
                    value,
                    threshold,
                    condition,
                    component_id: req.component_id,
                    incubator_id: INCUBATOR_ID,
                };
                insert_threshold_log(&mut tx, &log).await?;
                warn!(
                    component_id = req.component_id,
                    measurement = ?measurement,
                    value,
                    threshold,
                    "Threshold crossed"
                );
                outcome.threshold_logs.push(log);
            }

            match measurement {
                Measurement::Temperature => outcome.temperature = Some(reading),
                Measurement::Humidity => outcome.humidity = Some(reading),
            }
        }

        let mut snapshot = load_snapshot(&mut tx).await?;
        if let Some(t) = req.temperature {
            snapshot.current_temperature = t;
        }
        if let Some(h) = req.humidity {
            snapshot.current_humidity = h;
        }
        push_unique(&mut snapshot.sensor_ids, req.component_id);
        store_snapshot(&mut tx, &snapshot).await?;

        tx.commit().await?;

        info!(
            component_id = req.component_id,
            threshold_logs = outcome.threshold_logs.len(),
            "Readings stored"
        );
        Ok(outcome)
    }

    /// Logs an actuator activation for the incubator.
    pub async fn record_actuator_alert(
        &self,
        req: NewActuatorAlert,
    ) -> Result<ActuatorAlert, IngestError> {
        let mut tx = begin_write(&self.pool).await?;
        expect_component(&mut tx, req.component_id, ComponentKind::Actuator).await?;

        let recorded_at = req.recorded_at.unwrap_or_else(Utc::now);
        let id = sqlx::query(
            "INSERT INTO actuator_alerts (recorded_at, component_id, incubator_id) \
             VALUES (?1, ?2, ?3)",
        )
        .bind(recorded_at)
        .bind(req.component_id)
        .bind(INCUBATOR_ID)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let mut snapshot = load_snapshot(&mut tx).await?;
        push_unique(&mut snapshot.actuator_ids, req.component_id);
        store_snapshot(&mut tx, &snapshot).await?;

        tx.commit().await?;

        info!(component_id = req.component_id, alert_id = id, "Actuator activation stored");
        Ok(ActuatorAlert {
            id,
            recorded_at,
            component_id: req.component_id,
            incubator_id: INCUBATOR_ID,
        })
    }
}

/// Takes the write lock at `BEGIN` so a concurrent writer waits on the busy
/// timeout rather than failing its read-to-write upgrade with `SQLITE_BUSY`.
async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

async fn expect_component(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    expected: ComponentKind,
) -> Result<Component, IngestError> {
    let component = sqlx::query_as::<_, Component>(
        "SELECT id, name, kind, active FROM components WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(IngestError::UnknownComponent(id))?;

    if component.kind != expected {
        return Err(IngestError::WrongKind { id, expected });
    }
    Ok(component)
}

async fn insert_history(
    tx: &mut Transaction<'_, Sqlite>,
    measurement: Measurement,
    reading: &HistoryReading,
) -> Result<(), sqlx::Error> {
    let sql = match measurement {
        Measurement::Temperature => {
            "INSERT INTO temperature_history (id, recorded_at, value, component_id) \
             VALUES (?1, ?2, ?3, ?4)"
        }
        Measurement::Humidity => {
            "INSERT INTO humidity_history (id, recorded_at, value, component_id) \
             VALUES (?1, ?2, ?3, ?4)"
        }
    };
    sqlx::query(sql)
        .bind(reading.id)
        .bind(reading.recorded_at)
        .bind(reading.value)
        .bind(reading.component_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_threshold_log(
    tx: &mut Transaction<'_, Sqlite>,
    log: &ThresholdLog,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO threshold_logs \
         (id, recorded_at, measurement, value, threshold, condition, component_id, incubator_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(log.id)
    .bind(log.recorded_at)
    .bind(log.measurement)
    .bind(log.value)
    .bind(log.threshold)
    .bind(log.condition)
    .bind(log.component_id)
    .bind(log.incubator_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Current snapshot, or a zeroed one when the incubator has never reported.
async fn load_snapshot(tx: &mut Transaction<'_, Sqlite>) -> Result<IncubatorInfo, sqlx::Error> {
    let existing = sqlx::query_as::<_, IncubatorInfo>(
        "SELECT id, current_temperature, current_humidity, sensor_ids, actuator_ids \
         FROM incubator_info WHERE id = ?1",
    )
    .bind(INCUBATOR_ID)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(existing.unwrap_or_else(|| IncubatorInfo {
        id: INCUBATOR_ID,
        current_temperature: 0.0,
        current_humidity: 0.0,
        sensor_ids: Json(Vec::new()),
        actuator_ids: Json(Vec::new()),
    }))
}

async fn store_snapshot(
    tx: &mut Transaction<'_, Sqlite>,
    info: &IncubatorInfo,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO incubator_info \
         (id, current_temperature, current_humidity, sensor_ids, actuator_ids) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (id) DO UPDATE SET \
             current_temperature = excluded.current_temperature, \
             current_humidity    = excluded.current_humidity, \
             sensor_ids          = excluded.sensor_ids, \
             actuator_ids        = excluded.actuator_ids",
    )
    .bind(info.id)
    .bind(info.current_temperature)
    .bind(info.current_humidity)
    .bind(&info.sensor_ids)
    .bind(&info.actuator_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn push_unique(ids: &mut Json<Vec<i64>>, id: i64) {
    if !ids.0.contains(&id) {
        ids.0.push(id);
    }
}

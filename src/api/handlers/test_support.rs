use axum_test::TestServer;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::{router, ApiSettings, AppState};

pub fn test_server(pool: SqlitePool) -> TestServer {
    TestServer::new(router(AppState::new(pool, ApiSettings::default()))).unwrap()
}

pub fn test_server_with(pool: SqlitePool, settings: ApiSettings) -> TestServer {
    TestServer::new(router(AppState::new(pool, settings))).unwrap()
}

pub async fn insert_user(pool: &SqlitePool, id: i64, email: &str, phone: &str) {
    sqlx::query(
        "INSERT INTO users (id, first_name, last_name, phone, email, password, active, role_id) \
         VALUES (?1, 'Ana', 'Lopez', ?2, ?3, 'secret-pass', 1, 2)",
    )
    .bind(id)
    .bind(phone)
    .bind(email)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn insert_config(pool: &SqlitePool, t_min: f64, t_max: f64, h_min: f64, h_max: f64) {
    sqlx::query(
        "INSERT INTO notification_config \
         (id, incubator_id, temperature_min, temperature_max, humidity_min, humidity_max) \
         VALUES (1, 1, ?1, ?2, ?3, ?4)",
    )
    .bind(t_min)
    .bind(t_max)
    .bind(h_min)
    .bind(h_max)
    .execute(pool)
    .await
    .unwrap();
}

/// `table` is `temperature_history` or `humidity_history`.
pub async fn insert_history(
    pool: &SqlitePool,
    table: &str,
    recorded_at: DateTime<Utc>,
    value: f64,
    component_id: i64,
) {
    sqlx::query(&format!(
        "INSERT INTO {table} (id, recorded_at, value, component_id) VALUES (?1, ?2, ?3, ?4)"
    ))
    .bind(Uuid::new_v4())
    .bind(recorded_at)
    .bind(value)
    .bind(component_id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn insert_threshold_log(
    pool: &SqlitePool,
    recorded_at: DateTime<Utc>,
    measurement: &str,
    value: f64,
    threshold: f64,
    condition: &str,
    component_id: i64,
) {
    sqlx::query(
        "INSERT INTO threshold_logs \
         (id, recorded_at, measurement, value, threshold, condition, component_id, incubator_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
    )
    .bind(Uuid::new_v4())
    .bind(recorded_at)
    .bind(measurement)
    .bind(value)
    .bind(threshold)
    .bind(condition)
    .bind(component_id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn insert_actuator_alert(
    pool: &SqlitePool,
    recorded_at: DateTime<Utc>,
    component_id: i64,
    incubator_id: i64,
) {
    sqlx::query(
        "INSERT INTO actuator_alerts (recorded_at, component_id, incubator_id) VALUES (?1, ?2, ?3)",
    )
    .bind(recorded_at)
    .bind(component_id)
    .bind(incubator_id)
    .execute(pool)
    .await
    .unwrap();
}

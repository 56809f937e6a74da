pub mod dto;
pub mod errors;
pub mod handlers;

use std::{collections::HashMap, sync::Arc};

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::config::{Config, Slot};
use handlers::ApiDoc;

/// Request-independent knobs the handlers read.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub active_alert_window_hours: i64,
    pub component_slots: HashMap<Slot, i64>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            active_alert_window_hours: 24,
            component_slots: HashMap::from([
                (Slot::Dht11A, 1),
                (Slot::Dht11B, 2),
                (Slot::Humidifier, 3),
                (Slot::Fan, 4),
                (Slot::Heater, 5),
            ]),
        }
    }
}

impl From<&Config> for ApiSettings {
    fn from(c: &Config) -> Self {
        Self {
            active_alert_window_hours: c.active_alert_window_hours,
            component_slots: c.component_slots.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    pub fn new(pool: SqlitePool, settings: ApiSettings) -> Self {
        Self {
            pool,
            settings: Arc::new(settings),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/{id}",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )
        .route(
            "/users/{id}/reset-password",
            post(handlers::users::reset_password),
        )
        .route("/roles", get(handlers::components::list_roles))
        .route("/components", get(handlers::components::list_components))
        .route("/components/{id}", put(handlers::components::update_component))
        .route(
            "/alerts/config",
            get(handlers::alerts::get_alert_config).put(handlers::alerts::save_alert_config),
        )
        .route("/alerts/active", get(handlers::alerts::get_active_alerts))
        .route("/alerts/history", get(handlers::alerts::get_actuator_history))
        .route("/alerts/thresholds", get(handlers::alerts::get_threshold_alerts))
        .route("/alerts/notifications", get(handlers::alerts::get_notifications))
        .route("/dashboard/config", get(handlers::alerts::get_alert_config))
        .route("/dashboard/current", get(handlers::dashboard::get_current))
        .route("/dashboard/sensors", get(handlers::dashboard::get_sensor_status))
        .route("/dashboard/historical", get(handlers::dashboard::get_historical))
        .route("/dashboard/export", get(handlers::dashboard::export_data))
        .route("/readings", post(handlers::ingest::post_readings))
        .route("/actuator-alerts", post(handlers::ingest::post_actuator_alert))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}

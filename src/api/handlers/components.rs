use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::{
    api::{dto::UpdateComponentRequest, errors::{AppError, AppJson}, AppState},
    db::models::{Component, Role},
};

/// List the static role table.
#[utoipa::path(
    get,
    path = "/roles",
    responses(
        (status = 200, description = "All roles", body = Vec<Role>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "components"
)]
pub async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<Role>>, AppError> {
    let rows = sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY id")
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/components",
    responses(
        (status = 200, description = "All sensors and actuators", body = Vec<Component>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "components"
)]
pub async fn list_components(
    State(state): State<AppState>,
) -> Result<Json<Vec<Component>>, AppError> {
    let rows =
        sqlx::query_as::<_, Component>("SELECT id, name, kind, active FROM components ORDER BY id")
            .fetch_all(&state.pool)
            .await?;
    Ok(Json(rows))
}

/// Switch a component on or off.
#[utoipa::path(
    put,
    path = "/components/{id}",
    params(("id" = i64, Path, description = "Component id")),
    request_body = UpdateComponentRequest,
    responses(
        (status = 200, description = "Updated component", body = Component),
        (status = 404, description = "Component not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "components"
)]
pub async fn update_component(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppJson(req): AppJson<UpdateComponentRequest>,
) -> Result<Json<Component>, AppError> {
    let component = sqlx::query_as::<_, Component>(
        "UPDATE components SET active = ?1 WHERE id = ?2 RETURNING id, name, kind, active",
    )
    .bind(req.active)
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("component {id} not found")))?;

    info!(component_id = id, active = req.active, "Component state changed");
    Ok(Json(component))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use sqlx::SqlitePool;

    use super::super::test_support::test_server;

    #[sqlx::test(migrations = "./migrations")]
    async fn roles_are_seeded(pool: SqlitePool) {
        let server = test_server(pool);
        let resp = server.get("/roles").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(
            body,
            json!([
                { "id": 1, "name": "Administrator" },
                { "id": 2, "name": "User" },
            ])
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn components_are_listed_with_kind(pool: SqlitePool) {
        let server = test_server(pool);
        let body: Vec<Value> = server.get("/components").await.json();
        assert_eq!(body.len(), 5);
        assert_eq!(body[0]["name"], "DHT11 A");
        assert_eq!(body[0]["kind"], "sensor");
        assert_eq!(body[4]["name"], "Heater");
        assert_eq!(body[4]["kind"], "actuator");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn update_component_toggles_active(pool: SqlitePool) {
        let server = test_server(pool);
        let resp = server
            .put("/components/5")
            .json(&json!({ "active": true }))
            .await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["id"], 5);
        assert_eq!(body["name"], "Heater");
        assert_eq!(body["kind"], "actuator");
        assert_eq!(body["active"], true);

        let listed: Vec<Value> = server.get("/components").await.json();
        assert_eq!(listed[4]["active"], true);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn update_component_with_wrong_type_is_bad_request(pool: SqlitePool) {
        let server = test_server(pool);
        let resp = server
            .put("/components/5")
            .json(&json!({ "active": "yes" }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = resp.json();
        assert!(body["error"].is_string());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn update_unknown_component_is_not_found(pool: SqlitePool) {
        let server = test_server(pool);
        server
            .put("/components/99")
            .json(&json!({ "active": true }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

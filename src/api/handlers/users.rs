use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::{
    api::{
        dto::{
            CreateUserRequest, MessageResponse, PasswordResetResponse, UpdateUserRequest,
            UserCreatedResponse, UserDto,
        },
        errors::{AppError, AppJson},
        AppState,
    },
    db::models::{User, DEFAULT_PASSWORD},
};

const USER_COLUMNS: &str =
    "id, first_name, last_name, second_last_name, phone, email, password, active, role_id";

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::bad_request(format!("field {field} is required"))),
    }
}

/// Blank second last names are stored as absent.
fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

async fn ensure_assignable_role(pool: &SqlitePool, role_id: i64) -> Result<(), AppError> {
    let ok: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM roles WHERE id = ?1 AND name IN ('Administrator', 'User'))",
    )
    .bind(role_id)
    .fetch_one(pool)
    .await?;

    if ok {
        Ok(())
    } else {
        Err(AppError::bad_request("the selected role is not valid"))
    }
}

/// Rejects `email`/`phone` already held by a user other than `except`.
async fn ensure_unique_contact(
    pool: &SqlitePool,
    email: &str,
    phone: &str,
    except: Option<i64>,
) -> Result<(), AppError> {
    let email_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM users WHERE email = ?1 AND (?2 IS NULL OR id <> ?2))",
    )
    .bind(email)
    .bind(except)
    .fetch_one(pool)
    .await?;
    if email_taken {
        return Err(AppError::bad_request("email is already registered"));
    }

    let phone_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM users WHERE phone = ?1 AND (?2 IS NULL OR id <> ?2))",
    )
    .bind(phone)
    .bind(except)
    .fetch_one(pool)
    .await?;
    if phone_taken {
        return Err(AppError::bad_request("phone number is already registered"));
    }

    Ok(())
}

async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {id} not found")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List every user, ordered by id. Passwords are never included.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = Vec<UserDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserDto>>, AppError> {
    let rows = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Create an active user with the default password. The id is the highest
/// existing id plus one.
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserCreatedResponse),
        (status = 400, description = "Missing field, invalid role, or duplicate email/phone"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserCreatedResponse>), AppError> {
    let first_name = required("first_name", req.first_name)?;
    let last_name = required("last_name", req.last_name)?;
    let phone = required("phone", req.phone)?;
    let email = required("email", req.email)?;
    let role_id = req
        .role_id
        .ok_or_else(|| AppError::bad_request("field role_id is required"))?;
    let second_last_name = optional_text(req.second_last_name);

    ensure_assignable_role(&state.pool, role_id).await?;
    ensure_unique_contact(&state.pool, &email, &phone, None).await?;

    let id = sqlx::query(
        "INSERT INTO users \
         (id, first_name, last_name, second_last_name, phone, email, password, active, role_id) \
         VALUES ((SELECT COALESCE(MAX(id), 0) + 1 FROM users), ?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
    )
    .bind(&first_name)
    .bind(&last_name)
    .bind(&second_last_name)
    .bind(&phone)
    .bind(&email)
    .bind(DEFAULT_PASSWORD)
    .bind(role_id)
    .execute(&state.pool)
    .await?
    .last_insert_rowid();

    info!(user_id = id, role_id, "User created");

    let user = UserDto {
        id,
        first_name,
        last_name,
        second_last_name,
        phone,
        email,
        active: true,
        role_id,
    };
    Ok((
        StatusCode::CREATED,
        Json(UserCreatedResponse {
            message: "User created successfully".to_owned(),
            user,
        }),
    ))
}

/// Partially update a user. Absent fields are left unchanged.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserDto),
        (status = 400, description = "Invalid role or duplicate email/phone"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<Json<UserDto>, AppError> {
    let mut user = fetch_user(&state.pool, id).await?;

    if let Some(v) = req.first_name {
        user.first_name = required("first_name", Some(v))?;
    }
    if let Some(v) = req.last_name {
        user.last_name = required("last_name", Some(v))?;
    }
    if let Some(v) = req.second_last_name {
        user.second_last_name = optional_text(Some(v));
    }
    if let Some(v) = req.phone {
        user.phone = required("phone", Some(v))?;
    }
    if let Some(v) = req.email {
        user.email = required("email", Some(v))?;
    }
    if let Some(v) = req.active {
        user.active = v;
    }
    if let Some(role_id) = req.role_id {
        ensure_assignable_role(&state.pool, role_id).await?;
        user.role_id = role_id;
    }

    ensure_unique_contact(&state.pool, &user.email, &user.phone, Some(id)).await?;

    sqlx::query(
        "UPDATE users SET first_name = ?1, last_name = ?2, second_last_name = ?3, \
         phone = ?4, email = ?5, active = ?6, role_id = ?7 WHERE id = ?8",
    )
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.second_last_name)
    .bind(&user.phone)
    .bind(&user.email)
    .bind(user.active)
    .bind(user.role_id)
    .bind(id)
    .execute(&state.pool)
    .await?;

    info!(user_id = id, "User updated");
    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::not_found(format!("user {id} not found")));
    }

    info!(user_id = id, "User deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_owned(),
    }))
}

/// Reset a user's password to the default one.
#[utoipa::path(
    post,
    path = "/users/{id}/reset-password",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Password reset", body = PasswordResetResponse),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "users"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PasswordResetResponse>, AppError> {
    let updated = sqlx::query("UPDATE users SET password = ?1 WHERE id = ?2")
        .bind(DEFAULT_PASSWORD)
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::not_found(format!("user {id} not found")));
    }

    info!(user_id = id, "Password reset to default");
    Ok(Json(PasswordResetResponse {
        message: "Password reset successfully".to_owned(),
        new_password: DEFAULT_PASSWORD.to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

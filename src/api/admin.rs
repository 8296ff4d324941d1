//! Session-gated admin console.
//!
//! A single admin account manages the user records behind the token client.
//! All routes except login sit behind `admin_session_middleware`.

use axum::{
    Json,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::validation::{normalize_days_to_expire, validate_user_id};
use super::{
    AdminInfoResponse, AdminLoginRequest, ApiError, ApiResponse, AppState, ChangePasswordRequest,
    CreateUserRequest, MessageResponse, UpdateUserRequest, UserDto,
};
use crate::db::{NewUser, UserUpdate};

pub const LOGIN_REQUIRED_MESSAGE: &str = "请先登录";
pub const EMPTY_CREDENTIALS_MESSAGE: &str = "用户名和密码都是必填的";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "用户名或密码不正确";
pub const FIELDS_REQUIRED_MESSAGE: &str = "所有字段都是必填的";
pub const EMPTY_NAME_NOTES_MESSAGE: &str = "名称和备注都是必填的";
pub const NAME_TAKEN_MESSAGE: &str = "用户名已存在";
pub const USER_NOT_FOUND_MESSAGE: &str = "用户不存在";

const SESSION_KEY: &str = "admin";

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ============================================================================
// Middleware
// ============================================================================

/// Rejects any request without a live admin session.
pub async fn admin_session_middleware(
    session: Session,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if let Ok(Some(admin)) = session.get::<String>(SESSION_KEY).await {
        tracing::Span::current().record("user_id", &admin);
        return Ok(next.run(request).await);
    }

    let body = ApiResponse::<()>::error(LOGIN_REQUIRED_MESSAGE);
    Ok((StatusCode::UNAUTHORIZED, Json(body)).into_response())
}

// ============================================================================
// Session handlers
// ============================================================================

/// POST /admin/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Json<ApiResponse<AdminInfoResponse>>, ApiError> {
    if is_blank(&payload.username) || is_blank(&payload.password) {
        return Err(ApiError::validation(EMPTY_CREDENTIALS_MESSAGE));
    }

    let is_valid = state
        .store()
        .verify_admin_password(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::internal(format!("Authentication error: {e}")))?;

    if !is_valid {
        return Err(ApiError::Unauthorized(
            INVALID_CREDENTIALS_MESSAGE.to_string(),
        ));
    }

    if let Err(e) = session.insert(SESSION_KEY, &payload.username).await {
        return Err(ApiError::internal(format!("Failed to create session: {e}")));
    }

    Ok(Json(ApiResponse::success(AdminInfoResponse {
        username: payload.username,
    })))
}

/// POST /admin/logout
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// POST /admin/password
/// Change the admin password (requires the old password to verify).
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if is_blank(&payload.username)
        || is_blank(&payload.old_password)
        || is_blank(&payload.new_password)
    {
        return Err(ApiError::validation(FIELDS_REQUIRED_MESSAGE));
    }

    let is_valid = state
        .store()
        .verify_admin_password(&payload.username, &payload.old_password)
        .await
        .map_err(|e| ApiError::internal(format!("Password verification error: {e}")))?;

    if !is_valid {
        return Err(ApiError::validation(INVALID_CREDENTIALS_MESSAGE));
    }

    let security = state.config().read().await.security.clone();
    state
        .store()
        .update_admin_password(&payload.username, &payload.new_password, &security)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update password: {e}")))?;

    tracing::info!("Password changed for admin: {}", payload.username);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}

// ============================================================================
// User CRUD handlers
// ============================================================================

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let users = state
        .store()
        .list_users()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// POST /admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if is_blank(&payload.name) || is_blank(&payload.password) {
        return Err(ApiError::validation(EMPTY_CREDENTIALS_MESSAGE));
    }

    if state
        .store()
        .get_user_by_name(&payload.name)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .is_some()
    {
        return Err(ApiError::Conflict(NAME_TAKEN_MESSAGE.to_string()));
    }

    let expired_at = normalize_days_to_expire(payload.days_to_expire)
        .map(|days| (chrono::Utc::now() + chrono::Duration::days(days)).to_rfc3339());

    let security = state.config().read().await.security.clone();
    let user = state
        .store()
        .create_user(
            NewUser {
                name: payload.name,
                password: payload.password,
                notes: payload.notes,
                expired_at,
            },
            &security,
        )
        .await
        .map_err(|e| ApiError::DatabaseError(format!("User creation failed: {e}")))?;

    tracing::info!("Created user: {} (ID: {})", user.name, user.id);

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// GET /admin/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let id = validate_user_id(id)?;

    let user = state
        .store()
        .get_user(id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND_MESSAGE.to_string()))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PUT /admin/users/{id}
/// Editing a user always regenerates its token; the password is only
/// re-hashed when a non-blank replacement is supplied, and the expiry is
/// only moved when a positive day count is supplied.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let id = validate_user_id(id)?;

    if is_blank(&payload.name) || is_blank(&payload.notes) {
        return Err(ApiError::validation(EMPTY_NAME_NOTES_MESSAGE));
    }

    if let Some(existing) = state
        .store()
        .get_user_by_name(&payload.name)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        && existing.id != id
    {
        return Err(ApiError::Conflict(NAME_TAKEN_MESSAGE.to_string()));
    }

    let expired_at = normalize_days_to_expire(payload.days_to_expire)
        .map(|days| Some((chrono::Utc::now() + chrono::Duration::days(days)).to_rfc3339()));

    let security = state.config().read().await.security.clone();
    let user = state
        .store()
        .update_user(
            id,
            UserUpdate {
                name: payload.name,
                notes: Some(payload.notes),
                password: payload.password,
                expired_at,
            },
            &security,
        )
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND_MESSAGE.to_string()))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// DELETE /admin/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_user_id(id)?;

    let removed = state
        .store()
        .remove_user(id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    if !removed {
        return Err(ApiError::NotFound(USER_NOT_FOUND_MESSAGE.to_string()));
    }

    tracing::info!("Deleted user {id}");

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "User deleted".to_string(),
    })))
}

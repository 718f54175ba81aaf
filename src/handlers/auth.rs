use axum::{http::StatusCode, Extension, Json};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::authentication::{get_jwt_token, verify_password_argon2, AuthUser};
use crate::data_formats::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::db_helpers;
use crate::errors::RequestError;
use crate::JsonResponse;

pub async fn register_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Json(request): Json<RegisterRequest>,
) -> Result<JsonResponse<ApiResponse<AuthResponse>>, RequestError> {
    let user = db_helpers::insert_user(&pool, &request).await?;
    let token = get_jwt_token(user.id).map_err(|e| {
        tracing::error!("failed to issue token: {e}");
        RequestError::ServerError
    })?;
    tracing::info!(user = %user.username, "registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AuthResponse {
            user: UserResponse::from(user),
            token,
        })),
    ))
}

pub async fn login_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Json(request): Json<LoginRequest>,
) -> Result<JsonResponse<ApiResponse<AuthResponse>>, RequestError> {
    // One generic rejection for both unknown user and wrong password.
    const INVALID: RequestError = RequestError::NotAuthorized("Invalid username or password");

    let user = db_helpers::get_user_by_username(&pool, &request.username)
        .await?
        .ok_or(INVALID)?;
    let valid = verify_password_argon2(request.password, &user.password)
        .await
        .map_err(|_| RequestError::ServerError)?;
    if !valid {
        return Err(INVALID);
    }

    let token = get_jwt_token(user.id).map_err(|e| {
        tracing::error!("failed to issue token: {e}");
        RequestError::ServerError
    })?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(AuthResponse {
            user: UserResponse::from(user),
            token,
        })),
    ))
}

pub async fn current_user(
    auth: AuthUser,
) -> Result<JsonResponse<ApiResponse<UserResponse>>, RequestError> {
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(UserResponse::from(auth.user))),
    ))
}

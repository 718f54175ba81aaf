use axum::{extract::Multipart, http::StatusCode, Extension, Json};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::authentication::AuthUser;
use crate::data_formats::{ApiResponse, UpdateProfileRequest, UploadResponse, UserResponse};
use crate::db_helpers;
use crate::errors::RequestError;
use crate::JsonResponse;

use super::uploads::save_upload;

pub async fn get_profile(
    auth: AuthUser,
) -> Result<JsonResponse<ApiResponse<UserResponse>>, RequestError> {
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(UserResponse::from(auth.user))),
    ))
}

pub async fn update_profile(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<JsonResponse<ApiResponse<UserResponse>>, RequestError> {
    let user = db_helpers::update_profile(&pool, auth.user.id, &request).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(UserResponse::from(user))),
    ))
}

pub async fn upload_avatar(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<JsonResponse<ApiResponse<UploadResponse>>, RequestError> {
    let upload = save_upload(multipart, "avatars").await?;
    db_helpers::update_avatar(&pool, auth.user.id, &upload.url).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(upload))))
}

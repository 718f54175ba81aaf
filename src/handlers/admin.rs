use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::authentication::AdminUser;
use crate::data_formats::{
    AdminListResponse, AdminPostItem, AdminRouteItem, AdminUserItem, ApiResponse, PageQuery,
};
use crate::db_helpers;
use crate::errors::RequestError;
use crate::JsonResponse;

pub async fn admin_list_posts(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _admin: AdminUser,
    Query(query): Query<PageQuery>,
) -> Result<JsonResponse<AdminListResponse<AdminPostItem>>, RequestError> {
    let (data, total) = db_helpers::admin_list_posts_in_db(&pool, &query).await?;
    Ok((
        StatusCode::OK,
        Json(AdminListResponse {
            success: true,
            data,
            total,
            is_live: true,
        }),
    ))
}

pub async fn admin_list_users(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _admin: AdminUser,
    Query(query): Query<PageQuery>,
) -> Result<JsonResponse<AdminListResponse<AdminUserItem>>, RequestError> {
    let (data, total) = db_helpers::admin_list_users_in_db(&pool, &query).await?;
    Ok((
        StatusCode::OK,
        Json(AdminListResponse {
            success: true,
            data,
            total,
            is_live: true,
        }),
    ))
}

pub async fn admin_list_routes(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _admin: AdminUser,
    Query(query): Query<PageQuery>,
) -> Result<JsonResponse<AdminListResponse<AdminRouteItem>>, RequestError> {
    let (data, total, is_live) = db_helpers::admin_list_routes_in_db(&pool, &query).await;
    Ok((
        StatusCode::OK,
        Json(AdminListResponse {
            success: true,
            data,
            total,
            is_live,
        }),
    ))
}

pub async fn admin_delete_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _admin: AdminUser,
    Path(post_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<()>>, RequestError> {
    db_helpers::admin_delete_post_in_db(&pool, post_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::message("Post deleted"))))
}

pub async fn admin_delete_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    admin: AdminUser,
    Path(user_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<()>>, RequestError> {
    db_helpers::admin_delete_user_in_db(&pool, &admin.0.user, user_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::message("User deleted"))))
}

pub async fn admin_delete_route(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _admin: AdminUser,
    Path(route_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<()>>, RequestError> {
    db_helpers::admin_delete_route_in_db(&pool, route_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::message("Route deleted"))))
}

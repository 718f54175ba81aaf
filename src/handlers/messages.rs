use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::authentication::AuthUser;
use crate::data_formats::{
    ApiResponse, MessageListQuery, MessageResponse, UnreadCountResponse,
};
use crate::db_helpers;
use crate::errors::RequestError;
use crate::JsonResponse;

#[derive(Serialize)]
pub struct MessageListData {
    pub messages: Vec<MessageResponse>,
    pub total: i64,
}

pub async fn list_messages(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Query(query): Query<MessageListQuery>,
) -> Result<JsonResponse<ApiResponse<MessageListData>>, RequestError> {
    let (messages, total) = db_helpers::list_messages_in_db(&pool, auth.user.id, &query).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(MessageListData { messages, total })),
    ))
}

pub async fn unread_count(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
) -> Result<JsonResponse<ApiResponse<UnreadCountResponse>>, RequestError> {
    let unread_count = db_helpers::unread_count_in_db(&pool, auth.user.id).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(UnreadCountResponse { unread_count })),
    ))
}

pub async fn mark_message_read(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<()>>, RequestError> {
    db_helpers::mark_message_read_in_db(&pool, message_id, auth.user.id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::message("Marked as read"))))
}

pub async fn mark_all_messages_read(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
) -> Result<JsonResponse<ApiResponse<()>>, RequestError> {
    db_helpers::mark_all_messages_read_in_db(&pool, auth.user.id).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::message("All messages marked as read")),
    ))
}

pub async fn delete_message(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<()>>, RequestError> {
    db_helpers::delete_message_in_db(&pool, message_id, auth.user.id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::message("Message deleted"))))
}

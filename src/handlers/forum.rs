use axum::{
    extract::{Multipart, Path, Query},
    http::StatusCode,
    Extension, Json,
};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::authentication::{AuthUser, MaybeUser};
use crate::data_formats::{
    ApiResponse, CommentRequest, CommentResponse, CreatePostRequest, LikeResponse, PostListQuery,
    PostResponse, PostSearchQuery, UploadResponse,
};
use crate::db_helpers;
use crate::errors::RequestError;
use crate::JsonResponse;

use super::uploads::save_upload;

pub async fn list_posts(
    Extension(pool): Extension<Arc<SqlitePool>>,
    viewer: MaybeUser,
    Query(query): Query<PostListQuery>,
) -> Result<JsonResponse<ApiResponse<Vec<PostResponse>>>, RequestError> {
    let posts =
        db_helpers::list_posts_in_db(&pool, viewer.get_id(), query.page, query.sort_type).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(posts))))
}

pub async fn search_posts(
    Extension(pool): Extension<Arc<SqlitePool>>,
    viewer: MaybeUser,
    Query(query): Query<PostSearchQuery>,
) -> Result<JsonResponse<ApiResponse<Vec<PostResponse>>>, RequestError> {
    let term = query.query.trim();
    if term.is_empty() {
        return Err(RequestError::Validation("Search term must not be empty"));
    }
    let posts =
        db_helpers::search_posts_in_db(&pool, viewer.get_id(), term, query.sort_type).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(posts))))
}

pub async fn get_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    viewer: MaybeUser,
    Path(post_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<PostResponse>>, RequestError> {
    let post = db_helpers::get_post_in_db(&pool, viewer.get_id(), post_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(post))))
}

pub async fn create_post(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<JsonResponse<ApiResponse<PostResponse>>, RequestError> {
    let post = db_helpers::create_post_in_db(&pool, &auth.user, request).await?;
    tracing::info!(post = post.id, author = auth.user.id, "post created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(post))))
}

pub async fn toggle_like(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<LikeResponse>>, RequestError> {
    let like = db_helpers::toggle_like_in_db(&pool, post_id, auth.user.id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(like))))
}

pub async fn list_comments(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(post_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<Vec<CommentResponse>>>, RequestError> {
    let comments = db_helpers::list_comments_in_db(&pool, post_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(comments))))
}

pub async fn add_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Path(post_id): Path<i64>,
    Json(request): Json<CommentRequest>,
) -> Result<JsonResponse<ApiResponse<CommentResponse>>, RequestError> {
    let comment = db_helpers::add_comment_in_db(&pool, post_id, &auth.user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(comment))))
}

pub async fn delete_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<JsonResponse<ApiResponse<()>>, RequestError> {
    db_helpers::delete_comment_in_db(&pool, post_id, comment_id, &auth.user).await?;
    Ok((StatusCode::OK, Json(ApiResponse::message("Comment deleted"))))
}

/// Stores an uploaded forum image and parks it under the uploader's
/// staging session until a post claims it.
pub async fn upload_post_image(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<JsonResponse<ApiResponse<UploadResponse>>, RequestError> {
    let upload = save_upload(multipart, "forum").await?;
    db_helpers::stage_image_in_db(&pool, auth.user.id, &upload.url).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(upload))))
}

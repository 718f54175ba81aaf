use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::authentication::AuthUser;
use crate::data_formats::{ApiResponse, ArticleListQuery, ArticleRequest, ArticleResponse};
use crate::db_helpers;
use crate::errors::RequestError;
use crate::JsonResponse;

pub async fn list_articles(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Query(query): Query<ArticleListQuery>,
) -> Result<JsonResponse<ApiResponse<Vec<ArticleResponse>>>, RequestError> {
    let articles = db_helpers::list_articles_in_db(&pool, &query).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(articles))))
}

#[derive(Deserialize, Debug)]
pub struct PopularQuery {
    pub limit: Option<u32>,
}

pub async fn popular_articles(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Query(query): Query<PopularQuery>,
) -> Result<JsonResponse<ApiResponse<Vec<ArticleResponse>>>, RequestError> {
    let articles = db_helpers::popular_articles_in_db(&pool, query.limit.unwrap_or(5)).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(articles))))
}

pub async fn get_article(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(article_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<ArticleResponse>>, RequestError> {
    let article = db_helpers::get_article_in_db(&pool, article_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(article))))
}

pub async fn create_article(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Json(request): Json<ArticleRequest>,
) -> Result<JsonResponse<ApiResponse<ArticleResponse>>, RequestError> {
    let article = db_helpers::create_article_in_db(&pool, &auth.user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(article))))
}

pub async fn update_article(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Path(article_id): Path<i64>,
    Json(request): Json<ArticleRequest>,
) -> Result<JsonResponse<ApiResponse<ArticleResponse>>, RequestError> {
    let article = db_helpers::update_article_in_db(&pool, article_id, &auth.user, request).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(article))))
}

pub async fn delete_article(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Path(article_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<()>>, RequestError> {
    db_helpers::delete_article_in_db(&pool, article_id, &auth.user).await?;
    Ok((StatusCode::OK, Json(ApiResponse::message("Article deleted"))))
}

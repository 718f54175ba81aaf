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
    ApiResponse, CoordinatesResponse, CreateRouteRequest, RouteListQuery, RouteResponse,
    RouteUpdate, SaveCoordinatesRequest,
};
use crate::db_helpers;
use crate::errors::RequestError;
use crate::JsonResponse;

#[derive(Serialize)]
pub struct RouteListData {
    pub routes: Vec<RouteResponse>,
    pub total: i64,
}

pub async fn list_routes(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Query(query): Query<RouteListQuery>,
) -> Result<JsonResponse<ApiResponse<RouteListData>>, RequestError> {
    let (routes, total) = db_helpers::list_routes_in_db(&pool, &query).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(RouteListData { routes, total })),
    ))
}

pub async fn popular_routes(
    Extension(pool): Extension<Arc<SqlitePool>>,
) -> Result<JsonResponse<ApiResponse<Vec<RouteResponse>>>, RequestError> {
    let routes = db_helpers::popular_routes_in_db(&pool).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(routes))))
}

pub async fn get_route(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(route_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<RouteResponse>>, RequestError> {
    let route = db_helpers::get_route_in_db(&pool, route_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(route))))
}

pub async fn create_route(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Json(request): Json<CreateRouteRequest>,
) -> Result<JsonResponse<ApiResponse<RouteResponse>>, RequestError> {
    let route = db_helpers::create_route_in_db(&pool, &auth.user, request).await?;
    tracing::info!(route = route.id, creator = auth.user.id, "route created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(route))))
}

pub async fn update_route(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Path(route_id): Path<i64>,
    Json(update): Json<RouteUpdate>,
) -> Result<JsonResponse<ApiResponse<RouteResponse>>, RequestError> {
    let route = db_helpers::update_route_in_db(&pool, route_id, &auth.user, update).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(route))))
}

pub async fn delete_route(
    Extension(pool): Extension<Arc<SqlitePool>>,
    auth: AuthUser,
    Path(route_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<()>>, RequestError> {
    db_helpers::delete_route_in_db(&pool, route_id, &auth.user).await?;
    Ok((StatusCode::OK, Json(ApiResponse::message("Route deleted"))))
}

pub async fn get_coordinates(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(route_id): Path<i64>,
) -> Result<JsonResponse<ApiResponse<CoordinatesResponse>>, RequestError> {
    let coordinates = db_helpers::get_coordinates_in_db(&pool, route_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(coordinates))))
}

pub async fn save_coordinates(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _auth: AuthUser,
    Path(route_id): Path<i64>,
    Json(request): Json<SaveCoordinatesRequest>,
) -> Result<JsonResponse<ApiResponse<CoordinatesResponse>>, RequestError> {
    let coordinates = db_helpers::save_coordinates_in_db(&pool, route_id, request).await?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(coordinates))))
}

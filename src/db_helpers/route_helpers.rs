use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::{
    CoordinatesResponse, CreateRouteRequest, RouteListQuery, RouteResponse, RouteUpdate,
    SaveCoordinatesRequest,
};
use crate::errors::RequestError;
use crate::models::{CoordinatesRow, RouteRow, User};

const ROUTE_QUERY: &str = r#"
    SELECT hiking_routes.id          AS id,
           hiking_routes.name        AS name,
           hiking_routes.description AS description,
           hiking_routes.difficulty  AS difficulty,
           hiking_routes.length      AS length,
           hiking_routes.elevation   AS elevation,
           hiking_routes.duration    AS duration,
           hiking_routes.location    AS location,
           hiking_routes.coordinates AS coordinates,
           hiking_routes.rating      AS rating,
           hiking_routes.reviews     AS reviews,
           hiking_routes.image       AS image,
           hiking_routes.status      AS status,
           hiking_routes.created_at  AS created_at,
           hiking_routes.creator_id  AS creator_id,
           users.username            AS creator_name
    FROM hiking_routes
         LEFT JOIN users ON hiking_routes.creator_id = users.id
"#;

const COORDINATES_QUERY: &str = r#"
    SELECT id, route_id, start_name, start_lat, start_lng,
           end_name, end_lat, end_lng, waypoints
    FROM route_coordinates
"#;

async fn route_images_in_db(
    pool: &SqlitePool,
    route_id: i64,
) -> Result<Vec<String>, RequestError> {
    let urls = sqlx::query_scalar::<Sqlite, String>(
        "SELECT image_url FROM route_images WHERE route_id = ? ORDER BY sort_order ASC, id ASC",
    )
    .bind(route_id)
    .fetch_all(pool)
    .await?;
    Ok(urls)
}

pub async fn list_routes_in_db(
    pool: &SqlitePool,
    query: &RouteListQuery,
) -> Result<(Vec<RouteResponse>, i64), RequestError> {
    let mut filters = vec!["hiking_routes.status = 'published'"];
    if query.search.is_some() {
        filters.push("(hiking_routes.name LIKE ? OR hiking_routes.location LIKE ? OR hiking_routes.description LIKE ?)");
    }
    if query.difficulty.is_some() {
        filters.push("hiking_routes.difficulty = ?");
    }
    let filter = filters.join(" AND ");
    let pattern = query.search.as_ref().map(|s| format!("%{s}%"));

    let count_query = format!("SELECT COUNT(*) FROM hiking_routes WHERE {filter}");
    let mut count = sqlx::query_scalar::<Sqlite, i64>(&count_query);
    if let Some(pattern) = &pattern {
        count = count.bind(pattern).bind(pattern).bind(pattern);
    }
    if let Some(difficulty) = query.difficulty {
        count = count.bind(difficulty.as_str());
    }
    let total = count.fetch_one(pool).await?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20);
    let offset = (page - 1) * limit;
    let list_query = format!(
        "{ROUTE_QUERY} WHERE {filter} ORDER BY hiking_routes.created_at DESC LIMIT ? OFFSET ?"
    );
    let mut list = sqlx::query_as::<Sqlite, RouteRow>(&list_query);
    if let Some(pattern) = &pattern {
        list = list.bind(pattern).bind(pattern).bind(pattern);
    }
    if let Some(difficulty) = query.difficulty {
        list = list.bind(difficulty.as_str());
    }
    let rows = list.bind(limit).bind(offset).fetch_all(pool).await?;

    let mut routes = Vec::with_capacity(rows.len());
    for row in rows {
        let images = route_images_in_db(pool, row.id).await?;
        routes.push(RouteResponse::new(row, images));
    }
    Ok((routes, total))
}

/// The three best-rated published routes, for the landing page.
pub async fn popular_routes_in_db(
    pool: &SqlitePool,
) -> Result<Vec<RouteResponse>, RequestError> {
    let query = format!(
        "{ROUTE_QUERY} WHERE hiking_routes.status = 'published' \
         ORDER BY hiking_routes.rating DESC, hiking_routes.reviews DESC LIMIT 3"
    );
    let rows = sqlx::query_as::<Sqlite, RouteRow>(&query)
        .fetch_all(pool)
        .await?;
    let mut routes = Vec::with_capacity(rows.len());
    for row in rows {
        let images = route_images_in_db(pool, row.id).await?;
        routes.push(RouteResponse::new(row, images));
    }
    Ok(routes)
}

pub async fn get_route_in_db(
    pool: &SqlitePool,
    route_id: i64,
) -> Result<RouteResponse, RequestError> {
    let query = format!("{ROUTE_QUERY} WHERE hiking_routes.id = ?");
    let row = sqlx::query_as::<Sqlite, RouteRow>(&query)
        .bind(route_id)
        .fetch_optional(pool)
        .await?;
    let row = match row {
        Some(row) => row,
        None => return Err(RequestError::NotFound("Route not found")),
    };
    let images = route_images_in_db(pool, row.id).await?;
    Ok(RouteResponse::new(row, images))
}

pub async fn create_route_in_db(
    pool: &SqlitePool,
    creator: &User,
    request: CreateRouteRequest,
) -> Result<RouteResponse, RequestError> {
    if request.name.trim().is_empty() || request.location.trim().is_empty() {
        return Err(RequestError::Validation("Name and location are required"));
    }

    let coordinates = serde_json::to_string(&request.coordinates)
        .map_err(|_| RequestError::Validation("Coordinates must be valid JSON"))?;
    // Cover image is the first of the gallery when one was sent.
    let cover = request.images.first().cloned();

    let mut tx = pool.begin().await?;

    let route_id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO hiking_routes
            (name, description, difficulty, length, elevation, duration,
             location, coordinates, image, creator_id, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&request.name)
    .bind(&request.description)
    .bind(request.difficulty.as_str())
    .bind(request.length)
    .bind(request.elevation)
    .bind(request.duration)
    .bind(&request.location)
    .bind(&coordinates)
    .bind(&cover)
    .bind(creator.id)
    .bind(request.status.as_deref().unwrap_or("published"))
    .fetch_one(&mut tx)
    .await?;

    for (order, url) in request.images.iter().filter(|u| !u.is_empty()).enumerate() {
        sqlx::query("INSERT INTO route_images (route_id, image_url, sort_order) VALUES (?, ?, ?)")
            .bind(route_id)
            .bind(url)
            .bind(order as i64)
            .execute(&mut tx)
            .await?;
    }

    tx.commit().await?;

    get_route_in_db(pool, route_id).await
}

pub async fn update_route_in_db(
    pool: &SqlitePool,
    route_id: i64,
    actor: &User,
    update: RouteUpdate,
) -> Result<RouteResponse, RequestError> {
    if update.is_empty() {
        return Err(RequestError::Validation("No fields to update"));
    }

    let creator_id = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT creator_id FROM hiking_routes WHERE id = ?",
    )
    .bind(route_id)
    .fetch_optional(pool)
    .await?;
    let creator_id = match creator_id {
        Some(id) => id,
        None => return Err(RequestError::NotFound("Route not found")),
    };
    if creator_id != actor.id && !actor.is_admin {
        return Err(RequestError::Forbidden(
            "Only the creator or an admin may edit a route",
        ));
    }

    let coordinates = match &update.coordinates {
        Some(value) => Some(
            serde_json::to_string(value)
                .map_err(|_| RequestError::Validation("Coordinates must be valid JSON"))?,
        ),
        None => None,
    };

    // One static statement; absent fields fall through COALESCE.
    sqlx::query(
        r#"
        UPDATE hiking_routes
        SET name        = COALESCE(?, name),
            description = COALESCE(?, description),
            difficulty  = COALESCE(?, difficulty),
            length      = COALESCE(?, length),
            elevation   = COALESCE(?, elevation),
            duration    = COALESCE(?, duration),
            location    = COALESCE(?, location),
            coordinates = COALESCE(?, coordinates),
            status      = COALESCE(?, status),
            updated_at  = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&update.name)
    .bind(&update.description)
    .bind(update.difficulty.map(|d| d.as_str()))
    .bind(update.length)
    .bind(update.elevation)
    .bind(update.duration)
    .bind(&update.location)
    .bind(&coordinates)
    .bind(&update.status)
    .bind(route_id)
    .execute(pool)
    .await?;

    get_route_in_db(pool, route_id).await
}

pub async fn delete_route_in_db(
    pool: &SqlitePool,
    route_id: i64,
    actor: &User,
) -> Result<(), RequestError> {
    let creator_id = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT creator_id FROM hiking_routes WHERE id = ?",
    )
    .bind(route_id)
    .fetch_optional(pool)
    .await?;
    let creator_id = match creator_id {
        Some(id) => id,
        None => return Err(RequestError::NotFound("Route not found")),
    };
    if creator_id != actor.id && !actor.is_admin {
        return Err(RequestError::Forbidden(
            "Only the creator or an admin may delete a route",
        ));
    }

    sqlx::query("DELETE FROM hiking_routes WHERE id = ?")
        .bind(route_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_coordinates_in_db(
    pool: &SqlitePool,
    route_id: i64,
) -> Result<CoordinatesResponse, RequestError> {
    let query = format!("{COORDINATES_QUERY} WHERE route_id = ?");
    let row = sqlx::query_as::<Sqlite, CoordinatesRow>(&query)
        .bind(route_id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(CoordinatesResponse::from(row)),
        None => Err(RequestError::NotFound("Coordinates not found")),
    }
}

/// Upserts the detailed start/end/waypoint record for a route.
pub async fn save_coordinates_in_db(
    pool: &SqlitePool,
    route_id: i64,
    request: SaveCoordinatesRequest,
) -> Result<CoordinatesResponse, RequestError> {
    let exists = sqlx::query_scalar::<Sqlite, i64>("SELECT id FROM hiking_routes WHERE id = ?")
        .bind(route_id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Err(RequestError::NotFound("Route not found"));
    }

    let waypoints = serde_json::to_string(&request.waypoints)
        .map_err(|_| RequestError::Validation("Waypoints must be valid JSON"))?;

    sqlx::query(
        r#"
        INSERT INTO route_coordinates
            (route_id, start_name, start_lat, start_lng, end_name, end_lat, end_lng, waypoints)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (route_id) DO UPDATE SET
            start_name = excluded.start_name,
            start_lat  = excluded.start_lat,
            start_lng  = excluded.start_lng,
            end_name   = excluded.end_name,
            end_lat    = excluded.end_lat,
            end_lng    = excluded.end_lng,
            waypoints  = excluded.waypoints
        "#,
    )
    .bind(route_id)
    .bind(request.start_name.as_deref().unwrap_or(""))
    .bind(request.start_lat)
    .bind(request.start_lng)
    .bind(request.end_name.as_deref().unwrap_or(""))
    .bind(request.end_lat)
    .bind(request.end_lng)
    .bind(&waypoints)
    .execute(pool)
    .await?;

    get_coordinates_in_db(pool, route_id).await
}

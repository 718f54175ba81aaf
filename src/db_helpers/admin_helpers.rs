use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::{AdminPostItem, AdminRouteItem, AdminUserItem, PageQuery};
use crate::errors::RequestError;
use crate::models::User;

pub async fn admin_list_posts_in_db(
    pool: &SqlitePool,
    query: &PageQuery,
) -> Result<(Vec<AdminPostItem>, i64), RequestError> {
    let filter = if query.search.is_some() {
        "WHERE posts.title LIKE ? OR users.username LIKE ?"
    } else {
        ""
    };
    let pattern = query.search.as_ref().map(|s| format!("%{s}%"));

    let count_sql = format!(
        "SELECT COUNT(*) FROM posts JOIN users ON posts.user_id = users.id {filter}"
    );
    let mut count = sqlx::query_scalar::<Sqlite, i64>(&count_sql);
    if let Some(pattern) = &pattern {
        count = count.bind(pattern).bind(pattern);
    }
    let total = count.fetch_one(pool).await?;

    let list_sql = format!(
        r#"
        SELECT posts.id         AS id,
               posts.title      AS title,
               users.username   AS author,
               posts.likes      AS likes,
               posts.comments   AS comments,
               posts.created_at AS created_at
        FROM posts
             JOIN users ON posts.user_id = users.id
        {filter}
        ORDER BY posts.created_at DESC
        LIMIT ? OFFSET ?
        "#
    );
    let mut list = sqlx::query_as::<Sqlite, AdminPostItem>(&list_sql);
    if let Some(pattern) = &pattern {
        list = list.bind(pattern).bind(pattern);
    }
    let rows = list
        .bind(query.limit)
        .bind(query.page.saturating_sub(1) * query.limit)
        .fetch_all(pool)
        .await?;

    Ok((rows, total))
}

pub async fn admin_list_users_in_db(
    pool: &SqlitePool,
    query: &PageQuery,
) -> Result<(Vec<AdminUserItem>, i64), RequestError> {
    let filter = if query.search.is_some() {
        "WHERE username LIKE ? OR email LIKE ?"
    } else {
        ""
    };
    let pattern = query.search.as_ref().map(|s| format!("%{s}%"));

    let count_sql = format!("SELECT COUNT(*) FROM users {filter}");
    let mut count = sqlx::query_scalar::<Sqlite, i64>(&count_sql);
    if let Some(pattern) = &pattern {
        count = count.bind(pattern).bind(pattern);
    }
    let total = count.fetch_one(pool).await?;

    let list_sql = format!(
        r#"
        SELECT id, username, email, is_admin, created_at
        FROM users
        {filter}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#
    );
    let mut list = sqlx::query_as::<Sqlite, AdminUserItem>(&list_sql);
    if let Some(pattern) = &pattern {
        list = list.bind(pattern).bind(pattern);
    }
    let rows = list
        .bind(query.limit)
        .bind(query.page.saturating_sub(1) * query.limit)
        .fetch_all(pool)
        .await?;

    Ok((rows, total))
}

/// Route listing for the console. Unlike the other admin tables this one
/// degrades: if the query fails, a built-in sample dataset is served so the
/// console stays navigable, and the response is flagged as not live.
pub async fn admin_list_routes_in_db(
    pool: &SqlitePool,
    query: &PageQuery,
) -> (Vec<AdminRouteItem>, i64, bool) {
    match try_list_routes(pool, query).await {
        Ok((rows, total)) => (rows, total, true),
        Err(e) => {
            tracing::warn!("route listing unavailable, serving sample data: {e:?}");
            let sample = sample_routes();
            let total = sample.len() as i64;
            (sample, total, false)
        }
    }
}

async fn try_list_routes(
    pool: &SqlitePool,
    query: &PageQuery,
) -> Result<(Vec<AdminRouteItem>, i64), RequestError> {
    let filter = if query.search.is_some() {
        "WHERE name LIKE ? OR location LIKE ?"
    } else {
        ""
    };
    let pattern = query.search.as_ref().map(|s| format!("%{s}%"));

    let count_sql = format!("SELECT COUNT(*) FROM hiking_routes {filter}");
    let mut count = sqlx::query_scalar::<Sqlite, i64>(&count_sql);
    if let Some(pattern) = &pattern {
        count = count.bind(pattern).bind(pattern);
    }
    let total = count.fetch_one(pool).await?;

    let list_sql = format!(
        r#"
        SELECT id, name, difficulty, location, rating, status
        FROM hiking_routes
        {filter}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#
    );
    let mut list = sqlx::query_as::<Sqlite, AdminRouteItem>(&list_sql);
    if let Some(pattern) = &pattern {
        list = list.bind(pattern).bind(pattern);
    }
    let rows = list
        .bind(query.limit)
        .bind(query.page.saturating_sub(1) * query.limit)
        .fetch_all(pool)
        .await?;

    Ok((rows, total))
}

fn sample_routes() -> Vec<AdminRouteItem> {
    vec![
        AdminRouteItem {
            id: 1,
            name: "Eagle Ridge Loop".to_string(),
            difficulty: "medium".to_string(),
            location: "Cascade Range".to_string(),
            rating: 4.6,
            status: "published".to_string(),
        },
        AdminRouteItem {
            id: 2,
            name: "Mirror Lake Trail".to_string(),
            difficulty: "easy".to_string(),
            location: "Lake District".to_string(),
            rating: 4.2,
            status: "published".to_string(),
        },
        AdminRouteItem {
            id: 3,
            name: "Granite Spire Ascent".to_string(),
            difficulty: "extreme".to_string(),
            location: "High Sierra".to_string(),
            rating: 4.9,
            status: "draft".to_string(),
        },
    ]
}

pub async fn admin_delete_post_in_db(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<(), RequestError> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(post_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Post not found"));
    }
    Ok(())
}

pub async fn admin_delete_user_in_db(
    pool: &SqlitePool,
    actor: &User,
    user_id: i64,
) -> Result<(), RequestError> {
    if actor.id == user_id {
        return Err(RequestError::Validation(
            "Admins cannot delete their own account",
        ));
    }
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("User not found"));
    }
    Ok(())
}

pub async fn admin_delete_route_in_db(
    pool: &SqlitePool,
    route_id: i64,
) -> Result<(), RequestError> {
    let result = sqlx::query("DELETE FROM hiking_routes WHERE id = ?")
        .bind(route_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Route not found"));
    }
    Ok(())
}

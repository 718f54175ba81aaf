use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::{ArticleListQuery, ArticleRequest, ArticleResponse};
use crate::errors::RequestError;
use crate::models::{ArticleRow, User};

const ARTICLE_QUERY: &str = r#"
    SELECT articles.id         AS id,
           articles.title      AS title,
           articles.content    AS content,
           articles.summary    AS summary,
           articles.category   AS category,
           articles.image      AS image,
           articles.views      AS views,
           articles.user_id    AS user_id,
           articles.created_at AS created_at,
           users.username      AS author_name,
           users.avatar        AS author_avatar
    FROM articles
         LEFT JOIN users ON articles.user_id = users.id
"#;

pub async fn list_articles_in_db(
    pool: &SqlitePool,
    query: &ArticleListQuery,
) -> Result<Vec<ArticleResponse>, RequestError> {
    let mut filters: Vec<&str> = Vec::new();
    if query.category.as_deref().is_some_and(|c| c != "all") {
        filters.push("articles.category = ?");
    }
    // Time windows are relative to now; anything unrecognized means "all time".
    let window = match query.time_filter.as_deref() {
        Some("week") => Some("articles.created_at >= datetime('now', '-7 days')"),
        Some("month") => Some("articles.created_at >= datetime('now', '-1 month')"),
        Some("year") => Some("articles.created_at >= datetime('now', '-1 year')"),
        _ => None,
    };
    if let Some(window) = window {
        filters.push(window);
    }
    if query.search_query.is_some() {
        filters.push(
            "(articles.title LIKE ? OR articles.content LIKE ? OR articles.summary LIKE ?)",
        );
    }

    let filter = if filters.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", filters.join(" AND "))
    };
    let sql = format!(
        "{ARTICLE_QUERY} {filter} ORDER BY articles.created_at DESC LIMIT ? OFFSET ?"
    );

    let pattern = query.search_query.as_ref().map(|s| format!("%{s}%"));
    let mut list = sqlx::query_as::<Sqlite, ArticleRow>(&sql);
    if let Some(category) = query.category.as_deref().filter(|c| *c != "all") {
        list = list.bind(category.to_string());
    }
    if let Some(pattern) = &pattern {
        list = list.bind(pattern).bind(pattern).bind(pattern);
    }
    let rows = list
        .bind(query.limit.unwrap_or(20))
        .bind(query.offset.unwrap_or(0))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(ArticleResponse::from).collect())
}

pub async fn popular_articles_in_db(
    pool: &SqlitePool,
    limit: u32,
) -> Result<Vec<ArticleResponse>, RequestError> {
    let sql = format!(
        "{ARTICLE_QUERY} ORDER BY articles.views DESC, articles.created_at DESC LIMIT ?"
    );
    let rows = sqlx::query_as::<Sqlite, ArticleRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(ArticleResponse::from).collect())
}

/// Fetches one article and bumps its view counter. The bump is fire-and-
/// forget relative to the read; a reader still gets the article if the
/// counter update loses a race.
pub async fn get_article_in_db(
    pool: &SqlitePool,
    article_id: i64,
) -> Result<ArticleResponse, RequestError> {
    let sql = format!("{ARTICLE_QUERY} WHERE articles.id = ?");
    let row = sqlx::query_as::<Sqlite, ArticleRow>(&sql)
        .bind(article_id)
        .fetch_optional(pool)
        .await?;
    let mut row = match row {
        Some(row) => row,
        None => return Err(RequestError::NotFound("Article not found")),
    };

    sqlx::query("UPDATE articles SET views = views + 1 WHERE id = ?")
        .bind(article_id)
        .execute(pool)
        .await?;
    row.views += 1;

    Ok(ArticleResponse::from(row))
}

pub async fn create_article_in_db(
    pool: &SqlitePool,
    author: &User,
    request: ArticleRequest,
) -> Result<ArticleResponse, RequestError> {
    if request.title.trim().is_empty() || request.content.trim().is_empty() {
        return Err(RequestError::Validation("Title and content are required"));
    }

    let article_id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO articles (title, content, summary, category, image, user_id)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&request.title)
    .bind(&request.content)
    .bind(&request.summary)
    .bind(&request.category)
    .bind(&request.image)
    .bind(author.id)
    .fetch_one(pool)
    .await?;

    let sql = format!("{ARTICLE_QUERY} WHERE articles.id = ?");
    let row = sqlx::query_as::<Sqlite, ArticleRow>(&sql)
        .bind(article_id)
        .fetch_one(pool)
        .await?;
    Ok(ArticleResponse::from(row))
}

pub async fn update_article_in_db(
    pool: &SqlitePool,
    article_id: i64,
    actor: &User,
    request: ArticleRequest,
) -> Result<ArticleResponse, RequestError> {
    author_or_admin(pool, article_id, actor).await?;

    sqlx::query(
        r#"
        UPDATE articles
        SET title = ?, content = ?, summary = ?, category = ?, image = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&request.title)
    .bind(&request.content)
    .bind(&request.summary)
    .bind(&request.category)
    .bind(&request.image)
    .bind(article_id)
    .execute(pool)
    .await?;

    let sql = format!("{ARTICLE_QUERY} WHERE articles.id = ?");
    let row = sqlx::query_as::<Sqlite, ArticleRow>(&sql)
        .bind(article_id)
        .fetch_one(pool)
        .await?;
    Ok(ArticleResponse::from(row))
}

pub async fn delete_article_in_db(
    pool: &SqlitePool,
    article_id: i64,
    actor: &User,
) -> Result<(), RequestError> {
    author_or_admin(pool, article_id, actor).await?;
    sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(article_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn author_or_admin(
    pool: &SqlitePool,
    article_id: i64,
    actor: &User,
) -> Result<(), RequestError> {
    let author_id = sqlx::query_scalar::<Sqlite, i64>("SELECT user_id FROM articles WHERE id = ?")
        .bind(article_id)
        .fetch_optional(pool)
        .await?;
    let author_id = match author_id {
        Some(id) => id,
        None => return Err(RequestError::NotFound("Article not found")),
    };
    if author_id != actor.id && !actor.is_admin {
        return Err(RequestError::Forbidden(
            "Only the author or an admin may modify an article",
        ));
    }
    Ok(())
}

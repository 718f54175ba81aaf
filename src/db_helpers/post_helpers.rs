use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::data_formats::{
    CommentRequest, CommentResponse, CreatePostRequest, LikeResponse, PostResponse, PostSort,
    POSTS_PER_PAGE,
};
use crate::errors::RequestError;
use crate::models::{CommentRow, PostRow, User};

use super::{create_notification, make_summary};

const POST_QUERY: &str = r#"
    SELECT posts.id              AS id,
           posts.title           AS title,
           posts.content         AS content,
           posts.summary         AS summary,
           posts.location        AS location,
           posts.likes           AS likes,
           posts.comments        AS comments,
           posts.created_at      AS created_at,
           users.id              AS author_id,
           users.username        AS author_name,
           users.avatar          AS author_avatar,
           (SELECT GROUP_CONCAT(tags.tag_name)
            FROM tags
                 JOIN post_tags ON post_tags.tag_id = tags.id
            WHERE post_tags.post_id = posts.id) AS tag_list,
           EXISTS (SELECT 1
                   FROM post_likes
                   WHERE post_likes.post_id = posts.id
                     AND post_likes.user_id = $1) AS is_liked
    FROM posts
         JOIN users ON posts.user_id = users.id
"#;

const COMMENT_QUERY: &str = r#"
    SELECT post_comments.id         AS id,
           post_comments.post_id    AS post_id,
           post_comments.content    AS content,
           post_comments.parent_id  AS parent_id,
           post_comments.created_at AS created_at,
           users.id                 AS author_id,
           users.username           AS author_name,
           users.avatar             AS author_avatar
    FROM post_comments
         JOIN users ON post_comments.user_id = users.id
"#;

// Stored timestamps have second precision, so the id breaks ties between
// writes that land in the same second.
fn sort_clause(sort: PostSort) -> &'static str {
    match sort {
        PostSort::Latest => "posts.created_at DESC, posts.id DESC",
        PostSort::Hottest => "posts.likes DESC, posts.created_at DESC, posts.id DESC",
    }
}

async fn post_images_in_db(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<Vec<String>, RequestError> {
    let urls = sqlx::query_scalar::<Sqlite, String>(
        "SELECT image_url FROM post_images WHERE post_id = ? ORDER BY sort_order ASC, id ASC",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    Ok(urls)
}

pub async fn get_post_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    post_id: i64,
) -> Result<PostResponse, RequestError> {
    let query = format!("{POST_QUERY} WHERE posts.id = $2");
    let row = sqlx::query_as::<Sqlite, PostRow>(&query)
        .bind(viewer)
        .bind(post_id)
        .fetch_optional(pool)
        .await?;
    let row = match row {
        Some(row) => row,
        None => return Err(RequestError::NotFound("Post not found")),
    };
    let images = post_images_in_db(pool, row.id).await?;
    Ok(PostResponse::new(row, images))
}

pub async fn list_posts_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    page: u32,
    sort: PostSort,
) -> Result<Vec<PostResponse>, RequestError> {
    let order = sort_clause(sort);
    let offset = page.saturating_sub(1) * POSTS_PER_PAGE;
    let query = format!("{POST_QUERY} ORDER BY {order} LIMIT $2 OFFSET $3");
    let rows = sqlx::query_as::<Sqlite, PostRow>(&query)
        .bind(viewer)
        .bind(POSTS_PER_PAGE)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let mut posts = Vec::with_capacity(rows.len());
    for row in rows {
        let images = post_images_in_db(pool, row.id).await?;
        posts.push(PostResponse::new(row, images));
    }
    Ok(posts)
}

pub async fn search_posts_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    term: &str,
    sort: PostSort,
) -> Result<Vec<PostResponse>, RequestError> {
    let order = sort_clause(sort);
    let query =
        format!("{POST_QUERY} WHERE posts.title LIKE $2 OR posts.content LIKE $3 ORDER BY {order}");
    let pattern = format!("%{term}%");
    let rows = sqlx::query_as::<Sqlite, PostRow>(&query)
        .bind(viewer)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(pool)
        .await?;

    let mut posts = Vec::with_capacity(rows.len());
    for row in rows {
        let images = post_images_in_db(pool, row.id).await?;
        posts.push(PostResponse::new(row, images));
    }
    Ok(posts)
}

/// Creates a post with its tags and images in one transaction. Staged
/// images from the author's upload session are claimed first and the
/// session removed; URLs passed in the body are attached afterwards,
/// de-duplicated against what the claim already attached.
pub async fn create_post_in_db(
    pool: &SqlitePool,
    author: &User,
    request: CreatePostRequest,
) -> Result<PostResponse, RequestError> {
    if request.title.trim().is_empty() || request.content.trim().is_empty() {
        return Err(RequestError::Validation("Title and content are required"));
    }

    let mut tx = pool.begin().await?;

    let summary = make_summary(&request.content);
    let post_id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO posts (title, content, summary, user_id, location)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&request.title)
    .bind(&request.content)
    .bind(&summary)
    .bind(author.id)
    .bind(&request.location)
    .fetch_one(&mut tx)
    .await?;

    for tag in request.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        let tag_id = sqlx::query_scalar::<Sqlite, i64>(
            r#"
            INSERT INTO tags (tag_name)
            VALUES (?)
            ON CONFLICT (tag_name) DO UPDATE SET tag_name = excluded.tag_name
            RETURNING id
            "#,
        )
        .bind(tag)
        .fetch_one(&mut tx)
        .await?;

        sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut tx)
            .await?;
    }

    let mut attached = claim_staged_images(&mut tx, author.id, post_id).await?;

    let mut sort_order = attached.len() as i64;
    for url in request.images.iter().filter(|u| !u.is_empty()) {
        if attached.iter().any(|existing| existing == url) {
            continue;
        }
        sqlx::query("INSERT INTO post_images (post_id, image_url, sort_order) VALUES (?, ?, ?)")
            .bind(post_id)
            .bind(url)
            .bind(sort_order)
            .execute(&mut tx)
            .await?;
        attached.push(url.clone());
        sort_order += 1;
    }

    tx.commit().await?;

    get_post_in_db(pool, Some(author.id), post_id).await
}

/// Re-parents every image staged under the user's upload session onto the
/// new post, then drops the emptied session. Returns the claimed URLs in
/// staging order. An expired session is purged instead of claimed.
async fn claim_staged_images(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    post_id: i64,
) -> Result<Vec<String>, RequestError> {
    let session = sqlx::query_as::<Sqlite, (i64, bool)>(
        "SELECT id, expires_at < datetime('now') FROM upload_sessions WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let session_id = match session {
        Some((id, true)) => {
            purge_session(tx, id).await?;
            return Ok(Vec::new());
        }
        Some((id, false)) => id,
        None => return Ok(Vec::new()),
    };

    let urls = sqlx::query_scalar::<Sqlite, String>(
        "SELECT image_url FROM post_images WHERE upload_session_id = ? ORDER BY id ASC",
    )
    .bind(session_id)
    .fetch_all(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE post_images SET post_id = ?, upload_session_id = NULL WHERE upload_session_id = ?",
    )
    .bind(post_id)
    .bind(session_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM upload_sessions WHERE id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    Ok(urls)
}

async fn purge_session(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: i64,
) -> Result<(), RequestError> {
    sqlx::query("DELETE FROM post_images WHERE upload_session_id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM upload_sessions WHERE id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;
    Ok(())
}

/// Records an uploaded image URL under the user's upload session, creating
/// the session if this is the first staged image. Staging into an expired
/// session drops its leftovers first; each staged upload renews the expiry.
pub async fn stage_image_in_db(
    pool: &SqlitePool,
    user_id: i64,
    url: &str,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;

    let session = sqlx::query_as::<Sqlite, (i64, bool)>(
        "SELECT id, expires_at < datetime('now') FROM upload_sessions WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut tx)
    .await?;

    let session_id = match session {
        Some((id, expired)) => {
            if expired {
                sqlx::query("DELETE FROM post_images WHERE upload_session_id = ?")
                    .bind(id)
                    .execute(&mut tx)
                    .await?;
            }
            sqlx::query(
                "UPDATE upload_sessions SET expires_at = datetime('now', '+1 day') WHERE id = ?",
            )
            .bind(id)
            .execute(&mut tx)
            .await?;
            id
        }
        None => {
            sqlx::query_scalar::<Sqlite, i64>(
                r#"
                INSERT INTO upload_sessions (user_id, expires_at)
                VALUES (?, datetime('now', '+1 day'))
                RETURNING id
                "#,
            )
            .bind(user_id)
            .fetch_one(&mut tx)
            .await?
        }
    };

    sqlx::query("INSERT INTO post_images (upload_session_id, image_url) VALUES (?, ?)")
        .bind(session_id)
        .bind(url)
        .execute(&mut tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn toggle_like_in_db(
    pool: &SqlitePool,
    post_id: i64,
    user_id: i64,
) -> Result<LikeResponse, RequestError> {
    let mut tx = pool.begin().await?;

    let owner_id = sqlx::query_scalar::<Sqlite, i64>("SELECT user_id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut tx)
        .await?;
    let owner_id = match owner_id {
        Some(id) => id,
        None => return Err(RequestError::NotFound("Post not found")),
    };

    let was_liked = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT id FROM post_likes WHERE post_id = ? AND user_id = ?",
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(&mut tx)
    .await?
    .is_some();

    let is_liked = if was_liked {
        sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut tx)
            .await?;
        sqlx::query("UPDATE posts SET likes = MAX(likes - 1, 0) WHERE id = ?")
            .bind(post_id)
            .execute(&mut tx)
            .await?;
        false
    } else {
        let insert = sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut tx)
            .await;
        match insert {
            Ok(_) => {
                sqlx::query("UPDATE posts SET likes = likes + 1 WHERE id = ?")
                    .bind(post_id)
                    .execute(&mut tx)
                    .await?;
                // Only a fresh like notifies the owner, and a failure to
                // record the notification never fails the like itself.
                create_notification(&mut tx, "like", user_id, owner_id, post_id, None, None).await;
                true
            }
            Err(e) => {
                // A concurrent request won the insert race. The unique
                // (post, user) constraint is the only guard here; losing
                // means "already liked", not an error.
                let e = RequestError::from(e);
                if e.is_unique_violation() {
                    true
                } else {
                    return Err(e);
                }
            }
        }
    };

    let likes = sqlx::query_scalar::<Sqlite, i64>("SELECT likes FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(&mut tx)
        .await?;

    tx.commit().await?;
    Ok(LikeResponse { likes, is_liked })
}

pub async fn list_comments_in_db(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<Vec<CommentResponse>, RequestError> {
    let query = format!(
        "{COMMENT_QUERY} WHERE post_comments.post_id = ? AND post_comments.parent_id IS NULL \
         ORDER BY post_comments.created_at DESC, post_comments.id DESC"
    );
    let top_level = sqlx::query_as::<Sqlite, CommentRow>(&query)
        .bind(post_id)
        .fetch_all(pool)
        .await?;

    let reply_query = format!(
        "{COMMENT_QUERY} WHERE post_comments.parent_id = ? ORDER BY post_comments.created_at ASC, post_comments.id ASC"
    );
    let mut comments = Vec::with_capacity(top_level.len());
    for row in top_level {
        let replies = sqlx::query_as::<Sqlite, CommentRow>(&reply_query)
            .bind(row.id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|r| CommentResponse::new(r, None))
            .collect();
        comments.push(CommentResponse::new(row, Some(replies)));
    }
    Ok(comments)
}

pub async fn add_comment_in_db(
    pool: &SqlitePool,
    post_id: i64,
    author: &User,
    request: CommentRequest,
) -> Result<CommentResponse, RequestError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(RequestError::Validation("Comment must not be empty"));
    }

    let mut tx = pool.begin().await?;

    let owner_id = sqlx::query_scalar::<Sqlite, i64>("SELECT user_id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut tx)
        .await?;
    let owner_id = match owner_id {
        Some(id) => id,
        None => return Err(RequestError::NotFound("Post not found")),
    };

    if let Some(parent_id) = request.parent_id {
        let parent = sqlx::query_scalar::<Sqlite, Option<i64>>(
            "SELECT parent_id FROM post_comments WHERE id = ? AND post_id = ?",
        )
        .bind(parent_id)
        .bind(post_id)
        .fetch_optional(&mut tx)
        .await?;
        match parent {
            None => return Err(RequestError::NotFound("Parent comment not found")),
            // Nesting is capped at one level: a reply's parent must itself
            // be top-level.
            Some(Some(_)) => {
                return Err(RequestError::Validation(
                    "Replies to replies are not allowed",
                ))
            }
            Some(None) => {}
        }
    }

    let comment_id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO post_comments (post_id, user_id, content, parent_id)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(author.id)
    .bind(content)
    .bind(request.parent_id)
    .fetch_one(&mut tx)
    .await?;

    sqlx::query("UPDATE posts SET comments = comments + 1 WHERE id = ?")
        .bind(post_id)
        .execute(&mut tx)
        .await?;

    let snippet: String = content.chars().take(100).collect();
    create_notification(
        &mut tx,
        "comment",
        author.id,
        owner_id,
        post_id,
        Some(comment_id),
        Some(snippet.as_str()),
    )
    .await;

    tx.commit().await?;

    let query = format!("{COMMENT_QUERY} WHERE post_comments.id = ?");
    let row = sqlx::query_as::<Sqlite, CommentRow>(&query)
        .bind(comment_id)
        .fetch_one(pool)
        .await?;
    let replies = request.parent_id.is_none().then(Vec::new);
    Ok(CommentResponse::new(row, replies))
}

pub async fn delete_comment_in_db(
    pool: &SqlitePool,
    post_id: i64,
    comment_id: i64,
    actor: &User,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;

    let comment = sqlx::query_as::<Sqlite, (i64, Option<i64>)>(
        "SELECT user_id, parent_id FROM post_comments WHERE id = ? AND post_id = ?",
    )
    .bind(comment_id)
    .bind(post_id)
    .fetch_optional(&mut tx)
    .await?;
    let (comment_author, parent_id) = match comment {
        Some(c) => c,
        None => return Err(RequestError::NotFound("Comment not found")),
    };

    if comment_author != actor.id && !actor.is_admin {
        return Err(RequestError::Forbidden(
            "Only the author or an admin may delete a comment",
        ));
    }

    let mut removed: i64 = 1;
    if parent_id.is_none() {
        let replies = sqlx::query_scalar::<Sqlite, i64>(
            "SELECT COUNT(*) FROM post_comments WHERE parent_id = ?",
        )
        .bind(comment_id)
        .fetch_one(&mut tx)
        .await?;
        removed += replies;
        sqlx::query("DELETE FROM post_comments WHERE parent_id = ?")
            .bind(comment_id)
            .execute(&mut tx)
            .await?;
    }

    sqlx::query("DELETE FROM post_comments WHERE id = ?")
        .bind(comment_id)
        .execute(&mut tx)
        .await?;

    sqlx::query("UPDATE posts SET comments = MAX(comments - ?, 0) WHERE id = ?")
        .bind(removed)
        .bind(post_id)
        .execute(&mut tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Rewrites every post's denormalized counters from true counts.
/// The mutation paths maintain the counters incrementally; this exists to
/// detect and repair drift.
pub async fn reconcile_post_counters(pool: &SqlitePool) -> Result<u64, RequestError> {
    let result = sqlx::query(
        r#"
        UPDATE posts
        SET likes = (SELECT COUNT(*) FROM post_likes WHERE post_likes.post_id = posts.id),
            comments = (SELECT COUNT(*) FROM post_comments WHERE post_comments.post_id = posts.id)
        WHERE likes <> (SELECT COUNT(*) FROM post_likes WHERE post_likes.post_id = posts.id)
           OR comments <> (SELECT COUNT(*) FROM post_comments WHERE post_comments.post_id = posts.id)
        "#,
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::data_formats::{MessageListQuery, MessageResponse};
use crate::errors::RequestError;
use crate::models::MessageRow;

const MESSAGE_QUERY: &str = r#"
    SELECT messages.id         AS id,
           messages.type       AS type,
           messages.content    AS content,
           messages.is_read    AS is_read,
           messages.created_at AS created_at,
           messages.post_id    AS post_id,
           messages.comment_id AS comment_id,
           posts.title         AS post_title,
           users.id            AS sender_id,
           users.username      AS sender_name,
           users.avatar        AS sender_avatar
    FROM messages
         JOIN users ON messages.sender_id = users.id
         LEFT JOIN posts ON messages.post_id = posts.id
"#;

/// Records a like/comment notification inside the caller's transaction.
/// Self-notifications are suppressed, and any failure is logged and
/// swallowed so the triggering write still goes through.
pub async fn create_notification(
    tx: &mut Transaction<'_, Sqlite>,
    kind: &str,
    sender_id: i64,
    receiver_id: i64,
    post_id: i64,
    comment_id: Option<i64>,
    content: Option<&str>,
) {
    if sender_id == receiver_id {
        return;
    }
    let result = sqlx::query(
        r#"
        INSERT INTO messages (type, sender_id, receiver_id, post_id, comment_id, content)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(kind)
    .bind(sender_id)
    .bind(receiver_id)
    .bind(post_id)
    .bind(comment_id)
    .bind(content)
    .execute(&mut *tx)
    .await;
    if let Err(e) = result {
        tracing::warn!(kind, post_id, "failed to record notification: {e}");
    }
}

pub async fn list_messages_in_db(
    pool: &SqlitePool,
    receiver_id: i64,
    query: &MessageListQuery,
) -> Result<(Vec<MessageResponse>, i64), RequestError> {
    let filter = match query.r#type.as_str() {
        "like" => "AND messages.type = 'like'",
        "comment" => "AND messages.type = 'comment'",
        "unread" => "AND messages.is_read = 0",
        _ => "",
    };

    let count_query = format!(
        "SELECT COUNT(*) FROM messages WHERE messages.receiver_id = ? {filter}"
    );
    let total = sqlx::query_scalar::<Sqlite, i64>(&count_query)
        .bind(receiver_id)
        .fetch_one(pool)
        .await?;

    let offset = query.page.saturating_sub(1) * query.limit;
    let list_query = format!(
        "{MESSAGE_QUERY} WHERE messages.receiver_id = ? {filter} \
         ORDER BY messages.created_at DESC, messages.id DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as::<Sqlite, MessageRow>(&list_query)
        .bind(receiver_id)
        .bind(query.limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let messages = rows.into_iter().map(MessageResponse::from).collect();
    Ok((messages, total))
}

pub async fn unread_count_in_db(
    pool: &SqlitePool,
    receiver_id: i64,
) -> Result<i64, RequestError> {
    let count = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND is_read = 0",
    )
    .bind(receiver_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn mark_message_read_in_db(
    pool: &SqlitePool,
    message_id: i64,
    receiver_id: i64,
) -> Result<(), RequestError> {
    let result = sqlx::query(
        "UPDATE messages SET is_read = 1 WHERE id = ? AND receiver_id = ?",
    )
    .bind(message_id)
    .bind(receiver_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Message not found"));
    }
    Ok(())
}

pub async fn mark_all_messages_read_in_db(
    pool: &SqlitePool,
    receiver_id: i64,
) -> Result<u64, RequestError> {
    let result = sqlx::query(
        "UPDATE messages SET is_read = 1 WHERE receiver_id = ? AND is_read = 0",
    )
    .bind(receiver_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_message_in_db(
    pool: &SqlitePool,
    message_id: i64,
    receiver_id: i64,
) -> Result<(), RequestError> {
    let result = sqlx::query("DELETE FROM messages WHERE id = ? AND receiver_id = ?")
        .bind(message_id)
        .bind(receiver_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Message not found"));
    }
    Ok(())
}

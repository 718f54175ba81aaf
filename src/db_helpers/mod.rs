use sqlx::{Sqlite, SqlitePool};

use crate::{errors::RequestError, models::User};

mod admin_helpers;
mod article_helpers;
mod message_helpers;
mod post_helpers;
mod route_helpers;
mod user_helpers;

pub use admin_helpers::*;
pub use article_helpers::*;
pub use message_helpers::*;
pub use post_helpers::*;
pub use route_helpers::*;
pub use user_helpers::*;

const USER_COLUMNS: &str =
    "id, username, email, password, avatar, bio, is_admin, created_at";

/// First 200 characters of the content, with an ellipsis when truncated.
pub fn make_summary(content: &str) -> String {
    let mut summary: String = content.chars().take(200).collect();
    if content.chars().count() > 200 {
        summary.push_str("...");
    }
    summary
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_left_alone() {
        assert_eq!(make_summary("hello"), "hello");
    }

    #[test]
    fn exactly_200_chars_gets_no_ellipsis() {
        let content = "x".repeat(200);
        assert_eq!(make_summary(&content), content);
    }

    #[test]
    fn long_content_is_truncated_with_ellipsis() {
        let content = "a".repeat(250);
        let summary = make_summary(&content);
        assert_eq!(summary.chars().count(), 203);
        assert!(summary.ends_with("..."));
        assert!(summary.starts_with(&"a".repeat(200)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let content = "日".repeat(250);
        let summary = make_summary(&content);
        assert!(summary.starts_with(&"日".repeat(200)));
        assert!(summary.ends_with("..."));
    }
}

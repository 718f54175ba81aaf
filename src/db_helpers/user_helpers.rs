use sqlx::{Sqlite, SqlitePool};

use crate::{
    authentication::hash_password_argon2,
    data_formats::{RegisterRequest, UpdateProfileRequest},
    errors::RequestError,
    models::User,
};

use super::{get_user_by_email, get_user_by_id, get_user_by_username};

/// Registers a new user. Duplicate email and username are reported as
/// distinct validation errors so the signup form can say which field to
/// change; this lets a caller probe which addresses hold accounts, and
/// login compensates with a single generic rejection.
pub async fn insert_user(
    pool: &SqlitePool,
    request: &RegisterRequest,
) -> Result<User, RequestError> {
    if request.username.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(RequestError::Validation(
            "Username, email and password are required",
        ));
    }
    if get_user_by_email(pool, &request.email).await?.is_some() {
        return Err(RequestError::Validation("Email already registered"));
    }
    if get_user_by_username(pool, &request.username)
        .await?
        .is_some()
    {
        return Err(RequestError::Validation("Username already taken"));
    }

    let password = hash_password_argon2(request.password.clone())
        .await
        .map_err(|_| RequestError::ServerError)?;

    let user = sqlx::query_as::<Sqlite, User>(
        r#"
        INSERT INTO users (username, email, password)
        VALUES (?, ?, ?)
        RETURNING id, username, email, password, avatar, bio, is_admin, created_at
        "#,
    )
    .bind(&request.username)
    .bind(&request.email)
    .bind(&password)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        // Second line of defense behind the pre-checks: the unique
        // constraints resolve concurrent registrations.
        let e = RequestError::from(e);
        if e.is_unique_violation() {
            RequestError::Validation("Email already registered")
        } else {
            e
        }
    })?;
    Ok(user)
}

pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    request: &UpdateProfileRequest,
) -> Result<User, RequestError> {
    if request.username.trim().is_empty() {
        return Err(RequestError::Validation("Username must not be empty"));
    }
    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, bio = IFNULL(?, bio), avatar = IFNULL(?, avatar)
        WHERE id = ?
        "#,
    )
    .bind(&request.username)
    .bind(&request.bio)
    .bind(&request.avatar)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| {
        let e = RequestError::from(e);
        if e.is_unique_violation() {
            RequestError::Validation("Username already taken")
        } else {
            e
        }
    })?;

    match get_user_by_id(pool, id).await? {
        Some(user) => Ok(user),
        None => Err(RequestError::NotFound("User not found")),
    }
}

pub async fn update_avatar(pool: &SqlitePool, id: i64, url: &str) -> Result<(), RequestError> {
    sqlx::query("UPDATE users SET avatar = ? WHERE id = ?")
        .bind(url)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

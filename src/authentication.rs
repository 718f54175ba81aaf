use crate::errors::RequestError;
use crate::models::User;
use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use time::OffsetDateTime;

const JWT_EXPIRY_DURATION: time::Duration = time::Duration::days(30);

#[derive(Debug, Serialize, Deserialize)]
struct AuthClaim {
    id: i64,
    exp: i64,
}

/// An authenticated request. The user row is reloaded from the store on
/// every request rather than trusted from token claims, so a revoked or
/// freshly-granted admin flag takes effect immediately.
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

pub struct MaybeUser(pub Option<AuthUser>);

/// An authenticated request whose user carries the admin flag.
pub struct AdminUser(pub AuthUser);

impl MaybeUser {
    pub fn get_id(&self) -> Option<i64> {
        self.0.as_ref().map(|a| a.user.id)
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, RequestError> {
    let header = match parts.headers.get("Authorization") {
        Some(header) => header,
        None => return Ok(None),
    };
    let header = header
        .to_str()
        .map_err(|_| RequestError::NotAuthorized("Invalid token"))?;
    match header.strip_prefix("Bearer ") {
        Some(token) => Ok(Some(token)),
        None => Err(RequestError::NotAuthorized("Invalid token")),
    }
}

async fn load_user(parts: &Parts, token: &str) -> Result<AuthUser, RequestError> {
    let id = verify_jwt_token(token)?;
    let pool = parts
        .extensions
        .get::<Arc<SqlitePool>>()
        .ok_or(RequestError::ServerError)?;
    let user = crate::db_helpers::get_user_by_id(pool, id).await?;
    match user {
        Some(user) => Ok(AuthUser {
            user,
            token: token.to_string(),
        }),
        None => Err(RequestError::NotAuthorized("User no longer exists")),
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or(RequestError::NotAuthorized("Authentication required"))?
            .to_string();
        load_user(parts, &token).await
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = match bearer_token(parts)? {
            Some(token) => token.to_string(),
            None => return Ok(MaybeUser(None)),
        };
        // A token was presented, so a bad one is rejected rather than
        // silently downgraded to anonymous.
        Ok(MaybeUser(Some(load_user(parts, &token).await?)))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.user.is_admin {
            return Err(RequestError::Forbidden("Admin privileges required"));
        }
        Ok(AdminUser(auth))
    }
}

pub fn get_jwt_token(id: i64) -> Result<String> {
    let jwt_secret = std::env::var("JWT_SECRET").context("Failed to get JWT_SECRET")?;
    let expiry_date = OffsetDateTime::now_utc() + JWT_EXPIRY_DURATION;
    let claim = AuthClaim {
        id,
        exp: expiry_date.unix_timestamp(),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claim,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .context("Failed to generate jwt token")
}

pub fn verify_jwt_token(token: &str) -> Result<i64, RequestError> {
    let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| RequestError::ServerError)?;
    let token_data = jsonwebtoken::decode::<AuthClaim>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_ref()),
        &jsonwebtoken::Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("token verification failed: {}", e);
        RequestError::NotAuthorized("Invalid token")
    })?;
    let claim = token_data.claims;
    if claim.exp < OffsetDateTime::now_utc().unix_timestamp() {
        return Err(RequestError::NotAuthorized("Token expired"));
    }
    Ok(claim.id)
}

pub async fn verify_password_argon2(password: String, hash: &str) -> Result<bool> {
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Failed to verify password"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_secret() {
        std::env::set_var("JWT_SECRET", "test-secret");
    }

    #[test]
    fn token_round_trips_the_user_id() {
        setup_secret();
        let token = get_jwt_token(42).unwrap();
        assert_eq!(verify_jwt_token(&token).unwrap(), 42);
    }

    #[test]
    fn garbage_token_is_rejected() {
        setup_secret();
        assert!(matches!(
            verify_jwt_token("not.a.token"),
            Err(RequestError::NotAuthorized(_))
        ));
    }

    #[tokio::test]
    async fn password_hash_verifies_and_rejects() {
        let hash = hash_password_argon2("hunter2".to_string()).await.unwrap();
        assert!(verify_password_argon2("hunter2".to_string(), &hash)
            .await
            .unwrap());
        assert!(!verify_password_argon2("hunter3".to_string(), &hash)
            .await
            .unwrap());
    }
}

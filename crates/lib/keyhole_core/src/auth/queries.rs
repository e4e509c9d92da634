//! Auth-related database queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::AuthError;
use super::password::PasswordHash;
use crate::models::auth::{NewUser, User};

type UserRow = (i64, String, String, String, DateTime<Utc>, DateTime<Utc>);

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

fn user_from_row((id, username, email, password_hash, created_at, updated_at): UserRow) -> User {
    User {
        id,
        username,
        email,
        password_hash: PasswordHash::from_stored(password_hash),
        created_at,
        updated_at,
    }
}

/// Insert a user with its final password hash, returning the stored row.
///
/// A duplicate username or email surfaces as [`AuthError::Conflict`] via the
/// table's unique constraints.
pub async fn create_user(pool: &PgPool, new_user: &NewUser) -> Result<User, AuthError> {
    let sql = format!(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(new_user.password_hash.as_str())
        .fetch_one(pool)
        .await?;
    Ok(user_from_row(row))
}

/// Fetch a user by username.
pub async fn find_user_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AuthError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(user_from_row))
}

/// Fetch a user by ID.
pub async fn find_user_by_id(pool: &PgPool, user_id: i64) -> Result<Option<User>, AuthError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(user_from_row))
}

/// Check whether a username or email is already registered.
pub async fn identity_exists(pool: &PgPool, username: &str, email: &str) -> Result<bool, AuthError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
    )
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Round-trip a trivial query.
pub async fn ping(pool: &PgPool) -> Result<(), AuthError> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

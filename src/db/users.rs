use sqlx::SqlitePool;

use crate::db::is_unique_violation;
use crate::error::AppError;
use crate::models::user::User;

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, hashed_password, full_name, is_active \
         FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn insert(
    pool: &SqlitePool,
    username: &str,
    hashed_password: &str,
    full_name: &str,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, hashed_password, full_name, is_active) \
         VALUES (?, ?, ?, 1) \
         RETURNING id, username, hashed_password, full_name, is_active",
    )
    .bind(username)
    .bind(hashed_password)
    .bind(full_name)
    .fetch_one(pool)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            AppError::Conflict(format!("username {username} is already registered"))
        } else {
            err.into()
        }
    })
}

#[cfg(test)]
pub async fn set_active(
    pool: &SqlitePool,
    user_id: i64,
    is_active: bool,
) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(is_active)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

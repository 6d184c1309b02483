pub mod packages;
pub mod users;

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::AppError;

pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|err| AppError::Internal(format!("invalid DATABASE_URL: {err}")))?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);

    // An in-memory database lives exactly as long as its connection.
    if url.contains(":memory:") {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    pool_options
        .connect_with(options)
        .await
        .map_err(|err| AppError::Internal(format!("failed to open database {url}: {err}")))
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|err| AppError::Internal(format!("migration failed: {err}")))
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub users: i64,
    pub pending_packages: i64,
}

pub async fn counts(pool: &SqlitePool) -> Result<Counts, AppError> {
    let (users, pending_packages): (i64, i64) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM users), \
                (SELECT COUNT(*) FROM packages WHERE status = 'pending')",
    )
    .fetch_one(pool)
    .await?;

    Ok(Counts {
        users,
        pending_packages,
    })
}

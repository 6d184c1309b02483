use sqlx::SqlitePool;

use crate::auth::{PasswordHasher, TokenService};
use crate::config::Config;
use crate::db;
use crate::engine::photos::PhotoStore;
use crate::error::AppError;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub db: SqlitePool,
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
    pub photos: PhotoStore,
    pub metrics: Metrics,
    pub max_upload_bytes: usize,
    pub cors_allow_origins: Vec<String>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &Config) -> Self {
        Self {
            db,
            tokens: TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl_minutes),
            passwords: PasswordHasher::new(config.bcrypt_cost),
            photos: PhotoStore::new(config.upload_dir.clone(), config.static_prefix.clone()),
            metrics: Metrics::new(),
            max_upload_bytes: config.max_upload_bytes,
            cors_allow_origins: config.cors_allow_origins.clone(),
        }
    }

    /// Opens the database, applies migrations and prepares the upload directory.
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let pool = db::connect(&config.database_url, config.database_max_connections).await?;
        db::migrate(&pool).await?;

        let state = Self::new(pool, config);
        state.photos.ensure_root().await?;
        Ok(state)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use super::AppState;
    use crate::config::{Config, LogFormat};

    pub fn config(upload_dir: &Path) -> Config {
        Config {
            http_port: 0,
            log_level: "debug".to_string(),
            log_format: LogFormat::Compact,
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            jwt_secret: "test-secret-test-secret-test-secret".to_string(),
            token_ttl_minutes: 60,
            bcrypt_cost: 4,
            upload_dir: upload_dir.to_path_buf(),
            static_prefix: "/static".to_string(),
            max_upload_bytes: 1024 * 1024,
            cors_allow_origins: vec!["*".to_string()],
        }
    }

    pub async fn state(upload_dir: &Path) -> AppState {
        AppState::initialize(&config(upload_dir)).await.unwrap()
    }

    /// Same as `state`, but on a SQLite file so several connections share it.
    pub async fn file_backed_state(
        upload_dir: &Path,
        db_path: &Path,
        max_connections: u32,
    ) -> AppState {
        let mut config = config(upload_dir);
        config.database_url = format!("sqlite://{}", db_path.display());
        config.database_max_connections = max_connections;
        AppState::initialize(&config).await.unwrap()
    }
}

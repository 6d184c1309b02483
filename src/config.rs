use std::env;
use std::path::PathBuf;

use crate::error::AppError;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub upload_dir: PathBuf,
    pub static_prefix: String,
    pub max_upload_bytes: usize,
    pub cors_allow_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal("JWT_SECRET must be set".to_string()))?;

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 8000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_log_format(
                &env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
            )?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://parcel_tracker.db".to_string()),
            database_max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            token_ttl_minutes: parse_or_default("TOKEN_TTL_MINUTES", 60)?,
            bcrypt_cost: parse_or_default("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            ),
            static_prefix: normalize_prefix(
                &env::var("STATIC_PREFIX").unwrap_or_else(|_| "/static".to_string()),
            )?,
            max_upload_bytes: parse_or_default("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            cors_allow_origins: parse_origins(
                &env::var("CORS_ALLOW_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Internal(format!(
                "invalid JWT_SECRET: must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.token_ttl_minutes <= 0 {
            return Err(AppError::Internal(
                "invalid TOKEN_TTL_MINUTES: must be > 0".to_string(),
            ));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(AppError::Internal(
                "invalid BCRYPT_COST: must be within 4..=31".to_string(),
            ));
        }
        if self.database_max_connections == 0 {
            return Err(AppError::Internal(
                "invalid DATABASE_MAX_CONNECTIONS: must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn parse_log_format(raw: &str) -> Result<LogFormat, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "compact" => Ok(LogFormat::Compact),
        "json" => Ok(LogFormat::Json),
        other => Err(AppError::Internal(format!("invalid LOG_FORMAT: {other}"))),
    }
}

/// Static files are nested under this prefix, so it can be neither empty nor `/`.
fn normalize_prefix(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with('/') || trimmed.len() < 2 {
        return Err(AppError::Internal(format!(
            "invalid STATIC_PREFIX: {raw:?} must look like /static"
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

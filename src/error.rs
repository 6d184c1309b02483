use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Any bearer-token failure. Deliberately carries no detail.
    #[error("could not validate credentials")]
    Unauthorized,

    #[error("incorrect username or password")]
    InvalidCredentials,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("package already delivered")]
    AlreadyDelivered,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::AlreadyDelivered => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(format!("database error: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("io error: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;

    #[test]
    fn auth_failures_carry_bearer_challenge() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn already_delivered_is_a_bad_request() {
        assert_eq!(AppError::AlreadyDelivered.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Conflict("dup".to_string()).status(),
            StatusCode::CONFLICT
        );
    }
}

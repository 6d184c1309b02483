use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};

use crate::engine::accounts;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/token", post(issue_token))
}

/// OAuth2 password-grant form; `grant_type` and `scope` are accepted and ignored.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

async fn issue_token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let access_token = accounts::login(&state, &form.username, &form.password).await?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.tokens.ttl().num_seconds(),
    }))
}
